//! Configuration sources.

mod toml_loader;

pub use toml_loader::TomlConfigLoader;
