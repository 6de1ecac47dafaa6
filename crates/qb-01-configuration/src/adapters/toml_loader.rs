//! # TOML Configuration Loader
//!
//! Parses raw settings into a [`BusConfiguration`], rejecting malformed input.
//!
//! ## Config File Format
//!
//! ```toml
//! [bus]
//! endpoint = "msmq://localhost/orders"
//! threadCount = 2
//! numberOfRetries = 5
//! transactional = "true"
//! queueIsolationLevel = "ReadCommitted"
//! consumeInTransaction = true
//! useDtc = false
//! useFlatQueueStructure = false
//! loadBalancerEndpoint = "msmq://localhost/orders.balancer.ready"
//! logEndpoint = "msmq://localhost/orders.log"
//!
//! [[assemblies]]
//! name = "orders-handlers"
//!
//! [[messages]]
//! name = "Orders.Commands"
//! endpoint = "msmq://localhost/orders"
//!
//! [loadBalancer]
//! role = "secondary"
//! endpoint = "msmq://localhost/orders.balancer"
//! readyForWorkEndpoint = "msmq://localhost/orders.balancer.ready"
//! primaryLoadBalancerEndpoint = "msmq://primary-host/orders.balancer"
//!
//! [security]
//! key = "<64 hex chars>"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared_crypto::{SecretKey, KEY_LEN};
use shared_types::{Endpoint, IsolationLevel, MessageOwner, TransactionalMode};
use tracing::debug;

use crate::domain::{
    BusConfiguration, ConfigError, LoadBalancerConfiguration, LoadBalancerRole, SecuritySettings,
};
use crate::ports::ConfigurationSource;

/// Configuration file structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    bus: Option<BusSection>,
    #[serde(default)]
    assemblies: Vec<AssemblyEntry>,
    #[serde(default)]
    messages: Vec<MessageEntry>,
    load_balancer: Option<LoadBalancerSection>,
    security: Option<SecuritySection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BusSection {
    endpoint: Option<String>,
    thread_count: Option<usize>,
    number_of_retries: Option<u32>,
    transactional: Option<BooleanLike>,
    queue_isolation_level: Option<String>,
    consume_in_transaction: Option<bool>,
    use_dtc: Option<bool>,
    use_flat_queue_structure: Option<bool>,
    load_balancer_endpoint: Option<String>,
    log_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    name: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadBalancerSection {
    role: Option<String>,
    endpoint: Option<String>,
    ready_for_work_endpoint: Option<String>,
    primary_load_balancer_endpoint: Option<String>,
    thread_count: Option<usize>,
    transactional: Option<BooleanLike>,
}

#[derive(Debug, Deserialize)]
struct SecuritySection {
    key: String,
}

/// `transactional` may be written as a TOML boolean or as a string. Any other
/// value lands in `Other` so validation can name it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BooleanLike {
    Bool(bool),
    Text(String),
    Other(toml::Value),
}

/// TOML-based configuration loader.
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    path: PathBuf,
}

impl TomlConfigLoader {
    /// Loader bound to a file, read on each [`ConfigurationSource::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<BusConfiguration, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// - `MissingSection` if there is no `[bus]` table
    /// - `InvalidEndpoint` if an endpoint is absent or not an absolute URI
    /// - `InvalidBoolean` if `transactional` is not `true` or `false`
    /// - `InvalidEnumValue` for unknown isolation levels or balancer roles
    pub fn parse(content: &str) -> Result<BusConfiguration, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let bus = file.bus.ok_or(ConfigError::MissingSection("bus"))?;
        let mut config = BusConfiguration::new(parse_endpoint("endpoint", bus.endpoint.as_deref())?);

        if let Some(retries) = bus.number_of_retries {
            config.number_of_retries = retries;
        }
        if let Some(threads) = bus.thread_count {
            config.thread_count = validate_thread_count("threadCount", threads)?;
        }
        if let Some(level) = bus.queue_isolation_level.filter(|l| !l.is_empty()) {
            config.queue_isolation_level =
                level
                    .parse::<IsolationLevel>()
                    .map_err(|e| ConfigError::InvalidEnumValue {
                        field: "queueIsolationLevel",
                        value: e.value,
                        expected: IsolationLevel::ALL.map(IsolationLevel::name).join(", "),
                    })?;
        }
        if let Some(consume) = bus.consume_in_transaction {
            config.consume_in_transaction = consume;
        }
        if let Some(use_dtc) = bus.use_dtc {
            config.use_dtc = use_dtc;
        }
        if let Some(raw) = bus.transactional {
            config.transactional = TransactionalMode::from(parse_boolean("transactional", raw)?);
        }
        if bus.use_flat_queue_structure == Some(true) {
            config = config.use_flat_queue_structure();
        }
        if let Some(raw) = bus.load_balancer_endpoint {
            config.load_balancer_endpoint = Some(parse_endpoint("loadBalancerEndpoint", Some(&raw))?);
        }
        if let Some(raw) = bus.log_endpoint {
            config.log_endpoint = Some(parse_endpoint("logEndpoint", Some(&raw))?);
        }

        for assembly in file.assemblies {
            config.scan_assemblies.insert(assembly.name);
        }
        for entry in file.messages {
            let endpoint = parse_endpoint("messages.endpoint", Some(&entry.endpoint))?;
            config.message_owners.push(MessageOwner::new(entry.name, endpoint));
        }

        if let Some(section) = file.load_balancer {
            config.load_balancer = Some(parse_load_balancer(section, config.is_transactional())?);
        }
        if let Some(section) = file.security {
            config.security = SecuritySettings::Enabled(parse_key(&section.key)?);
        }

        debug!(
            endpoint = %config.endpoint,
            thread_count = config.thread_count,
            owners = config.message_owners.len(),
            load_balancer = config.load_balancer.is_some(),
            security = config.security.is_enabled(),
            "Configuration validated"
        );
        Ok(config)
    }
}

impl ConfigurationSource for TomlConfigLoader {
    fn load(&self) -> Result<BusConfiguration, ConfigError> {
        Self::load_file(&self.path)
    }
}

fn parse_endpoint(field: &'static str, raw: Option<&str>) -> Result<Endpoint, ConfigError> {
    let value = raw.unwrap_or_default();
    Endpoint::parse(value).map_err(|e| ConfigError::InvalidEndpoint {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_boolean(field: &'static str, raw: BooleanLike) -> Result<bool, ConfigError> {
    match raw {
        BooleanLike::Bool(value) => Ok(value),
        BooleanLike::Text(text) => match text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean { field, value: text }),
        },
        BooleanLike::Other(value) => Err(ConfigError::InvalidBoolean {
            field,
            value: value.to_string(),
        }),
    }
}

fn validate_thread_count(field: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::OutOfRange {
            field,
            value: 0,
            minimum: 1,
        });
    }
    Ok(value)
}

fn parse_load_balancer(
    section: LoadBalancerSection,
    bus_transactional: bool,
) -> Result<LoadBalancerConfiguration, ConfigError> {
    let endpoint = parse_endpoint("loadBalancer.endpoint", section.endpoint.as_deref())?;
    let primary = section
        .primary_load_balancer_endpoint
        .map(|raw| parse_endpoint("loadBalancer.primaryLoadBalancerEndpoint", Some(&raw)))
        .transpose()?;

    let role = match (section.role.as_deref().unwrap_or("primary"), primary) {
        ("primary", None) => LoadBalancerRole::Primary,
        ("primary", Some(endpoint)) => {
            return Err(ConfigError::UnexpectedPrimaryEndpoint {
                endpoint: endpoint.to_string(),
            })
        }
        ("secondary", Some(primary)) => LoadBalancerRole::Secondary { primary },
        ("secondary", None) => return Err(ConfigError::MissingPrimaryEndpoint),
        (other, _) => {
            return Err(ConfigError::InvalidEnumValue {
                field: "loadBalancer.role",
                value: other.to_string(),
                expected: LoadBalancerRole::NAMES.join(", "),
            })
        }
    };

    let mut config = LoadBalancerConfiguration::primary(endpoint);
    config.role = role;
    if let Some(raw) = section.ready_for_work_endpoint {
        config.ready_for_work_endpoint = Some(parse_endpoint(
            "loadBalancer.readyForWorkEndpoint",
            Some(&raw),
        )?);
    }
    if let Some(threads) = section.thread_count {
        config.thread_count = validate_thread_count("loadBalancer.threadCount", threads)?;
    }
    config.transactional = match section.transactional {
        Some(raw) => parse_boolean("loadBalancer.transactional", raw)?,
        None => bus_transactional,
    };
    Ok(config)
}

fn parse_key(raw: &str) -> Result<SecretKey, ConfigError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
    if bytes.len() != KEY_LEN {
        return Err(ConfigError::InvalidKey(format!(
            "expected {KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    SecretKey::from_slice(&bytes).map_err(|e| ConfigError::InvalidKey(e.to_string()))
}
