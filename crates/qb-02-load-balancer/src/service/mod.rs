//! Load balancer runtime roles.

mod balancer;
mod listener;

pub use balancer::{BalancerStatus, LoadBalancer, WorkOutcome};
pub use listener::ReadyForWorkListener;
