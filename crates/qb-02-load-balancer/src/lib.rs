//! # Load Balancer
//!
//! Primary/secondary load balancers that route work to a pool of worker
//! endpoints by declared free capacity, and the ready-for-work listener that
//! workers use to ask for more.
//!
//! ## Roles
//!
//! ```text
//!   PrimaryActive
//!
//!   SecondaryStandby ──promote()──→ SecondaryActive
//!         │
//!         └── forwards work to the primary, keeps its own worker table
//! ```
//!
//! Promotion is an operator action; nothing here fails over on its own.
//!
//! ## Dispatch
//!
//! | Event | Effect |
//! |-------|--------|
//! | work unit arrives | assign to the worker with the most free capacity, else hold |
//! | ready-for-work(worker, n) | add `n` to the worker's capacity, flush the backlog |
//! | send to worker fails | unit goes back to the front of the backlog |
//!
//! Among workers with equal capacity the one that became ready first wins.
//! Held work is never dropped while the balancer is alive.
//!
//! ## Module Structure
//!
//! - `domain/` - `WorkerPool`, `Dispatcher`, `BalancerState`, `ReadyForWork`
//! - `ports` - `ReadySignalSink`
//! - `service/` - `LoadBalancer`, `ReadyForWorkListener`

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{
    Assignment, BalancerState, Dispatcher, ReadyForWork, WorkerCapacity, WorkerPool,
    READY_FOR_WORK_MESSAGE_TYPE,
};
pub use error::LoadBalancerError;
pub use ports::ReadySignalSink;
pub use service::{BalancerStatus, LoadBalancer, ReadyForWorkListener, WorkOutcome};
