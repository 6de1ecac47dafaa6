//! Load balancer domain: capacity bookkeeping, dispatch and role state.

pub mod capacity;
pub mod dispatcher;
pub mod messages;
pub mod state;

pub use capacity::{WorkerCapacity, WorkerPool};
pub use dispatcher::{Assignment, Dispatcher};
pub use messages::{ReadyForWork, READY_FOR_WORK_MESSAGE_TYPE};
pub use state::BalancerState;
