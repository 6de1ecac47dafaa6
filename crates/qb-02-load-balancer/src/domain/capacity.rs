//! # Worker Capacity Table
//!
//! Free capacity per worker endpoint. A worker joins the ready order when its
//! capacity rises from zero; among workers with the same capacity, the one
//! that joined first is selected.

use shared_types::Endpoint;

/// Snapshot of one worker's free capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCapacity {
    pub endpoint: Endpoint,
    pub capacity: u32,
}

#[derive(Debug, Clone)]
struct WorkerSlot {
    endpoint: Endpoint,
    capacity: u32,
    /// Position in the ready order; refreshed each time capacity leaves zero.
    ready_seq: u64,
}

/// Capacity counters for a balancer's worker pool.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    workers: Vec<WorkerSlot>,
    next_seq: u64,
}

impl WorkerPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` free slots to `worker`, registering it if unknown.
    pub fn grant(&mut self, worker: &Endpoint, amount: u32) {
        let seq = self.next_seq;
        let slot = match self.workers.iter_mut().position(|w| &w.endpoint == worker) {
            Some(index) => &mut self.workers[index],
            None => {
                self.workers.push(WorkerSlot {
                    endpoint: worker.clone(),
                    capacity: 0,
                    ready_seq: seq,
                });
                let last = self.workers.len() - 1;
                &mut self.workers[last]
            }
        };

        if slot.capacity == 0 && amount > 0 {
            slot.ready_seq = seq;
            self.next_seq += 1;
        }
        slot.capacity = slot.capacity.saturating_add(amount);
    }

    /// Reserve one slot on the best worker: most free capacity, then earliest ready.
    pub fn take(&mut self) -> Option<Endpoint> {
        let slot = self
            .workers
            .iter_mut()
            .filter(|w| w.capacity > 0)
            .max_by(|a, b| {
                a.capacity
                    .cmp(&b.capacity)
                    .then_with(|| b.ready_seq.cmp(&a.ready_seq))
            })?;
        slot.capacity -= 1;
        Some(slot.endpoint.clone())
    }

    /// Free capacity of one worker.
    #[must_use]
    pub fn capacity_of(&self, worker: &Endpoint) -> u32 {
        self.workers
            .iter()
            .find(|w| &w.endpoint == worker)
            .map_or(0, |w| w.capacity)
    }

    /// Free capacity across the pool.
    #[must_use]
    pub fn available(&self) -> u64 {
        self.workers.iter().map(|w| u64::from(w.capacity)).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Workers in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WorkerCapacity> {
        self.workers
            .iter()
            .map(|w| WorkerCapacity {
                endpoint: w.endpoint.clone(),
                capacity: w.capacity,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(name: &str) -> Endpoint {
        Endpoint::parse(&format!("memory://workers/{name}")).unwrap()
    }

    #[test]
    fn test_empty_pool_has_nothing_to_take() {
        let mut pool = WorkerPool::new();
        assert!(pool.take().is_none());

        pool.grant(&worker("a"), 0);
        assert_eq!(pool.len(), 1);
        assert!(pool.take().is_none());
    }

    #[test]
    fn test_highest_capacity_first() {
        let mut pool = WorkerPool::new();
        pool.grant(&worker("a"), 1);
        pool.grant(&worker("b"), 3);

        assert_eq!(pool.take(), Some(worker("b")));
        assert_eq!(pool.capacity_of(&worker("b")), 2);
    }

    #[test]
    fn test_ties_go_to_first_ready() {
        let mut pool = WorkerPool::new();
        pool.grant(&worker("b"), 1);
        pool.grant(&worker("a"), 1);

        assert_eq!(pool.take(), Some(worker("b")));
        assert_eq!(pool.take(), Some(worker("a")));
        assert_eq!(pool.take(), None);
    }

    #[test]
    fn test_rejoining_worker_goes_to_back() {
        let mut pool = WorkerPool::new();
        pool.grant(&worker("a"), 1);
        pool.grant(&worker("b"), 1);
        assert_eq!(pool.take(), Some(worker("a")));

        // a is ready again, but b has been waiting longer
        pool.grant(&worker("a"), 1);
        assert_eq!(pool.take(), Some(worker("b")));
        assert_eq!(pool.take(), Some(worker("a")));
    }

    #[test]
    fn test_available_sums_capacity() {
        let mut pool = WorkerPool::new();
        pool.grant(&worker("a"), 2);
        pool.grant(&worker("b"), 3);
        pool.grant(&worker("a"), 1);

        assert_eq!(pool.available(), 6);
        assert_eq!(pool.snapshot().len(), 2);
    }
}
