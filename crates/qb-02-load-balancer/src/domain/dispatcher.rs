//! # Dispatcher
//!
//! Pairs pending work with free worker capacity. Pure bookkeeping: sending is
//! up to the caller, who must hand back any unit it failed to deliver with
//! [`Dispatcher::requeue_front`].
//!
//! Invariant: after `accept`, `ready` or `drain` the backlog is only
//! non-empty while the pool has no free capacity. `requeue_front` and `grant`
//! can break it until the next `drain`.

use std::collections::VecDeque;

use shared_types::Endpoint;

use super::capacity::WorkerPool;

/// A unit of work paired with the worker it was assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<W> {
    pub worker: Endpoint,
    pub work: W,
}

/// Capacity table plus the backlog of held work.
#[derive(Debug, Clone)]
pub struct Dispatcher<W> {
    pool: WorkerPool,
    pending: VecDeque<W>,
}

impl<W> Default for Dispatcher<W> {
    fn default() -> Self {
        Self {
            pool: WorkerPool::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<W> Dispatcher<W> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a unit of work. It is assigned if a worker has capacity, held otherwise.
    pub fn accept(&mut self, work: W) -> Vec<Assignment<W>> {
        self.pending.push_back(work);
        self.drain()
    }

    /// Apply a readiness signal and flush whatever the new capacity allows.
    pub fn ready(&mut self, worker: &Endpoint, capacity: u32) -> Vec<Assignment<W>> {
        self.pool.grant(worker, capacity);
        self.drain()
    }

    /// Record capacity without dispatching (standby bookkeeping).
    pub fn grant(&mut self, worker: &Endpoint, capacity: u32) {
        self.pool.grant(worker, capacity);
    }

    /// Hold a unit without trying to dispatch it.
    pub fn hold(&mut self, work: W) {
        self.pending.push_back(work);
    }

    /// Return an undelivered unit to the head of the backlog.
    pub fn requeue_front(&mut self, work: W) {
        self.pending.push_front(work);
    }

    /// Assign held work, oldest first, while capacity lasts.
    pub fn drain(&mut self) -> Vec<Assignment<W>> {
        let mut assignments = Vec::new();
        while !self.pending.is_empty() {
            let Some(worker) = self.pool.take() else {
                break;
            };
            if let Some(work) = self.pending.pop_front() {
                assignments.push(Assignment { worker, work });
            }
        }
        assignments
    }

    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    fn worker(index: usize) -> Endpoint {
        Endpoint::parse(&format!("memory://workers/w{index}")).unwrap()
    }

    #[test]
    fn test_one_slot_two_pending() {
        let mut dispatcher = Dispatcher::new();
        assert!(dispatcher.accept("first").is_empty());
        assert!(dispatcher.accept("second").is_empty());

        let assigned = dispatcher.ready(&worker(0), 1);
        assert_eq!(
            assigned,
            vec![Assignment {
                worker: worker(0),
                work: "first"
            }]
        );
        assert_eq!(dispatcher.backlog_len(), 1);

        let assigned = dispatcher.ready(&worker(0), 1);
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].work, "second");
        assert_eq!(dispatcher.backlog_len(), 0);
    }

    #[test]
    fn test_work_assigned_immediately_when_capacity_free() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.ready(&worker(0), 2);

        let assigned = dispatcher.accept(1);
        assert_eq!(assigned.len(), 1);
        assert_eq!(dispatcher.pool().capacity_of(&worker(0)), 1);
    }

    #[test]
    fn test_requeued_unit_goes_first() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.hold(2);
        dispatcher.requeue_front(1);

        let assigned = dispatcher.ready(&worker(0), 1);
        assert_eq!(assigned[0].work, 1);
    }

    #[test]
    fn test_standby_grant_does_not_dispatch() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.hold(1);
        dispatcher.grant(&worker(0), 1);
        assert_eq!(dispatcher.backlog_len(), 1);

        assert_eq!(dispatcher.drain().len(), 1);
    }

    #[derive(Debug, Clone)]
    enum Event {
        Work,
        Ready { worker: usize, capacity: u32 },
    }

    fn event() -> impl Strategy<Value = Event> {
        prop_oneof![
            Just(Event::Work),
            (0usize..4, 0u32..4).prop_map(|(worker, capacity)| Event::Ready { worker, capacity }),
        ]
    }

    proptest! {
        #[test]
        fn prop_conservation(events in proptest::collection::vec(event(), 0..200)) {
            let mut dispatcher = Dispatcher::new();
            let mut next_id = 0u32;
            let mut granted: HashMap<Endpoint, u64> = HashMap::new();
            let mut assigned_to: HashMap<Endpoint, u64> = HashMap::new();
            let mut dispatched = HashSet::new();

            for event in events {
                let assignments = match event {
                    Event::Work => {
                        next_id += 1;
                        dispatcher.accept(next_id)
                    }
                    Event::Ready { worker: index, capacity } => {
                        *granted.entry(worker(index)).or_default() += u64::from(capacity);
                        dispatcher.ready(&worker(index), capacity)
                    }
                };
                for Assignment { worker, work } in assignments {
                    prop_assert!(dispatched.insert(work), "unit {} dispatched twice", work);
                    *assigned_to.entry(worker).or_default() += 1;
                }
            }

            let total_granted: u64 = granted.values().sum();
            prop_assert!(dispatched.len() as u64 <= total_granted);
            for (worker, count) in &assigned_to {
                prop_assert!(*count <= granted[worker]);
            }
            prop_assert_eq!(dispatched.len() + dispatcher.backlog_len(), next_id as usize);
            prop_assert!(dispatcher.backlog_len() == 0 || dispatcher.pool().available() == 0);
        }
    }
}
