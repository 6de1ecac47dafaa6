//! Single-assignment slot for a composed role.

use std::sync::Arc;

use parking_lot::Mutex;

/// Holds at most one instance of a role.
///
/// The first successful initializer wins; every later call returns the same
/// `Arc`. A failed initializer leaves the slot empty.
pub struct Singleton<T: ?Sized> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T: ?Sized> Singleton<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the instance, creating it with `init` if the slot is empty.
    ///
    /// `init` runs under the slot's lock and must not touch this slot again.
    pub fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        let mut slot = self.slot.lock();
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let created = init()?;
        *slot = Some(Arc::clone(&created));
        Ok(created)
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().clone()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T: ?Sized> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_returns_first_instance() {
        let slot: Singleton<String> = Singleton::new();
        let first = slot
            .get_or_try_init(|| Ok::<_, ()>(Arc::new("first".to_string())))
            .unwrap();
        let second = slot
            .get_or_try_init(|| Ok::<_, ()>(Arc::new("second".to_string())))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "first");
    }

    #[test]
    fn test_failed_init_leaves_slot_empty() {
        let slot: Singleton<u32> = Singleton::new();
        assert!(slot.get_or_try_init(|| Err("boom")).is_err());
        assert!(!slot.is_set());

        let value = slot.get_or_try_init(|| Ok::<_, ()>(Arc::new(7))).unwrap();
        assert_eq!(*value, 7);
    }
}
