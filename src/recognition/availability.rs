use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide "recognition API disabled" latch
///
/// Clones share the same flag. Once disabled the latch never re-opens for
/// the lifetime of the run; every worker observes the change on its next
/// recognition attempt.
#[derive(Debug, Clone, Default)]
pub struct ApiAvailability {
    disabled: Arc<AtomicBool>,
}

impl ApiAvailability {
    /// Creates an open latch
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a latch that is already closed
    pub fn disabled() -> Self {
        let availability = Self::new();
        availability.disable();
        availability
    }

    /// Creates a latch from the configured key: closed when there is none
    pub fn for_key(api_key: Option<&str>) -> Self {
        match api_key {
            Some(_) => Self::new(),
            None => Self::disabled(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Closes the latch
    ///
    /// Returns `true` only for the call that actually flipped it.
    pub fn disable(&self) -> bool {
        !self.disabled.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_latch_is_open() {
        assert!(!ApiAvailability::new().is_disabled());
    }

    #[test]
    fn test_disable_is_one_way_and_shared() {
        let availability = ApiAvailability::new();
        let worker_view = availability.clone();

        assert!(availability.disable());
        assert!(!availability.disable());
        assert!(worker_view.is_disabled());
    }

    #[test]
    fn test_for_key() {
        assert!(!ApiAvailability::for_key(Some("abc")).is_disabled());
        assert!(ApiAvailability::for_key(None).is_disabled());
    }

    #[test]
    fn test_visible_across_threads() {
        let availability = ApiAvailability::new();
        let remote = availability.clone();
        std::thread::spawn(move || {
            remote.disable();
        })
        .join()
        .unwrap();
        assert!(availability.is_disabled());
    }
}
