//! Engine-wide re-entrancy lock.
//!
//! One flag for the whole engine. Acquiring it while held fails instead of
//! blocking, so a collaborator that calls back into a mutating operation
//! gets `ReentrantCall`.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// "Operation in progress" flag
#[derive(Debug, Default)]
pub struct ReentrancyLock {
    entered: AtomicBool,
}

impl ReentrancyLock {
    /// Create an unlocked flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag; released when the returned guard drops
    pub fn enter(&self) -> Result<ReentrancyGuard<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| Error::ReentrantCall)?;
        Ok(ReentrancyGuard { lock: self })
    }

    /// Check whether an operation is in progress
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Scope of one mutating operation
#[derive(Debug)]
pub struct ReentrancyGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.lock.entered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_rejected() {
        let lock = ReentrancyLock::new();
        let guard = lock.enter().unwrap();
        assert!(lock.is_entered());
        assert_eq!(lock.enter().unwrap_err(), Error::ReentrantCall);

        drop(guard);
        assert!(!lock.is_entered());
        assert!(lock.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        let lock = ReentrancyLock::new();
        let run = || -> Result<()> {
            let _guard = lock.enter()?;
            Err(Error::InvalidAmount)
        };

        assert_eq!(run(), Err(Error::InvalidAmount));
        assert!(!lock.is_entered());
    }
}
