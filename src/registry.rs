//! Process-wide record of mailboxes with an active session.

use crate::err::Error;
use log::debug;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tracks which mailboxes currently hold an active session.
///
/// The protocol allows at most one active session per mailbox, so every
/// session of a deployment must go through the same registry: sessions
/// insert their mailbox on login and remove it on logout. The
/// check-then-insert of [`acquire`](Registry::acquire) is serialized,
/// two racing logins for the same mailbox admit exactly one.
///
/// There is no automatic expiry. A session that ends without
/// [`Session::logout`](crate::Session::logout) keeps its mailbox locked
/// for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Registry {
    active: Mutex<HashSet<String>>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the mailbox for a new session.
    ///
    /// Fails with [`Error::InUse`] when the mailbox is already claimed.
    pub fn acquire(&self, user: &str) -> Result<(), Error> {
        let mut active = self.lock();
        if active.contains(user) {
            debug!("({}) maildrop already locked", user);
            return Err(Error::InUse);
        }
        active.insert(user.to_owned());
        Ok(())
    }

    /// Release the mailbox.
    ///
    /// Idempotent: releasing a mailbox that is not claimed is a no-op.
    pub fn release(&self, user: &str) {
        self.lock().remove(user);
    }

    /// Is a session currently active for the mailbox?
    pub fn is_active(&self, user: &str) -> bool {
        self.lock().contains(user)
    }

    // The registry only guards a set of names, which is valid no matter
    // where a panicking holder stopped, so a poisoned lock is entered
    // anyway
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_conflict() {
        let registry = Registry::new();
        assert!(registry.acquire("alice").is_ok());
        assert_matches!(registry.acquire("alice"), Err(Error::InUse));
        // A different mailbox is unaffected
        assert!(registry.acquire("bob").is_ok());
    }

    #[test]
    fn release_then_acquire() {
        let registry = Registry::new();
        registry.acquire("alice").unwrap();
        registry.release("alice");
        assert!(registry.acquire("alice").is_ok());
    }

    #[test]
    fn release_is_idempotent() {
        let registry = Registry::new();
        registry.release("ghost");
        registry.acquire("ghost").unwrap();
        registry.release("ghost");
        registry.release("ghost");
        assert!(!registry.is_active("ghost"));
    }

    #[test]
    fn concurrent_acquires_admit_one() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.acquire("alice").is_ok())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
        assert!(registry.is_active("alice"));
    }
}
