//! Audio-focus arbitration
//!
//! The [`FocusArbiter`] is the sole owner of the OS audio-focus handle. It
//! requests and abandons focus through a [`FocusBackend`] and tracks the
//! one piece of policy state the controller needs: whether a pause was
//! focus-induced (`resume_on_regain`), which distinguishes "system paused,
//! resume when focus returns" from "user paused, stay paused".
//!
//! The arbiter never invokes play/pause/stop itself. OS interruption
//! callbacks are translated by the platform layer into
//! [`FocusChange`](crate::events::FocusChange) events on the controller
//! queue, preserving a single authoritative mutator.

use tracing::debug;

/// Outcome of a focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusGrant {
    Granted,
    Denied,
}

/// OS audio-focus handle
///
/// Exactly one request/abandon pair is in flight at a time; the arbiter
/// serializes access.
pub trait FocusBackend: Send {
    /// Request playback focus from the OS
    fn request(&mut self) -> FocusGrant;

    /// Abandon previously requested focus
    fn abandon(&mut self);
}

/// Focus state plus the backend that owns the OS handle
pub struct FocusArbiter {
    backend: Box<dyn FocusBackend>,
    held: bool,
    resume_on_regain: bool,
}

impl FocusArbiter {
    pub fn new(backend: Box<dyn FocusBackend>) -> Self {
        Self {
            backend,
            held: false,
            resume_on_regain: false,
        }
    }

    /// Request focus for a play/resume transition
    ///
    /// Re-requesting while already held is fine; the OS treats it as a
    /// refresh of the existing claim.
    pub fn acquire(&mut self) -> bool {
        match self.backend.request() {
            FocusGrant::Granted => {
                self.held = true;
                true
            }
            FocusGrant::Denied => {
                debug!("audio focus request denied");
                false
            }
        }
    }

    /// Abandon focus and clear all policy state
    pub fn release(&mut self) {
        if self.held {
            self.backend.abandon();
        }
        self.held = false;
        self.resume_on_regain = false;
    }

    /// Record a focus loss reported by the OS (the claim is gone whether
    /// or not we abandon it)
    pub fn note_lost(&mut self) {
        self.held = false;
    }

    /// Record focus coming back
    pub fn note_regained(&mut self) {
        self.held = true;
    }

    /// Mark the current pause as focus-induced
    pub fn set_resume_on_regain(&mut self) {
        self.resume_on_regain = true;
    }

    /// Clear the focus-induced-pause marker (explicit pause, stop, or the
    /// resume that consumed it)
    pub fn clear_resume_on_regain(&mut self) {
        self.resume_on_regain = false;
    }

    pub fn resume_on_regain(&self) -> bool {
        self.resume_on_regain
    }

    pub fn held(&self) -> bool {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedBackend {
        grant: bool,
        requests: Arc<AtomicUsize>,
        abandons: Arc<AtomicUsize>,
    }

    impl FocusBackend for ScriptedBackend {
        fn request(&mut self) -> FocusGrant {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.grant {
                FocusGrant::Granted
            } else {
                FocusGrant::Denied
            }
        }

        fn abandon(&mut self) {
            self.abandons.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn arbiter(grant: bool) -> (FocusArbiter, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let requests = Arc::new(AtomicUsize::new(0));
        let abandons = Arc::new(AtomicUsize::new(0));
        let arbiter = FocusArbiter::new(Box::new(ScriptedBackend {
            grant,
            requests: requests.clone(),
            abandons: abandons.clone(),
        }));
        (arbiter, requests, abandons)
    }

    #[test]
    fn test_acquire_granted_holds_focus() {
        let (mut arbiter, requests, _) = arbiter(true);
        assert!(arbiter.acquire());
        assert!(arbiter.held());
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_acquire_denied_leaves_state_untouched() {
        let (mut arbiter, _, abandons) = arbiter(false);
        assert!(!arbiter.acquire());
        assert!(!arbiter.held());
        assert_eq!(abandons.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_release_abandons_and_clears_flags() {
        let (mut arbiter, _, abandons) = arbiter(true);
        arbiter.acquire();
        arbiter.set_resume_on_regain();

        arbiter.release();
        assert!(!arbiter.held());
        assert!(!arbiter.resume_on_regain());
        assert_eq!(abandons.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_without_hold_skips_backend() {
        let (mut arbiter, _, abandons) = arbiter(true);
        arbiter.release();
        assert_eq!(abandons.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_note_lost_keeps_resume_flag() {
        let (mut arbiter, _, _) = arbiter(true);
        arbiter.acquire();
        arbiter.set_resume_on_regain();

        arbiter.note_lost();
        assert!(!arbiter.held());
        assert!(arbiter.resume_on_regain(), "transient loss must not forget the resume intent");
    }
}
