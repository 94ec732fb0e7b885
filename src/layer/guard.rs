//! Guarding against nested redraws.
//!
//! A redraw must not start while another one is running. Collaborators
//! that are called during a redraw, such as the renderer, can hold a
//! [`RedrawHandle`] to ask for another redraw. Such a request is queued and
//! carried out once the running redraw has finished. Multiple requests
//! during one redraw result in a single additional pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const BUSY: u8 = 1;
const PENDING: u8 = 2;


//------------ RedrawHandle --------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct RedrawHandle(Arc<AtomicU8>);

impl RedrawHandle {
    /// Requests a redraw after the currently running one.
    ///
    /// Returns whether the request was queued. If no redraw is running, the
    /// request is ignored and `false` is returned. The caller should then
    /// redraw the layer directly.
    pub fn request(&self) -> bool {
        match self.0.compare_exchange(
            BUSY, PENDING, Ordering::AcqRel, Ordering::Acquire
        ) {
            Ok(_) => true,
            Err(state) => state == PENDING,
        }
    }

    /// Returns whether a redraw is currently running.
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire) != IDLE
    }

    /// Starts a redraw.
    ///
    /// The caller must make sure no redraw is running already.
    pub(super) fn enter(&self) -> RedrawGuard {
        let prev = self.0.swap(BUSY, Ordering::AcqRel);
        debug_assert_eq!(prev, IDLE, "nested redraw");
        RedrawGuard(self.0.clone())
    }
}


//------------ RedrawGuard ---------------------------------------------------

/// Marks a redraw as running for as long as it lives.
#[derive(Debug)]
pub(super) struct RedrawGuard(Arc<AtomicU8>);

impl RedrawGuard {
    /// Finishes a pass.
    ///
    /// Returns whether another pass has been requested in the meantime.
    pub fn finish_pass(&self) -> bool {
        self.0.swap(BUSY, Ordering::AcqRel) == PENDING
    }
}

impl Drop for RedrawGuard {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release)
    }
}


//============ Tests =========================================================
