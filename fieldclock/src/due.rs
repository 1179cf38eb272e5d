//! The per-task due flag: the sole coordination surface between the clock
//! and one worker.
//!
//! Each flag is created as a pair of single-direction handles, in the same
//! spirit as a channel's sender/receiver split: the clock holds a
//! [`DueSetter`] and can only raise the flag, the owning worker holds a
//! [`DueConsumer`] and can only take it down. No other transition is
//! representable, so the one-writer-per-direction discipline holds by
//! construction rather than by convention.
//!
//! A raised flag does not count: raising an already-raised flag merges the
//! two firings into one. [`DueSetter::raise`] reports that case so the clock
//! can surface it instead of losing it silently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Creates a connected setter/consumer pair around a fresh, lowered flag.
pub fn due_pair() -> (DueSetter, DueConsumer) {
    let cell = Arc::new(AtomicBool::new(false));
    (DueSetter(cell.clone()), DueConsumer(cell))
}

/// The clock's half of a due flag. Can only transition the flag to raised.
#[derive(Debug)]
pub struct DueSetter(Arc<AtomicBool>);

impl DueSetter {
    /// Raises the flag.
    ///
    /// Returns `true` when the flag was already raised, meaning the previous
    /// firing has not been consumed yet and the two have merged.
    pub fn raise(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }
}

/// The worker's half of a due flag. Can only observe or take the flag down.
#[derive(Debug)]
pub struct DueConsumer(Arc<AtomicBool>);

impl DueConsumer {
    /// Takes the flag: returns `true` and lowers it if it was raised.
    ///
    /// The worker takes the flag before servicing, so a raise that lands
    /// mid-service stays pending for the next poll instead of being wiped
    /// by a late clear.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Peeks at the flag without consuming it.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
