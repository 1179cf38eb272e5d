//! Contains common, primitive types shared across the Fieldclock engine.
//!
//! This module defines the key type used to uniquely identify scheduled
//! tasks. Using a distinct slotmap key instead of a bare index improves type
//! safety: a `TaskKey` can only be obtained from the engine's own registry,
//! so a stale or foreign index can never reach another task's state.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely and safely identifies a task registered with the engine.
    ///
    /// This key is returned when a task is added to the engine and is carried
    /// by every event that concerns the task. It is guaranteed to be unique
    /// for the lifetime of the process and will not be reused.
    pub struct TaskKey;
}
