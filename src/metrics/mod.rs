//! Metrics for silverize.
//!
//! Every measurable occurrence is an event type in [`events`]; emitting one
//! records the matching counter or histogram through the `metrics` facade.
//! Installing a recorder is left to the host process.

pub mod events;

/// Emit an internal event.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding metric.
///
/// # Example
///
/// ```ignore
/// use silverize::metrics::events::BytesRead;
///
/// emit!(BytesRead { bytes: 1024 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
