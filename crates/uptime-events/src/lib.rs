//! uptime-events — in-process delivery of monitor status events.
//!
//! `EventBus` implements `uptime_sync::EventSource`: listeners register
//! per event kind, `publish` fans a payload out to every listener of that
//! kind, and releasing the returned `Subscription` detaches exactly the
//! listener it was issued for.

pub mod bus;

pub use bus::EventBus;
