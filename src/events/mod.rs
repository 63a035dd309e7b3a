//! Domain events for projects, members and invites.
//!
//! Services dispatch an event after every successful state change. Without
//! registered listeners dispatching does nothing.
//!
//! ```rust,ignore
//! use gatehouse::register_event_listeners;
//! use gatehouse::events::listeners::LoggingListener;
//!
//! register_event_listeners(|registry| {
//!     registry.listen(LoggingListener::new());
//! });
//! ```
//!
//! Implement [`Listener`] to forward events elsewhere, for example to send
//! the invite email when [`ProjectEvent::InviteCreated`] fires.

mod event;
mod listener;
mod registry;

pub mod listeners;

pub use event::ProjectEvent;
pub use listener::Listener;
pub use registry::{EventRegistry, dispatch, register_event_listeners};
