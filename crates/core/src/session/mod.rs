//! Session-level notifications

pub mod events;

pub use events::{SessionEvent, SessionEvents};
