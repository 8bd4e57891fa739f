//! Shared infrastructure for the LLM gateway crates: the event-fanout
//! primitive used for observability hooks, and the closed error taxonomy
//! every layer eventually reports through.

pub mod error;
pub mod events;

pub use error::{ErrorKind, GatewayError, ProviderFailure};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
