//! Priority queue with starvation-bounded dispatch and content-similarity
//! coalescence (spec §4.4).
//!
//! ```no_run
//! use gateway_queue::PriorityQueue;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let queue = PriorityQueue::builder().build(|ticket| {
//!     Box::pin(async move {
//!         ticket.complete(Ok(format!("echo: {}", ticket.prompt)));
//!     })
//! });
//! let mut rx = queue
//!     .enqueue("hello".to_string(), 256, 0, CancellationToken::new())
//!     .unwrap();
//! let outcome = rx.recv().await.unwrap();
//! # }
//! ```

mod config;
mod events;
mod queue;
mod similarity;
mod ticket;

pub use config::{PriorityQueueConfig, PriorityQueueConfigBuilder};
pub use events::QueueEvent;
pub use queue::PriorityQueue;
pub use similarity::similarity;
pub use ticket::{Ticket, TicketOutcome};
