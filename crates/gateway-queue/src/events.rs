use gateway_core::events::ResilienceEvent;
use std::time::Instant;

/// Events emitted by the priority queue (spec §4.4), for metrics/tracing.
#[derive(Debug)]
pub enum QueueEvent {
    Enqueued {
        name: String,
        timestamp: Instant,
        depth: usize,
    },
    Coalesced {
        name: String,
        timestamp: Instant,
        similarity: f64,
    },
    Dispatched {
        name: String,
        timestamp: Instant,
        waited: std::time::Duration,
    },
    Dropped {
        name: String,
        timestamp: Instant,
        reason: &'static str,
    },
}

impl ResilienceEvent for QueueEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QueueEvent::Enqueued { .. } => "enqueued",
            QueueEvent::Coalesced { .. } => "coalesced",
            QueueEvent::Dispatched { .. } => "dispatched",
            QueueEvent::Dropped { .. } => "dropped",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            QueueEvent::Enqueued { timestamp, .. }
            | QueueEvent::Coalesced { timestamp, .. }
            | QueueEvent::Dispatched { timestamp, .. }
            | QueueEvent::Dropped { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            QueueEvent::Enqueued { name, .. }
            | QueueEvent::Coalesced { name, .. }
            | QueueEvent::Dispatched { name, .. }
            | QueueEvent::Dropped { name, .. } => name,
        }
    }
}
