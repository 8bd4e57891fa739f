use gateway_core::events::ResilienceEvent;
use std::time::Instant;

/// Events emitted by the batcher (spec §4.5).
#[derive(Debug)]
pub enum BatcherEvent {
    Opened {
        name: String,
        timestamp: Instant,
    },
    Joined {
        name: String,
        timestamp: Instant,
        batch_size: usize,
    },
    Flushed {
        name: String,
        timestamp: Instant,
        batch_size: usize,
        age: std::time::Duration,
    },
}

impl ResilienceEvent for BatcherEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BatcherEvent::Opened { .. } => "opened",
            BatcherEvent::Joined { .. } => "joined",
            BatcherEvent::Flushed { .. } => "flushed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BatcherEvent::Opened { timestamp, .. }
            | BatcherEvent::Joined { timestamp, .. }
            | BatcherEvent::Flushed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BatcherEvent::Opened { name, .. }
            | BatcherEvent::Joined { name, .. }
            | BatcherEvent::Flushed { name, .. } => name,
        }
    }
}
