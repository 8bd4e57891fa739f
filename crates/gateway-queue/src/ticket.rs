use gateway_core::error::GatewayError;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Outcome broadcast to every caller coalesced onto the same ticket.
pub type TicketOutcome = Result<String, GatewayError>;

/// A queued request awaiting dispatch (spec §4.4).
///
/// Coalesced callers never create their own ticket; they subscribe to the
/// completion channel of the ticket their prompt matched. `similarity_score`
/// is the best match this prompt had against anything still live in the
/// recent window at enqueue time — `1.0` (no bonus) when nothing comparable
/// was around, lower the more distinct the prompt was from its neighbors,
/// so a genuinely novel request floats ahead of near-duplicates per spec
/// §4.4's similarity term.
pub struct Ticket {
    pub id: u64,
    pub prompt: String,
    pub max_tokens: u32,
    pub nominal_priority: i32,
    pub enqueued_at: Instant,
    pub similarity_score: f64,
    pub cancel: CancellationToken,
    starvation_counter: AtomicU32,
    completed: AtomicBool,
    completion: broadcast::Sender<TicketOutcome>,
}

impl Ticket {
    pub fn new(
        id: u64,
        prompt: String,
        max_tokens: u32,
        nominal_priority: i32,
        similarity_score: f64,
        cancel: CancellationToken,
    ) -> (Self, broadcast::Receiver<TicketOutcome>) {
        let (tx, rx) = broadcast::channel(1);
        let ticket = Self {
            id,
            prompt,
            max_tokens,
            nominal_priority,
            enqueued_at: Instant::now(),
            similarity_score,
            cancel,
            starvation_counter: AtomicU32::new(0),
            completed: AtomicBool::new(false),
            completion: tx,
        };
        (ticket, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketOutcome> {
        self.completion.subscribe()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether this ticket has already been delivered an outcome. A
    /// completed ticket is no longer eligible as a coalescence target.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub fn waiting_for(&self) -> std::time::Duration {
        self.enqueued_at.elapsed()
    }

    pub fn starvation_counter(&self) -> u32 {
        self.starvation_counter.load(Ordering::Relaxed)
    }

    pub fn bump_starvation(&self) {
        self.starvation_counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Effective priority used for dispatch ordering (spec §4.4): lower
    /// values dispatch first. It is the negation of `nominalPriority` plus
    /// the starvation/waiting/similarity bonuses, so a ticket with a higher
    /// nominal priority, or one that has aged or starved, moves toward the
    /// front (more negative).
    pub fn effective_priority(&self) -> f64 {
        let starvation_bonus = (self.starvation_counter() as f64).min(5.0) * 2.0;
        let waiting_seconds = self.waiting_for().as_secs_f64();
        let waiting_bonus = (waiting_seconds / 30.0).min(10.0) * 3.0;
        let similarity_bonus = (1.0 - self.similarity_score) * 2.0;

        -(self.nominal_priority as f64 + starvation_bonus + waiting_bonus + similarity_bonus)
    }

    /// Delivers the final outcome to every subscriber. Safe to call when
    /// there are zero receivers (all callers already cancelled away).
    pub fn complete(&self, outcome: TicketOutcome) {
        self.completed.store(true, Ordering::Release);
        let _ = self.completion.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starved_ticket_has_lower_effective_priority() {
        let (t, _rx) = Ticket::new(1, "p".into(), 100, 10, 1.0, CancellationToken::new());
        let base = t.effective_priority();
        t.bump_starvation();
        t.bump_starvation();
        assert!(t.effective_priority() < base);
    }

    #[test]
    fn less_similar_ticket_has_higher_effective_priority() {
        let (novel, _rx) = Ticket::new(1, "p".into(), 100, 10, 0.0, CancellationToken::new());
        let (near_dup, _rx) = Ticket::new(2, "p".into(), 100, 10, 0.8, CancellationToken::new());
        assert!(novel.effective_priority() > near_dup.effective_priority());
    }

    #[test]
    fn coalesced_subscriber_receives_completion() {
        let (t, mut rx1) = Ticket::new(1, "p".into(), 100, 10, 1.0, CancellationToken::new());
        let mut rx2 = t.subscribe();
        t.complete(Ok("done".to_string()));
        assert_eq!(rx1.try_recv().unwrap().unwrap(), "done");
        assert_eq!(rx2.try_recv().unwrap().unwrap(), "done");
    }
}
