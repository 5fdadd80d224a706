//! Cooldown guard in front of the retraining trigger.
//!
//! The gate is `Idle` when no successful trigger happened yet or the last one
//! is at least `cooldown` old, and `CooldownActive` otherwise. The state is
//! derived from `last_trigger` on every attempt rather than stored.

use crate::error::TriggerError;
use crate::pipeline::traits::{Clock, RetrainTrigger};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, warn};

#[derive(Debug)]
pub enum TriggerOutcome {
    /// The endpoint accepted the request; cooldown starts at `at`.
    Triggered { at: DateTime<Utc> },
    /// Rejected locally, no request was sent.
    CooldownRejected { remaining: TimeDelta },
    /// No usable credential; nothing was sent.
    NotConfigured,
    /// The request was sent (or attempted) and failed.
    Failed(TriggerError),
}

impl TriggerOutcome {
    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered { .. })
    }
}

pub struct TriggerGate<T, C> {
    trigger: T,
    clock: C,
    cooldown: TimeDelta,
    last_trigger: Option<DateTime<Utc>>,
}

impl<T, C> TriggerGate<T, C>
where
    T: RetrainTrigger,
    C: Clock,
{
    pub fn new(trigger: T, clock: C, cooldown: TimeDelta) -> Self {
        Self {
            trigger,
            clock,
            cooldown,
            last_trigger: None,
        }
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    pub fn last_trigger(&self) -> Option<DateTime<Utc>> {
        self.last_trigger
    }

    /// Time left before the next attempt may call out, if any.
    pub fn cooldown_remaining(&self) -> Option<TimeDelta> {
        let last = self.last_trigger?;
        let elapsed = self.clock.now().signed_duration_since(last);
        if elapsed < self.cooldown {
            Some(self.cooldown.checked_sub(&elapsed).unwrap_or(TimeDelta::MAX))
        } else {
            None
        }
    }

    /// Request a retraining run unless a previous one is still cooling down.
    ///
    /// Only a confirmed success moves `last_trigger`; every other outcome
    /// leaves the gate exactly as it was.
    pub async fn attempt(&mut self, reason: &str) -> TriggerOutcome {
        if let Some(remaining) = self.cooldown_remaining() {
            info!(
                remaining_minutes = remaining.num_seconds() as f64 / 60.0,
                "cooldown active, retraining not triggered"
            );
            return TriggerOutcome::CooldownRejected { remaining };
        }

        let cause = format!("Drift detected: {reason}");
        match self.trigger.trigger(&cause).await {
            Ok(()) => {
                let now = self.clock.now();
                let at = match self.last_trigger {
                    Some(previous) if previous > now => previous,
                    _ => now,
                };
                self.last_trigger = Some(at);
                info!(%at, "retraining pipeline triggered");
                TriggerOutcome::Triggered { at }
            }
            Err(TriggerError::MissingCredential) => {
                warn!("retraining trigger token not set; cannot trigger pipeline");
                TriggerOutcome::NotConfigured
            }
            Err(err) => {
                error!(error = %err, "retraining trigger failed");
                TriggerOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mock::{ManualClock, RecordingTrigger, UnconfiguredTrigger};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn second_attempt_inside_cooldown_makes_no_call() {
        let clock = ManualClock::new(start());
        let mut gate = TriggerGate::new(
            RecordingTrigger::succeeding(),
            clock.clone(),
            TimeDelta::minutes(30),
        );

        assert!(gate.attempt("first").await.is_triggered());
        assert_eq!(gate.last_trigger(), Some(start()));

        clock.advance(TimeDelta::minutes(10));
        match gate.attempt("second").await {
            TriggerOutcome::CooldownRejected { remaining } => {
                assert_eq!(remaining, TimeDelta::minutes(20));
            }
            other => panic!("expected cooldown rejection, got {other:?}"),
        }
        assert_eq!(gate.trigger().calls().len(), 1);
        assert_eq!(gate.last_trigger(), Some(start()));
    }

    #[tokio::test]
    async fn attempt_after_cooldown_is_allowed() {
        let clock = ManualClock::new(start());
        let mut gate = TriggerGate::new(
            RecordingTrigger::succeeding(),
            clock.clone(),
            TimeDelta::minutes(30),
        );

        assert!(gate.attempt("first").await.is_triggered());
        clock.advance(TimeDelta::minutes(30));
        assert!(gate.cooldown_remaining().is_none());
        assert!(gate.attempt("again").await.is_triggered());

        let calls = gate.trigger().calls();
        assert_eq!(calls, vec!["Drift detected: first", "Drift detected: again"]);
        assert_eq!(gate.last_trigger(), Some(start() + TimeDelta::minutes(30)));
    }

    #[tokio::test]
    async fn failed_trigger_keeps_gate_idle() {
        let clock = ManualClock::new(start());
        let mut gate = TriggerGate::new(
            RecordingTrigger::failing(503),
            clock.clone(),
            TimeDelta::minutes(30),
        );

        match gate.attempt("flaky").await {
            TriggerOutcome::Failed(TriggerError::Status { status, .. }) => {
                assert_eq!(status, 503)
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(gate.last_trigger().is_none());

        gate.trigger().set_failure(None);
        assert!(gate.attempt("flaky").await.is_triggered());
        assert_eq!(gate.trigger().calls().len(), 2);
    }

    #[tokio::test]
    async fn missing_credential_is_not_configured() {
        let clock = ManualClock::new(start());
        let mut gate = TriggerGate::new(UnconfiguredTrigger, clock, TimeDelta::minutes(30));
        assert!(matches!(gate.attempt("drift").await, TriggerOutcome::NotConfigured));
        assert!(gate.last_trigger().is_none());
        assert!(gate.cooldown_remaining().is_none());
    }

    #[tokio::test]
    async fn zero_cooldown_never_rejects() {
        let clock = ManualClock::new(start());
        let mut gate = TriggerGate::new(RecordingTrigger::succeeding(), clock, TimeDelta::zero());
        assert!(gate.attempt("a").await.is_triggered());
        assert!(gate.attempt("b").await.is_triggered());
    }

    #[tokio::test]
    async fn clock_rewind_keeps_gate_cooling_down() {
        let clock = ManualClock::new(start());
        let mut gate = TriggerGate::new(
            RecordingTrigger::succeeding(),
            clock.clone(),
            TimeDelta::minutes(30),
        );
        assert!(gate.attempt("a").await.is_triggered());

        clock.set(start() - TimeDelta::minutes(5));
        assert!(matches!(
            gate.attempt("b").await,
            TriggerOutcome::CooldownRejected { .. }
        ));
        assert_eq!(gate.last_trigger(), Some(start()));
        assert_eq!(gate.trigger().calls().len(), 1);
    }

    #[tokio::test]
    async fn extreme_cooldown_with_rewound_clock_saturates() {
        let clock = ManualClock::new(start());
        let mut gate =
            TriggerGate::new(RecordingTrigger::succeeding(), clock.clone(), TimeDelta::MAX);
        assert!(gate.attempt("a").await.is_triggered());

        clock.set(start() - TimeDelta::days(1));
        assert_eq!(gate.cooldown_remaining(), Some(TimeDelta::MAX));
        assert!(matches!(
            gate.attempt("b").await,
            TriggerOutcome::CooldownRejected { remaining } if remaining == TimeDelta::MAX
        ));
        assert_eq!(gate.trigger().calls().len(), 1);
    }
}
