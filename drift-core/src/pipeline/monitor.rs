use crate::config::DriftConfig;
use crate::error::QueryError;
use crate::models::{CycleId, Distribution, DriftVerdict, PredictionEvent};
use crate::pipeline::gate::{TriggerGate, TriggerOutcome};
use crate::pipeline::skew::{calculate_distribution, detect_skew, drift_reason};
use crate::pipeline::traits::{Clock, EventSource, RetrainTrigger};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, info_span, warn, Instrument};

/// What one check cycle concluded.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Enough samples; a verdict was computed and, when skewed, the gate consulted.
    Checked {
        distribution: Distribution,
        verdict: DriftVerdict,
        trigger: Option<TriggerOutcome>,
    },
    /// Too few samples to judge the window.
    Skipped { sample_count: usize, minimum: usize },
    /// The event store could not be queried; nothing was evaluated.
    QueryFailed(QueryError),
}

#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub fn trigger(&self) -> Option<&TriggerOutcome> {
        match &self.outcome {
            CycleOutcome::Checked { trigger, .. } => trigger.as_ref(),
            _ => None,
        }
    }

    pub fn verdict(&self) -> Option<&DriftVerdict> {
        match &self.outcome {
            CycleOutcome::Checked { verdict, .. } => Some(verdict),
            _ => None,
        }
    }
}

pub struct DriftMonitor<E, T, C>
where
    E: EventSource,
    T: RetrainTrigger,
    C: Clock,
{
    pub source: E,
    pub gate: TriggerGate<T, C>,
    pub clock: C,
    pub settings: DriftConfig,
}

impl<E, T, C> DriftMonitor<E, T, C>
where
    E: EventSource,
    T: RetrainTrigger,
    C: Clock + Clone,
{
    /// Wire a monitor whose gate shares the monitor's clock.
    pub fn new(source: E, trigger: T, clock: C, settings: DriftConfig) -> Self {
        let gate = TriggerGate::new(trigger, clock.clone(), settings.cooldown);
        Self {
            source,
            gate,
            clock,
            settings,
        }
    }
}

impl<E, T, C> DriftMonitor<E, T, C>
where
    E: EventSource,
    T: RetrainTrigger,
    C: Clock,
{
    /// Run one check over the lookback window ending now.
    ///
    /// Everything logged during the cycle carries the cycle id. Trigger
    /// outcomes are logged by the gate.
    pub async fn run_check(&mut self) -> CycleReport {
        let cycle_id = CycleId::new();
        let window_end = self.clock.now();
        let window_start = window_end
            .checked_sub_signed(self.settings.lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let span = info_span!("cycle", id = %cycle_id);
        let outcome = async {
            match self.source.query(window_start, window_end).await {
                Ok(events) => self.evaluate(&events).await,
                Err(err) => {
                    error!(error = %err, "failed to query prediction events");
                    CycleOutcome::QueryFailed(err)
                }
            }
        }
        .instrument(span)
        .await;
        CycleReport {
            cycle_id,
            started_at: window_end,
            outcome,
        }
    }

    async fn evaluate(&mut self, events: &[PredictionEvent]) -> CycleOutcome {
        let minimum = self.settings.min_samples;
        if events.len() < minimum {
            info!(sample_count = events.len(), minimum, "insufficient samples, check skipped");
            return CycleOutcome::Skipped {
                sample_count: events.len(),
                minimum,
            };
        }

        let threshold = self.settings.skew_threshold;
        let distribution = calculate_distribution(events);
        let verdict = detect_skew(&distribution, threshold);
        let trigger = if verdict.is_skewed {
            let reason = drift_reason(&verdict, threshold);
            warn!(%reason, samples = events.len(), %distribution, "drift detected");
            Some(self.gate.attempt(&reason).await)
        } else {
            info!(
                samples = events.len(),
                %distribution,
                max_proportion_pct = verdict.proportion * 100.0,
                threshold_pct = threshold * 100.0,
                "no drift detected"
            );
            None
        };
        CycleOutcome::Checked {
            distribution,
            verdict,
            trigger,
        }
    }

    /// Check, sleep, repeat until `shutdown` turns `true`.
    ///
    /// A running cycle always completes; the signal is honoured while
    /// sleeping and before the next cycle starts.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.log_configuration();
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            self.run_check().await;

            info!(seconds = self.settings.check_interval.as_secs(), "sleeping until next check");
            tokio::select! {
                _ = tokio::time::sleep(self.settings.check_interval) => {}
                _ = cancelled(&mut shutdown) => {}
            }
        }
        info!("drift monitor stopped");
    }

    fn log_configuration(&self) {
        let s = &self.settings;
        info!(
            interval_secs = s.check_interval.as_secs(),
            lookback_minutes = s.lookback.num_minutes(),
            threshold_pct = s.skew_threshold * 100.0,
            min_samples = s.min_samples,
            cooldown_minutes = s.cooldown.num_minutes(),
            "drift monitor started"
        );
    }
}

/// Resolves once the flag is `true`; pends forever if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
