use async_trait::async_trait;
use clap::Parser;
use dotenv::dotenv;
use drift_core::config::MonitorConfig;
use drift_core::error::TriggerError;
use drift_core::pipeline::{
    DriftMonitor, ElasticEventStore, JenkinsTrigger, LogOnlyTrigger, RetrainTrigger, SystemClock,
    UnconfiguredTrigger,
};
use drift_core::telemetry::{init_subscriber, Verbosity};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "drift-monitor", version, about = "Watch prediction skew and trigger retraining")]
struct Args {
    /// Run a single check cycle and exit
    #[arg(long)]
    once: bool,

    /// Log the retraining request instead of sending it
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

enum Trigger {
    Jenkins(JenkinsTrigger),
    LogOnly(LogOnlyTrigger),
    Unconfigured(UnconfiguredTrigger),
}

#[async_trait]
impl RetrainTrigger for Trigger {
    async fn trigger(&self, cause: &str) -> Result<(), TriggerError> {
        match self {
            Trigger::Jenkins(t) => t.trigger(cause).await,
            Trigger::LogOnly(t) => t.trigger(cause).await,
            Trigger::Unconfigured(t) => t.trigger(cause).await,
        }
    }
}

fn build_trigger(config: &MonitorConfig, dry_run: bool) -> anyhow::Result<Trigger> {
    if dry_run {
        return Ok(Trigger::LogOnly(LogOnlyTrigger));
    }
    if config.ci.token.is_none() {
        warn!("JENKINS_TOKEN is not set; drift will be reported but not acted on");
        return Ok(Trigger::Unconfigured(UnconfiguredTrigger));
    }
    Ok(Trigger::Jenkins(JenkinsTrigger::new(&config.ci)?))
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init_subscriber(Verbosity::from_flags(args.verbose, args.quiet));

    let config = MonitorConfig::from_env()?;
    let store = ElasticEventStore::new(&config.store)?;
    let trigger = build_trigger(&config, args.dry_run)?;
    info!(
        store = %store.search_url(),
        ci_job = %config.ci.base_url,
        job = %config.ci.job,
        dry_run = args.dry_run,
        "monitor configured"
    );

    let mut monitor = DriftMonitor::new(store, trigger, SystemClock, config.drift);

    if args.once {
        monitor.run_check().await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("shutdown requested, finishing current cycle");
        let _ = shutdown_tx.send(true);
    });

    monitor.run(shutdown_rx).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> MonitorConfig {
        let token = token.map(str::to_string);
        MonitorConfig::from_lookup(move |key| match key {
            "JENKINS_TOKEN" => token.clone(),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn dry_run_never_contacts_ci() {
        let trigger = build_trigger(&config(Some("abc")), true).unwrap();
        assert!(matches!(trigger, Trigger::LogOnly(_)));
    }

    #[test]
    fn token_selects_jenkins() {
        let with_token = build_trigger(&config(Some("abc")), false).unwrap();
        assert!(matches!(with_token, Trigger::Jenkins(_)));
        let without = build_trigger(&config(None), false).unwrap();
        assert!(matches!(without, Trigger::Unconfigured(_)));
    }

    #[tokio::test]
    async fn unconfigured_trigger_reports_missing_credential() {
        let trigger = build_trigger(&config(None), false).unwrap();
        assert!(matches!(
            trigger.trigger("Drift detected").await,
            Err(TriggerError::MissingCredential)
        ));
    }

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from(["drift-monitor", "--once", "--dry-run", "-v"]).unwrap();
        assert!(args.once && args.dry_run && args.verbose && !args.quiet);
        assert!(Args::try_parse_from(["drift-monitor", "-v", "-q"]).is_err());
    }
}
