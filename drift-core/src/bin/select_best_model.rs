//! Print the name of the best evaluated model.
//!
//! Writes the bare name (no newline) to stdout and exits 0, or exits 1 with
//! nothing on stdout when no candidate qualifies or the store cannot be read.

use clap::Parser;
use dotenv::dotenv;
use drift_core::config::{
    StoreConfig, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_INDEX_PATTERN, DEFAULT_MODEL_BUCKETS,
};
use drift_core::selector::{BestModelSelector, ElasticMetricsStore};
use drift_core::telemetry::{init_subscriber, Verbosity};
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "select_best_model",
    version,
    about = "Pick the best model by latest f1 then accuracy"
)]
struct Args {
    /// Base URL of the metrics store, e.g. http://elasticsearch:9200
    store_url: String,

    /// Comma separated allow-list of model names
    models: Option<String>,

    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, default_value = DEFAULT_INDEX_PATTERN)]
    index: String,

    /// Maximum number of distinct models considered
    #[arg(long, default_value_t = DEFAULT_MODEL_BUCKETS)]
    buckets: usize,

    #[arg(long, env = "ELASTICSEARCH_USER", hide_env_values = true)]
    user: Option<String>,

    #[arg(long, env = "ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn allow_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

async fn run(args: Args) -> anyhow::Result<Option<String>> {
    let base_url = Url::parse(&args.store_url)?;
    let mut config = StoreConfig::for_url(base_url);
    config.index = args.index;
    config.timeout = Duration::from_secs(args.timeout_secs.max(1));
    config.user = args.user.filter(|u| !u.trim().is_empty());
    config.password = config.user.as_ref().and(args.password);

    let store = ElasticMetricsStore::new(&config)?.with_buckets(args.buckets);
    let selector = BestModelSelector::new(store);
    let allowed = allow_list(args.models.as_deref());
    let selection = selector.try_select(&allowed).await?;
    Ok(selection.map(|s| s.model_name))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();
    init_subscriber(if args.verbose { Verbosity::Verbose } else { Verbosity::Quiet });

    match run(args).await {
        Ok(Some(name)) => {
            let mut stdout = std::io::stdout().lock();
            if write!(stdout, "{name}").and_then(|_| stdout.flush()).is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("no model found");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_skips_blank_entries() {
        assert_eq!(allow_list(Some(" a, ,b,")), vec!["a".to_string(), "b".to_string()]);
        assert!(allow_list(Some("")).is_empty());
        assert!(allow_list(None).is_empty());
    }

    #[test]
    fn parses_positional_arguments() {
        let argv = ["select_best_model", "http://es:9200", "a,b", "--buckets", "5"];
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.store_url, "http://es:9200");
        assert_eq!(args.models.as_deref(), Some("a,b"));
        assert_eq!(args.buckets, 5);
        assert_eq!(args.index, DEFAULT_INDEX_PATTERN);
    }
}
