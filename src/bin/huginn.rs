//! huginn — fetch a JSON resource through the cache and retry controller.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use huginn::{
    Config, FetchController, HttpTransport, RequestSpec, RequestState, RequestStatus,
    ResourceCache, RetryPolicy,
};

/// Huginn CLI
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Fetch, cache and retry JSON resources")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a resource and print it as JSON
    Fetch {
        /// Resource URL
        url: String,
        /// Query parameter (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        param: Vec<(String, String)>,
        /// Skip cached and persisted entries
        #[arg(long)]
        refetch: bool,
        /// Cache validity window in milliseconds
        #[arg(long)]
        ttl_ms: Option<u64>,
        /// Retries after the first attempt
        #[arg(long)]
        max_retries: Option<u32>,
        /// Delay before the first retry in milliseconds
        #[arg(long)]
        base_backoff_ms: Option<u64>,
        /// Don't read or write persisted entries
        #[arg(long)]
        no_persist: bool,
    },

    /// Remove the persisted entry for a resource
    Invalidate {
        /// Resource URL
        url: String,
        /// Query parameter (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        param: Vec<(String, String)>,
    },

    /// Print the effective configuration
    Config,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn request_spec(url: String, params: Vec<(String, String)>) -> RequestSpec {
    params
        .into_iter()
        .fold(RequestSpec::new(url), |spec, (k, v)| spec.param(k, v))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    match args.command {
        Command::Fetch {
            url,
            param,
            refetch,
            ttl_ms,
            max_retries,
            base_backoff_ms,
            no_persist,
        } => {
            let mut fetch = config.fetch.clone();
            if let Some(ms) = ttl_ms {
                fetch.ttl_ms = ms;
            }
            if let Some(n) = max_retries {
                fetch.max_retries = n;
            }
            if let Some(ms) = base_backoff_ms {
                fetch.base_backoff_ms = ms;
            }
            let options = fetch.options();
            options.validate()?;

            let spec = request_spec(url, param);
            let key = spec.signature();

            let mut builder = FetchController::<serde_json::Value>::builder()
                .transport(Arc::new(HttpTransport::<serde_json::Value>::new()?))
                .cache(Arc::new(ResourceCache::with_max_entries(
                    config.cache.max_entries,
                )));
            if !no_persist {
                if let Some(persistence) = config.persistence.build() {
                    builder = builder.persistence(persistence);
                }
            }
            let controller = builder.build()?;

            info!(version = huginn::version_string(), %key, target = %spec.target, "fetching");

            let policy = RetryPolicy::new(&options);
            let mut rx = controller.subscribe();
            if refetch {
                controller.refetch(key, spec, &options);
            } else {
                controller.trigger(key, spec, &options);
            }

            let settled = loop {
                let state = rx.borrow_and_update().clone();
                report(&state, &policy);
                if !state.is_loading() {
                    break state;
                }
                rx.changed().await?;
            };

            match (settled.status, settled.data, settled.error) {
                (RequestStatus::Error, _, Some(err)) => return Err(err.into()),
                (_, Some(data), _) => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => {}
            }
        }

        Command::Invalidate { url, param } => {
            let key = request_spec(url, param).signature();
            match config.persistence.build() {
                Some(persistence) => {
                    persistence.remove(&key);
                    println!("invalidated {key}");
                }
                None => println!("persistence disabled, nothing to invalidate"),
            }
        }

        Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Progress line on stderr for each observed state.
fn report(state: &RequestState<serde_json::Value>, policy: &RetryPolicy) {
    match state.status {
        RequestStatus::Loading if state.attempt > 0 => {
            let delay = policy.delay_for_attempt(state.attempt - 1);
            eprintln!("retry {} in {} ms", state.attempt, delay.as_millis());
        }
        RequestStatus::Loading => eprintln!("loading"),
        status => eprintln!("{status}"),
    }
}
