use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use rum_loader::app_state::{build_state, data_dir, mask_key_preview, save_config};
use rum_loader::constants::DATA_DIR_ENV;
use rum_loader::loader::{normalize_domain_input, parse_instant, RangeEdge, RangeResult};

#[derive(Parser)]
#[command(name = "rum-loader", version, about = "Load RUM bundles by time range, cached locally")]
struct Cli {
    /// Directory holding config.toml, secrets.json and the response cache.
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Domain to query, or `<org>:all` for a whole org. A pasted URL is reduced to its host.
    #[arg(long, global = true)]
    domain: Option<String>,

    /// Key to send instead of the stored one.
    #[arg(long, global = true)]
    domainkey: Option<String>,

    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Print the full result as JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One hour bucket containing AT.
    Hour { at: String },
    /// One day bucket containing AT.
    Day { at: String },
    /// One month bucket containing AT.
    Month { at: String },
    /// 168 hourly buckets ending at END (default now).
    LastWeek {
        #[arg(long)]
        end: Option<String>,
    },
    #[command(name = "previous-31-days")]
    Previous31Days {
        #[arg(long)]
        end: Option<String>,
    },
    #[command(name = "previous-12-months")]
    Previous12Months {
        #[arg(long)]
        end: Option<String>,
    },
    /// Bundles with START <= timeSlot <= END. Dates without a time cover the whole day.
    Period { start: String, end: Option<String> },
    /// Drop every cached response.
    ClearCache,
    /// Store a key for the current domain, or the account-wide bundler token.
    SetKey {
        key: String,
        #[arg(long)]
        bundler: bool,
    },
}

fn instant(s: &str, edge: RangeEdge) -> anyhow::Result<DateTime<Utc>> {
    parse_instant(s, edge).with_context(|| format!("not a date or RFC 3339 instant: {s}"))
}

fn opt_instant(s: Option<&str>, edge: RangeEdge) -> anyhow::Result<Option<DateTime<Utc>>> {
    s.map(|s| instant(s, edge)).transpose()
}

fn print_result(result: &RangeResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        return Ok(());
    }
    for chunk in &result.chunks {
        println!(
            "{} {:>2} {:<5} {}",
            chunk.date,
            chunk.hour.as_deref().unwrap_or(""),
            chunk.bucket.granularity.as_str(),
            chunk.bundles.len()
        );
    }
    println!("{} bundles in {} buckets", result.len(), result.chunks.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rum_loader=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = data_dir(cli.data_dir.clone());
    let mut state = build_state(&dir)
        .with_context(|| format!("failed to initialise data dir {}", dir.display()))?;

    if let Some(endpoint) = cli.endpoint.as_deref() {
        state.loader.set_api_endpoint(endpoint)?;
    }
    if let Some(domain) = cli.domain.as_deref() {
        state.switch_domain(&normalize_domain_input(domain));
    }
    if let Some(key) = cli.domainkey.as_deref() {
        state.loader.set_domain_key(key);
    }

    let result = match cli.command {
        Command::Hour { at } => state.loader.fetch_hour(instant(&at, RangeEdge::Start)?).await?,
        Command::Day { at } => state.loader.fetch_day(instant(&at, RangeEdge::Start)?).await?,
        Command::Month { at } => state.loader.fetch_month(instant(&at, RangeEdge::Start)?).await?,
        Command::LastWeek { end } => {
            let end = opt_instant(end.as_deref(), RangeEdge::End)?;
            state.loader.fetch_last_week(end).await?
        }
        Command::Previous31Days { end } => {
            let end = opt_instant(end.as_deref(), RangeEdge::End)?;
            state.loader.fetch_previous_31_days(end).await?
        }
        Command::Previous12Months { end } => {
            let end = opt_instant(end.as_deref(), RangeEdge::End)?;
            state.loader.fetch_previous_12_months(end).await?
        }
        Command::Period { start, end } => {
            let start = instant(&start, RangeEdge::Start)?;
            let end = opt_instant(end.as_deref(), RangeEdge::End)?;
            state.loader.fetch_period(start, end).await?
        }
        Command::ClearCache => {
            if !state.loader.clear_cache().await {
                anyhow::bail!("cache at {} could not be cleared", dir.display());
            }
            println!("cache cleared");
            return Ok(());
        }
        Command::SetKey { key, bundler } => {
            if bundler {
                state.keys.set_bundler_token(&key)?;
                println!("bundler token set ({})", mask_key_preview(&key));
            } else {
                let domain = match cli.domain.as_deref() {
                    Some(d) => normalize_domain_input(d),
                    None => state.settings.domain.clone(),
                };
                state.keys.set_domain_key(&domain, &key)?;
                println!("key for {domain} set ({})", mask_key_preview(&key));
            }
            // Remember the domain so later runs default to it.
            if let Some(domain) = cli.domain.as_deref() {
                state.settings.domain = normalize_domain_input(domain);
                save_config(&state.config_path, &state.settings)?;
            }
            return Ok(());
        }
    };

    print_result(&result, cli.json)
}
