//! Tradepost - Market Board Synchronization Scheduler
//!
//! Polls per-server market boards in priority-tiered, deadline-bounded batches.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use tradepost::adapters::cli::{CliApp, Command, ReclassifyCmd, RequestCmd, StatusCmd, UpdateCmd};
use tradepost::adapters::http::{HttpMarketApi, MarketApiConfig};
use tradepost::adapters::memory::{
    MemoryMarketStore, MemoryNameRegistry, MemoryPairRepository, MemoryPriorityCache,
    MemoryTokenSource,
};
use tradepost::application::{ManualUpdateService, ReclassifyJob, RunnerSettings, UpdateRunner};
use tradepost::config::{load_config, Config};
use tradepost::domain::pair::PairState;
use tradepost::domain::token_pool::AuthToken;
use tradepost::ports::repository::PairRepositoryPort;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (session tokens go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Update(cmd) => update_command(cmd).await,
        Command::Reclassify(cmd) => reclassify_command(cmd).await,
        Command::Request(cmd) => request_command(cmd).await,
        Command::Status(cmd) => status_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Adapter set shared by the commands. Pairs, documents, names and the
/// priority cache live in process memory for now; the ports keep the
/// application layer indifferent to that.
struct Services {
    config: Config,
    api: Arc<HttpMarketApi>,
    store: Arc<MemoryMarketStore>,
    pairs: Arc<MemoryPairRepository>,
    tokens: Arc<MemoryTokenSource>,
    names: Arc<MemoryNameRegistry>,
    cache: Arc<MemoryPriorityCache>,
}

fn build_services(config_path: &std::path::Path) -> Result<Services> {
    let config = load_config(config_path).context("Failed to load configuration")?;

    let api = HttpMarketApi::new(MarketApiConfig::from(&config.api))
        .context("Failed to build market API client")?;

    Ok(Services {
        tokens: Arc::new(MemoryTokenSource::new(session_tokens(&config))),
        api: Arc::new(api),
        store: Arc::new(MemoryMarketStore::new()),
        pairs: Arc::new(MemoryPairRepository::new()),
        names: Arc::new(MemoryNameRegistry::new()),
        cache: Arc::new(MemoryPriorityCache::new()),
        config,
    })
}

/// One shared session token from the environment, applied to every
/// configured world. Absent token means runs skip every pair.
fn session_tokens(config: &Config) -> Vec<AuthToken> {
    match std::env::var("TRADEPOST_SESSION_TOKEN") {
        Ok(token) if !token.is_empty() => config
            .worlds
            .iter()
            .map(|world| AuthToken {
                server: world.id,
                online: true,
                token: token.clone(),
            })
            .collect(),
        _ => {
            tracing::warn!("TRADEPOST_SESSION_TOKEN not set; all pairs will be skipped");
            Vec::new()
        }
    }
}

async fn update_command(cmd: UpdateCmd) -> Result<()> {
    let services = build_services(&cmd.config)?;
    let config = &services.config;

    let runner = UpdateRunner::new(
        services.api.clone(),
        services.store.clone(),
        services.pairs.clone(),
        services.tokens.clone(),
        services.names.clone(),
        config.server_registry(),
        RunnerSettings {
            blackout_minutes: config.scheduler.blackout_minutes.clone(),
            error_threshold: config.scheduler.error_threshold,
        },
    );

    let batch = cmd.batch.unwrap_or(config.scheduler.max_batch_size);
    let deadline = cmd.deadline.unwrap_or(config.scheduler.cron_deadline_secs);

    let summary = runner.run(cmd.tier, batch, deadline).await?;

    println!("Tier {} run complete", summary.tier);
    println!("  processed:  {}", summary.processed);
    println!("  no token:   {}", summary.skipped_no_token);
    if let Some(halt) = summary.halt {
        println!("  halted:     {:?}", halt);
    }
    if summary.critical {
        println!(
            "  CRITICAL:   {} exceptions recorded",
            summary.exceptions.len()
        );
        for record in &summary.exceptions {
            println!("    [{:?}] {} ({})", record.kind, record.message, record.context);
        }
    }

    Ok(())
}

async fn reclassify_command(cmd: ReclassifyCmd) -> Result<()> {
    let services = build_services(&cmd.config)?;

    let job = ReclassifyJob::new(
        services.pairs.clone(),
        services.store.clone(),
        services.cache.clone(),
        services.config.classifier_config(),
    );

    let summary = job.run().await?;

    println!("Reclassification complete");
    println!("  examined:   {}", summary.examined);
    println!("  updating:   {}", summary.updating);
    println!("  never sold: {}", summary.never_sold);
    println!("  sourced:    {}", summary.sourced_skipped);

    Ok(())
}

async fn request_command(cmd: RequestCmd) -> Result<()> {
    let services = build_services(&cmd.config)?;
    let config = &services.config;

    let manual = ManualUpdateService::new(
        services.pairs.clone(),
        config.server_registry(),
        config.manual.cooldown_secs,
    );

    let now = chrono::Utc::now().timestamp() as u64;
    let attached = manual.request(cmd.item, cmd.server, cmd.tier, now).await?;

    println!(
        "Flagged {} pair(s) for item {} across the data center of server {}",
        attached, cmd.item, cmd.server
    );

    Ok(())
}

async fn status_command(cmd: StatusCmd) -> Result<()> {
    let services = build_services(&cmd.config)?;
    let config = &services.config;
    let registry = config.server_registry();

    let pairs = services.pairs.all_pairs().await?;
    let sourced = pairs.iter().filter(|p| p.state == PairState::Sourced).count();
    let never_sold = pairs
        .iter()
        .filter(|p| p.state == PairState::NeverSold)
        .count();
    let updating = pairs.len() - sourced - never_sold;

    println!("Worlds configured: {}", registry.len());
    println!("Tracked pairs:     {}", pairs.len());
    println!("  updating:   {}", updating);
    println!("  sourced:    {}", sourced);
    println!("  never sold: {}", never_sold);
    println!("Tier ladder:");
    for bound in &config.classifier.tier_bounds {
        println!(
            "  tier {:>2}  sells within {:>8}s",
            bound.tier, bound.max_interval_secs
        );
    }

    Ok(())
}
