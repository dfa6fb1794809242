//! Life-loop scheduler and operator surface for the Vela core.

use std::{env, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use shared_event_bus::{EventPublisher, FileEventPublisher};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};
use vela_consolidator::{ConsolidationOutcome, Consolidator};
use vela_decision::{DecisionEngine, DecisionTelemetry};
use vela_evolver::{EvolutionOutcome, Evolver, EvolverTelemetry};
use vela_executor::{
    BusinessCycle, CopyUpdater, CycleOutcome, DryRunBridge, ExecutorTelemetry, PriceUpdater,
    SafetyStats,
};
use vela_gateway::{FallbackGateway, HttpGateway, LanguageGateway};
use vela_stores::{events, ConfigStore, DataRoot, EventLogStore, JsonlFile, KnowledgeStore};

/// Autonomous commerce core: decide, execute, evolve, consolidate.
#[derive(Debug, Parser)]
#[command(name = "vela", version, about)]
struct Cli {
    /// Data directory root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Run one business cycle and exit.
    #[arg(long)]
    once: bool,

    /// Run one evolution cycle and exit.
    #[arg(long)]
    evolve: bool,

    /// Run memory consolidation once and exit.
    #[arg(long)]
    sleep: bool,

    /// Print the config summary and store statistics, then exit.
    #[arg(long)]
    status: bool,

    /// Bypass the health gate (--evolve) or the event floor (--sleep).
    #[arg(long)]
    force: bool,

    /// Dispatch real side effects instead of the dry-run bridge.
    #[arg(long)]
    live: bool,

    /// Business-cycle period in seconds.
    #[arg(long, default_value_t = 3_600)]
    business_period: u64,

    /// Evolution-cycle period in seconds.
    #[arg(long, default_value_t = 86_400)]
    evolution_period: u64,

    /// Consolidation period in seconds.
    #[arg(long, default_value_t = 604_800)]
    consolidation_period: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = ?err, "cycle failed");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let root = DataRoot::new(&cli.root);

    if cli.status {
        return print_status(&root);
    }

    // Config problems are a distinct failure class for operators.
    let config = ConfigStore::new(root.config(), root.evolution_backups());
    if let Err(err) = config.load_or_init() {
        error!(error = %err, "configuration unusable");
        return Ok(ExitCode::from(2));
    }

    if cli.live {
        error!("live mode requires collaborator endpoints; none are configured in this build");
        return Ok(ExitCode::from(2));
    }

    let gateway = gateway_from_env()?;

    if cli.once {
        let cycle = build_cycle(&root, Arc::clone(&gateway))?;
        return run_business(&cycle).await;
    }
    if cli.evolve {
        let evolver = build_evolver(&root, Arc::clone(&gateway))?;
        return run_evolution(&evolver, cli.force).await;
    }
    if cli.sleep {
        let consolidator = build_consolidator(&root, Arc::clone(&gateway))?;
        return run_consolidation(&consolidator, cli.force).await;
    }

    life_loop(&cli, &root, gateway).await
}

/// The default mode: three periodic jobs, one in flight at a time. A tick
/// that fires while a job is running is dropped, never queued. Ctrl-C lets
/// the in-flight job finish, then halts.
async fn life_loop(
    cli: &Cli,
    root: &DataRoot,
    gateway: Arc<dyn LanguageGateway>,
) -> Result<ExitCode> {
    let cycle = build_cycle(root, Arc::clone(&gateway))?;
    let evolver = build_evolver(root, Arc::clone(&gateway))?;
    let consolidator = build_consolidator(root, gateway)?;

    let mut business = interval_at(Instant::now(), Duration::from_secs(cli.business_period));
    let mut evolution = interval_at(
        Instant::now() + Duration::from_secs(cli.evolution_period),
        Duration::from_secs(cli.evolution_period),
    );
    let mut consolidation = interval_at(
        Instant::now() + Duration::from_secs(cli.consolidation_period),
        Duration::from_secs(cli.consolidation_period),
    );
    business.set_missed_tick_behavior(MissedTickBehavior::Skip);
    evolution.set_missed_tick_behavior(MissedTickBehavior::Skip);
    consolidation.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        business = cli.business_period,
        evolution = cli.evolution_period,
        consolidation = cli.consolidation_period,
        "life loop started"
    );
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stop signal received; halting");
                return Ok(ExitCode::SUCCESS);
            }
            _ = business.tick() => {
                if let Err(err) = cycle.run("scheduled").await {
                    error!(error = %err, "business cycle failed");
                }
            }
            _ = evolution.tick() => {
                if let Err(err) = evolver.evolve(false).await {
                    error!(error = %err, "evolution cycle failed");
                }
            }
            _ = consolidation.tick() => {
                if let Err(err) = consolidator.consolidate(false).await {
                    error!(error = %err, "consolidation failed");
                }
            }
        }
    }
}

async fn run_business(cycle: &BusinessCycle) -> Result<ExitCode> {
    match cycle.run("manual").await? {
        CycleOutcome::Skipped => println!("cycle skipped: stakes below the deliberation floor"),
        CycleOutcome::NoDecision => println!("cycle ended without a decision (unparseable synthesis)"),
        CycleOutcome::Settled(record) => {
            println!(
                "decision {} -> {} (executed: {}, blocked: {}{})",
                record.decision_id,
                record.action,
                record.executed,
                record.blocked_by_safety,
                if record.reason.is_empty() {
                    String::new()
                } else {
                    format!(", reason: {}", record.reason)
                }
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_evolution(evolver: &Evolver, force: bool) -> Result<ExitCode> {
    match evolver.evolve(force).await? {
        EvolutionOutcome::Healthy(report) => {
            println!(
                "strategy healthy (health {:.1}, net profit ${:.2}); no mutation",
                report.health_score, report.net_profit
            );
        }
        EvolutionOutcome::Aborted(report) => {
            println!(
                "mutation aborted: model reply unusable (health {:.1})",
                report.health_score
            );
        }
        EvolutionOutcome::Promoted { report, new_counter } => {
            println!(
                "strategy promoted to generation {new_counter} (health {:.1}, alerts: {:?})",
                report.health_score,
                report.alerts.iter().map(|a| a.as_str()).collect::<Vec<_>>()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_consolidation(consolidator: &Consolidator, force: bool) -> Result<ExitCode> {
    match consolidator.consolidate(force).await? {
        ConsolidationOutcome::TooFewEvents { have } => {
            println!("skipped: only {have} events recorded");
        }
        ConsolidationOutcome::NoInsight => println!("no usable insight; nothing written"),
        ConsolidationOutcome::Written => println!("knowledge base updated"),
    }
    Ok(ExitCode::SUCCESS)
}

/// Pure read of every store; never writes, never bootstraps.
fn print_status(root: &DataRoot) -> Result<ExitCode> {
    println!("vela status ({})", root.root().display());

    let config = ConfigStore::new(root.config(), root.evolution_backups());
    match config.load() {
        Ok(doc) => {
            let p = &doc.strategy_parameters;
            println!(
                "  config: v{} generation {} (last evolution {})",
                doc.meta.version,
                doc.meta.evolution_counter,
                doc.meta.last_evolution.format("%Y-%m-%d %H:%M UTC")
            );
            println!(
                "  strategy: {} / {} / {} (price step {:.2})",
                p.mode.as_str(),
                p.tone,
                p.risk_tolerance.as_str(),
                p.price_step
            );
            if let Some(entry) = doc.evolution_log.last() {
                println!(
                    "  last mutation: {} - {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
                    entry.reasoning
                );
            }
        }
        Err(err) => println!("  config: not initialised yet ({err})"),
    }

    let all_events = EventLogStore::new(root.sales_history()).read_all()?;
    #[allow(clippy::cast_precision_loss)]
    let revenue = events::revenue_minor(&all_events) as f64 / 100.0;
    println!("  events: {} (net revenue ${revenue:.2})", all_events.len());

    let blocks = KnowledgeStore::new(root.knowledge_base()).block_count()?;
    println!("  knowledge: {blocks} consolidated blocks");

    let stats = SafetyStats::from_history(&JsonlFile::new(root.action_history()))?;
    println!(
        "  safety: {} actions ({} executed, {} holds, {} blocked, {} failed, block rate {:.0}%)",
        stats.total,
        stats.executed,
        stats.holds,
        stats.blocked_by_safety,
        stats.failed,
        stats.block_rate() * 100.0
    );
    Ok(ExitCode::SUCCESS)
}

fn gateway_from_env() -> Result<Arc<dyn LanguageGateway>> {
    match (env::var("VELA_GATEWAY_URL"), env::var("VELA_API_KEY")) {
        (Ok(url), Ok(key)) => {
            let gateway =
                HttpGateway::new(url, key).context("building the language gateway client")?;
            Ok(Arc::new(gateway))
        }
        _ => {
            warn!("VELA_GATEWAY_URL/VELA_API_KEY not set; using the deterministic fallback");
            Ok(Arc::new(FallbackGateway))
        }
    }
}

fn build_cycle(root: &DataRoot, gateway: Arc<dyn LanguageGateway>) -> Result<BusinessCycle> {
    let publisher: Arc<dyn EventPublisher> =
        Arc::new(FileEventPublisher::new(root.event_trail())?);
    let engine = DecisionEngine::new(
        root,
        gateway,
        DecisionTelemetry::builder("decision_engine")
            .log_path(root.core_log())
            .event_publisher(Arc::clone(&publisher))
            .build()
            .context("building decision telemetry")?,
    );
    let bridge = Arc::new(DryRunBridge::new());
    Ok(BusinessCycle::new(
        root,
        engine,
        Arc::clone(&bridge) as Arc<dyn PriceUpdater>,
        bridge as Arc<dyn CopyUpdater>,
        ExecutorTelemetry::builder("executor")
            .log_path(root.core_log())
            .event_publisher(publisher)
            .build()
            .context("building executor telemetry")?,
    ))
}

fn build_evolver(root: &DataRoot, gateway: Arc<dyn LanguageGateway>) -> Result<Evolver> {
    let publisher: Arc<dyn EventPublisher> =
        Arc::new(FileEventPublisher::new(root.event_trail())?);
    Ok(Evolver::new(
        root,
        gateway,
        EvolverTelemetry::builder("evolver")
            .log_path(root.core_log())
            .event_publisher(publisher)
            .build()
            .context("building evolver telemetry")?,
    ))
}

fn build_consolidator(root: &DataRoot, gateway: Arc<dyn LanguageGateway>) -> Result<Consolidator> {
    let logger = shared_logging::JsonLogger::new(root.core_log())
        .context("opening the consolidation log")?;
    Ok(Consolidator::new(root, gateway).with_logger(logger))
}
