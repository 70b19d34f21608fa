//! Boardroom simulation binary.
//!
//! This is the main entry point that wires together the state store, the
//! generation pipeline, the reset coordinator, the trigger server, and
//! the scheduler loop. It loads configuration, initializes the persisted
//! documents, and runs the simulation until the process is asked to stop.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `boardroom-config.yaml`
//! 3. Create the data directory and the state store
//! 4. Create both documents on first run
//! 5. Assemble the generation pipeline and replication sink
//! 6. Start the trigger HTTP server
//! 7. Run the scheduler loop until Ctrl-C

mod error;
mod replicate;

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use boardroom_core::config::SimulationConfig;
use boardroom_core::intervene::InterventionHandler;
use boardroom_core::reset::ResetCoordinator;
use boardroom_core::scheduler::{SchedulerSettings, SimulationScheduler};
use boardroom_pipeline::GenerationPipeline;
use boardroom_server::{AppState, ServerConfig, start_server};
use boardroom_store::{StateStore, StorePaths};
use boardroom_types::EventRecord;

use crate::error::EngineError;
use crate::replicate::{GitReplicator, Replicator};

/// Application entry point for the Boardroom engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails; the running
/// scheduler and server absorb their own failures.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("boardroom-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        company = %config.company.name,
        cycle_interval_secs = config.scheduler.cycle_interval_secs,
        port = config.http.port,
        news_percent = config.news.percent,
        "Configuration loaded"
    );

    // 3. Create the data directory and the store.
    if let Some(parent) = config.storage.state_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::DataDir {
            message: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    let store = Arc::new(StateStore::new(
        StorePaths {
            state: config.storage.state_path.clone(),
            history: config.storage.history_path.clone(),
        },
        config.initial_state(),
    ));

    // 4. Create both documents on first run.
    store
        .initialize_if_missing(founding_entry(&config.company.name))
        .await
        .map_err(EngineError::from)?;
    info!(
        state = %config.storage.state_path.display(),
        history = %config.storage.history_path.display(),
        "Documents ready"
    );

    // 5. Assemble the pipeline, reset coordination, and replication.
    let pipeline = Arc::new(GenerationPipeline::from_config(&config).map_err(EngineError::from)?);
    let reset = Arc::new(ResetCoordinator::new());
    let sink = Arc::new(if config.replication.enabled {
        let repo_dir = config
            .replication
            .repo_dir
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        info!(repo = %repo_dir.display(), "Git replication enabled");
        Replicator::Git(GitReplicator::new(repo_dir))
    } else {
        Replicator::Disabled
    });

    let interventions = Arc::new(InterventionHandler::new(
        Arc::clone(&store),
        Arc::clone(&pipeline),
        Arc::clone(&reset),
        Arc::clone(&sink),
        config.limits(),
    ));

    // 6. Start the trigger HTTP server.
    let app_state = Arc::new(AppState::new(
        Arc::clone(&store),
        interventions,
        Arc::clone(&reset),
        config.company.name.clone(),
    ));
    let server_config = ServerConfig {
        host: config.http.host.clone(),
        port: config.http.port,
    };
    tokio::spawn(async move {
        if let Err(e) = start_server(&server_config, app_state).await {
            error!(error = %e, "Trigger server failed");
        }
    });

    // 7. Run the scheduler until Ctrl-C.
    let scheduler = SimulationScheduler::new(
        store,
        pipeline,
        Arc::clone(&reset),
        sink,
        SchedulerSettings {
            cycle_interval: config.scheduler.cycle_interval(),
            limits: config.limits(),
        },
    );
    let scheduler_handle = tokio::spawn(async move { scheduler.run().await });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for the shutdown signal");
    }
    info!("Shutdown signal received, stopping after the current cycle");
    reset.request_stop();
    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "scheduler task failed");
    }

    info!("boardroom-engine stopped");
    Ok(())
}

/// Load `boardroom-config.yaml` from the working directory, falling back
/// to built-in defaults when the file is absent.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let path = Path::new("boardroom-config.yaml");
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        warn!("boardroom-config.yaml not found, using defaults");
        Ok(SimulationConfig::parse("{}")?)
    }
}

/// The history entry written when the documents are first created.
fn founding_entry(company: &str) -> EventRecord {
    EventRecord {
        timestamp: Utc::now().format("%H:%M").to_string(),
        title: format!("{company} is founded"),
        description: String::from(
            "Articles of incorporation are signed. Nobody reads them.",
        ),
        proposer: String::from("Administrator"),
        source_url: None,
        changes: std::collections::BTreeMap::new(),
    }
}
