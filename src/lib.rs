pub mod backend;
pub mod db;
pub mod detection;
pub mod hos;
pub mod models;
pub mod session;
pub mod settings;
pub mod telemetry;
pub mod time_source;
pub mod timer;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

pub use backend::HosBackend;
pub use db::Database;
pub use detection::{AutoStatusDetector, Proposal, SpeedClass};
pub use hos::{HosCalculator, HosDisplay, HosEvaluation, HosLimits, HosRemaining, RestWindowPolicy};
pub use models::{DutyCode, HosSnapshot, StatusChangeRequest, StatusOrigin, TelemetryEvent};
pub use session::{HosSession, SessionDeps, SubmitOutcome};
pub use settings::{EngineSettings, SettingsStore};
pub use telemetry::{ChannelTelemetry, TelemetrySource};
pub use time_source::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use timer::{ClockMode, ClockStatus, DutyClock};

/// Installs the process-wide logger (reads `RUST_LOG`). Safe to call more
/// than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Opens the engine's on-disk state under `data_dir` and wires a session.
///
/// Creates the directory if needed, opens `hos.sqlite3` and loads
/// `settings.json`. The session is returned unstarted.
pub fn open_session(
    data_dir: &Path,
    backend: Arc<dyn HosBackend>,
    telemetry: Arc<dyn TelemetrySource>,
) -> Result<HosSession> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let database = Database::new(data_dir.join("hos.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    log::info!("HOS engine opened at {}", data_dir.display());

    Ok(HosSession::new(
        SessionDeps {
            backend,
            telemetry,
            time: Arc::new(SystemTimeSource),
            database: Some(database),
        },
        settings.engine(),
    ))
}
