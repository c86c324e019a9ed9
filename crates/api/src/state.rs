use std::sync::Arc;

use folio_core::jobs::{CoordinatorSettings, JobCoordinator, WorkerPaths};
use folio_core::scripting::PythonInterpreter;
use folio_core::terminate;

use crate::config::ServerConfig;
use crate::scripting::orchestrator::ScriptOrchestrator;

/// URL prefix under which the report worker's raw outputs are served.
pub const OUTPUTS_URL_PREFIX: &str = "/api/v1/outputs/";

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Single-flight report worker coordinator.
    pub jobs: Arc<JobCoordinator>,
    /// Synchronous outline and podcast scripts.
    pub scripts: Arc<ScriptOrchestrator>,
}

impl AppState {
    /// Wire up the coordinator and script orchestrator from `config`.
    pub fn from_config(config: ServerConfig) -> Self {
        let interpreter = PythonInterpreter::new(config.python_path.clone());

        let jobs = JobCoordinator::new(
            CoordinatorSettings {
                paths: WorkerPaths {
                    script: config.report_script.clone(),
                    output_dir: config.reports_dir(),
                    model_dir: config.model_dir.clone(),
                    staging_root: config.staging_dir.clone(),
                },
                output_url: OUTPUTS_URL_PREFIX.to_string(),
            },
            interpreter.clone(),
            terminate::platform_terminator(config.termination_grace()),
        );

        let scripts = ScriptOrchestrator::new(interpreter, &config);

        Self {
            config: Arc::new(config),
            jobs: Arc::new(jobs),
            scripts: Arc::new(scripts),
        }
    }
}
