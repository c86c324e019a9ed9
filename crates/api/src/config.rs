use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 120;

/// Extra time the outline and podcast routes get on top of the script
/// timeout, for staging and cleanup around the script run.
const SCRIPT_ROUTE_SLACK: Duration = Duration::from_secs(10);

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds for every route except the
    /// outline and podcast scripts (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for the running worker to stop (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 100 MiB).
    pub max_upload_bytes: usize,
    /// Root of everything served to clients (default: `public`).
    pub public_dir: PathBuf,
    /// Parent of per-run staging directories.
    pub staging_dir: PathBuf,
    /// Interpreter program used for every worker script.
    pub python_path: String,
    pub report_script: PathBuf,
    pub outline_script: PathBuf,
    pub podcast_script: PathBuf,
    /// Passed through to the report worker untouched.
    pub model_dir: PathBuf,
    /// Timeout for the synchronous outline and podcast scripts (default: `120`).
    /// Their routes are bounded by this instead of `request_timeout_secs`.
    pub script_timeout_secs: u64,
    /// Grace period between the polite and forced stop of a worker (default: `1500`).
    pub termination_grace_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `HOST`                  | `0.0.0.0`                     |
    /// | `PORT`                  | `3000`                        |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                          |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                          |
    /// | `MAX_UPLOAD_BYTES`      | `104857600`                   |
    /// | `PUBLIC_DIR`            | `public`                      |
    /// | `STAGING_DIR`           | `<tmp>/folio-staging`         |
    /// | `PYTHON_PATH`           | `python3` (`python` on Windows) |
    /// | `REPORT_SCRIPT`         | `scripts/report_worker.py`    |
    /// | `OUTLINE_SCRIPT`        | `scripts/outline_worker.py`   |
    /// | `PODCAST_SCRIPT`        | `scripts/podcast_worker.py`   |
    /// | `MODEL_DIR`             | `scripts/models`              |
    /// | `SCRIPT_TIMEOUT_SECS`   | `120`                         |
    /// | `TERMINATION_GRACE_MS`  | `1500`                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse().expect("REQUEST_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "104857600".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let script_timeout_secs: u64 = std::env::var("SCRIPT_TIMEOUT_SECS")
            .map(|v| v.parse().expect("SCRIPT_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_SCRIPT_TIMEOUT_SECS);

        let termination_grace_ms: u64 = std::env::var("TERMINATION_GRACE_MS")
            .unwrap_or_else(|_| "1500".into())
            .parse()
            .expect("TERMINATION_GRACE_MS must be a valid u64");

        let path_var = |name: &str, default: &str| -> PathBuf {
            std::env::var(name)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(default))
        };

        let staging_dir = std::env::var("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("folio-staging"));

        let python_path = std::env::var("PYTHON_PATH").unwrap_or_else(|_| {
            folio_core::scripting::PythonInterpreter::platform_default()
                .program()
                .to_string()
        });

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            public_dir: path_var("PUBLIC_DIR", "public"),
            staging_dir,
            python_path,
            report_script: path_var("REPORT_SCRIPT", "scripts/report_worker.py"),
            outline_script: path_var("OUTLINE_SCRIPT", "scripts/outline_worker.py"),
            podcast_script: path_var("PODCAST_SCRIPT", "scripts/podcast_worker.py"),
            model_dir: path_var("MODEL_DIR", "scripts/models"),
            script_timeout_secs,
            termination_grace_ms,
        }
    }

    /// Shared output directory of the report worker.
    pub fn reports_dir(&self) -> PathBuf {
        self.public_dir.join("reports")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.public_dir.join("audio")
    }

    pub fn outlines_dir(&self) -> PathBuf {
        self.public_dir.join("outlines")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }

    /// HTTP timeout for routes that run a script synchronously. Always
    /// outlasts the script timeout so the script's own 504 is what clients see.
    pub fn script_route_timeout(&self) -> Duration {
        self.script_timeout() + SCRIPT_ROUTE_SLACK
    }

    pub fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(request_timeout_secs: u64, script_timeout_secs: u64) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs,
            shutdown_timeout_secs: 30,
            max_upload_bytes: 1024,
            public_dir: "public".into(),
            staging_dir: "staging".into(),
            python_path: "python3".into(),
            report_script: "report.py".into(),
            outline_script: "outline.py".into(),
            podcast_script: "podcast.py".into(),
            model_dir: "models".into(),
            script_timeout_secs,
            termination_grace_ms: 1500,
        }
    }

    #[test]
    fn default_script_routes_outlast_the_script_timeout() {
        let config = config_with(DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCRIPT_TIMEOUT_SECS);
        assert!(config.script_route_timeout() > config.script_timeout());
        assert!(config.script_route_timeout() > config.request_timeout());
    }

    #[test]
    fn script_route_timeout_follows_script_timeout() {
        let config = config_with(300, 5);
        assert_eq!(config.script_route_timeout(), Duration::from_secs(15));
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn derived_directories_live_under_public_dir() {
        let config = config_with(30, 120);
        assert_eq!(config.reports_dir(), PathBuf::from("public/reports"));
        assert_eq!(config.audio_dir(), PathBuf::from("public/audio"));
        assert_eq!(config.outlines_dir(), PathBuf::from("public/outlines"));
    }
}
