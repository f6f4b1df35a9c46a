//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Tunables for the engine, the launcher, and the scheduler loop.
///
/// All fields have defaults suitable for local development. In
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Callback server bind host, also handed to spawned processes as
    /// the dial-back address (default: `127.0.0.1`).
    pub callback_host: String,
    /// Callback server port (default: `9030`).
    pub callback_port: u16,
    /// Pending-job dispatch interval (default: 1000 ms).
    pub pending_poll: Duration,
    /// Cancel sweep interval (default: 1000 ms).
    pub cancel_poll: Duration,
    /// Liveness sweep interval (default: 5000 ms).
    pub liveness_poll: Duration,
    /// Deadline applied to every RPC call (default: 10000 ms).
    pub rpc_timeout: Duration,
    /// JVM binary used to launch interpreter hosts (default: `java`).
    pub java_bin: String,
    /// Extra JVM options, whitespace-separated (default: none).
    pub jvm_options: Vec<String>,
    /// Classpath the interpreter host class is loaded from
    /// (default: `./remote/*`).
    pub host_classpath: String,
    /// Installed interpreters, comma-separated
    /// `shebang=interpreter.Class@/path/to/artifacts` entries
    /// (default: empty).
    pub interpreters: String,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default       |
    /// |--------------------|---------------|
    /// | `CALLBACK_HOST`    | `127.0.0.1`   |
    /// | `CALLBACK_PORT`    | `9030`        |
    /// | `PENDING_POLL_MS`  | `1000`        |
    /// | `CANCEL_POLL_MS`   | `1000`        |
    /// | `LIVENESS_POLL_MS` | `5000`        |
    /// | `RPC_TIMEOUT_MS`   | `10000`       |
    /// | `JAVA_BIN`         | `java`        |
    /// | `JVM_OPTIONS`      | (empty)       |
    /// | `HOST_CLASSPATH`   | `./remote/*`  |
    /// | `INTERPRETERS`     | (empty)       |
    pub fn from_env() -> Self {
        let callback_host =
            std::env::var("CALLBACK_HOST").unwrap_or_else(|_| "127.0.0.1".into());

        let callback_port: u16 = std::env::var("CALLBACK_PORT")
            .unwrap_or_else(|_| "9030".into())
            .parse()
            .expect("CALLBACK_PORT must be a valid u16");

        let jvm_options: Vec<String> = std::env::var("JVM_OPTIONS")
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            callback_host,
            callback_port,
            pending_poll: millis_var("PENDING_POLL_MS", 1000),
            cancel_poll: millis_var("CANCEL_POLL_MS", 1000),
            liveness_poll: millis_var("LIVENESS_POLL_MS", 5000),
            rpc_timeout: millis_var("RPC_TIMEOUT_MS", 10_000),
            java_bin: std::env::var("JAVA_BIN").unwrap_or_else(|_| "java".into()),
            jvm_options,
            host_classpath: std::env::var("HOST_CLASSPATH")
                .unwrap_or_else(|_| "./remote/*".into()),
            interpreters: std::env::var("INTERPRETERS").unwrap_or_default(),
        }
    }
}

fn millis_var(name: &str, default: u64) -> Duration {
    let millis: u64 = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid u64"));
    Duration::from_millis(millis)
}
