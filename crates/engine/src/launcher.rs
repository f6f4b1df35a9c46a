//! Interpreter host process launcher.
//!
//! [`Launcher::spawn`] starts one JVM per shebang: the interpreter
//! host class runs on the host classpath and receives the callback
//! address, shebang, and the interpreter's own classpath and class
//! name as program arguments (`-h`, `-p`, `-sb`, `-cp`, `-cn`). A
//! monitor task waits for the process and emits exactly one
//! [`ProcessExit`] on the exit channel; a failed spawn emits the same
//! event. A single consumer ([`crate::reaper`]) owns registry cleanup,
//! so exit handling never races itself.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::mpsc;

/// Entry class of the interpreter host started inside the JVM.
pub const HOST_ENTRY_CLASS: &str = "org.folio.interpreter.remote.InterpreterHost";

/// Emitted exactly once per spawn attempt, when the process exits or
/// the spawn itself fails.
#[derive(Debug, Clone)]
pub struct ProcessExit {
    pub shebang: String,
}

/// Launch inputs for one interpreter implementation.
#[derive(Debug, Clone)]
pub struct InterpreterSpec {
    /// Directory holding the interpreter's jars; also used as the
    /// working directory of the spawned process.
    pub directory: PathBuf,
    /// Fully qualified interpreter class loaded by the host.
    pub class_name: String,
}

/// Resolves a shebang to its installed interpreter artifacts.
///
/// Interpreter installation is outside the engine; this seam is how
/// the installed artifacts are found at launch time.
pub trait InterpreterResolver: Send + Sync {
    fn resolve(&self, shebang: &str) -> Option<InterpreterSpec>;
}

/// Static shebang catalog, parsed from configuration.
///
/// The textual form is a comma-separated list of
/// `shebang=interpreter.Class@/path/to/artifacts` entries.
#[derive(Debug, Default)]
pub struct InterpreterCatalog {
    entries: HashMap<String, InterpreterSpec>,
}

impl InterpreterCatalog {
    /// Parse the `INTERPRETERS` configuration value. Malformed entries
    /// are rejected, not skipped.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut entries = HashMap::new();
        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (shebang, rest) = item
                .split_once('=')
                .ok_or_else(|| format!("interpreter entry without '=': {item}"))?;
            let (class_name, directory) = rest
                .split_once('@')
                .ok_or_else(|| format!("interpreter entry without '@': {item}"))?;
            entries.insert(
                shebang.trim().to_string(),
                InterpreterSpec {
                    directory: PathBuf::from(directory.trim()),
                    class_name: class_name.trim().to_string(),
                },
            );
        }
        Ok(Self { entries })
    }
}

impl InterpreterResolver for InterpreterCatalog {
    fn resolve(&self, shebang: &str) -> Option<InterpreterSpec> {
        self.entries.get(shebang).cloned()
    }
}

/// Spawns interpreter host processes and reports their exits.
pub struct Launcher {
    java_bin: String,
    jvm_options: Vec<String>,
    /// Classpath the host entry class itself is loaded from.
    host_classpath: String,
    /// Dial-back address handed to every spawned process.
    callback_host: String,
    callback_port: u16,
    exit_tx: mpsc::UnboundedSender<ProcessExit>,
}

impl Launcher {
    /// Create a launcher and the receiving half of its exit channel.
    pub fn new(
        java_bin: impl Into<String>,
        jvm_options: Vec<String>,
        host_classpath: impl Into<String>,
        callback_host: impl Into<String>,
        callback_port: u16,
    ) -> (Self, mpsc::UnboundedReceiver<ProcessExit>) {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let launcher = Self {
            java_bin: java_bin.into(),
            jvm_options,
            host_classpath: host_classpath.into(),
            callback_host: callback_host.into(),
            callback_port,
            exit_tx,
        };
        (launcher, exit_rx)
    }

    /// Spawn the host process for `shebang`.
    ///
    /// Never returns an error: a spawn failure is reported the same
    /// way a crash is, through the exit channel, after being logged.
    pub fn spawn(&self, shebang: &str, spec: &InterpreterSpec) {
        let interpreter_classpath = spec.directory.join("*");
        let mut cmd = Command::new(&self.java_bin);
        cmd.args(&self.jvm_options)
            .arg("-cp")
            .arg(&self.host_classpath)
            .arg(HOST_ENTRY_CLASS)
            .arg("-h")
            .arg(&self.callback_host)
            .arg("-p")
            .arg(self.callback_port.to_string())
            .arg("-sb")
            .arg(shebang)
            .arg("-cp")
            .arg(&interpreter_classpath)
            .arg("-cn")
            .arg(&spec.class_name)
            .current_dir(&spec.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let exit_tx = self.exit_tx.clone();
        let shebang = shebang.to_string();
        match cmd.spawn() {
            Ok(mut child) => {
                tracing::info!(shebang = %shebang, pid = child.id(),
                    class_name = %spec.class_name, "Interpreter process spawned");
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) => {
                            tracing::info!(shebang = %shebang, code = status.code(),
                                "Interpreter process exited");
                        }
                        Err(e) => {
                            tracing::error!(shebang = %shebang, error = %e,
                                "Failed waiting on interpreter process");
                        }
                    }
                    let _ = exit_tx.send(ProcessExit { shebang });
                });
            }
            Err(e) => {
                tracing::error!(shebang = %shebang, error = %e,
                    "Failed to spawn interpreter process");
                let _ = exit_tx.send(ProcessExit { shebang });
            }
        }
    }
}
