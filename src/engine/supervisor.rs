//! Engine process supervision
//!
//! One engine process serves one model. Switching models stops the running
//! engine, starts a new one on the same address and waits for its health
//! endpoint before the switch counts as done.

use super::endpoint::EngineEndpoint;
use super::health::HealthProbe;
use crate::config::EngineSettings;
use crate::error::{GatewayError, Result};
use crate::storage::ModelStore;
use serde::Serialize;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of the supervised engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    /// Process spawned, health probe polling
    Starting { model: String },
    Ready { model: String },
    /// Last switch failed; nothing restarts automatically
    Failed { model: String, reason: String },
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, EngineState::Ready { .. })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Starting { model } => write!(f, "starting ({})", model),
            EngineState::Ready { model } => write!(f, "ready ({})", model),
            EngineState::Failed { model, reason } => write!(f, "failed ({}): {}", model, reason),
        }
    }
}

/// The model the engine was last switched to successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
    pub name: String,
    pub filename: String,
}

#[derive(Debug)]
struct Slot {
    child: Option<Child>,
    active: Option<ActiveModel>,
    state: EngineState,
}

/// Starts, health-checks and replaces the engine process
pub struct EngineSupervisor {
    engine_bin: PathBuf,
    endpoint: EngineEndpoint,
    settings: EngineSettings,
    store: ModelStore,
    probe: HealthProbe,
    /// Serializes whole switches; held for the full readiness wait
    switch_lock: Mutex<()>,
    /// Short-lived lock over the shared state
    slot: Mutex<Slot>,
}

impl EngineSupervisor {
    pub fn new(
        engine_bin: impl Into<PathBuf>,
        endpoint: EngineEndpoint,
        settings: EngineSettings,
        store: ModelStore,
    ) -> Result<Self> {
        let probe = HealthProbe::new(&endpoint)?;
        Ok(Self {
            engine_bin: engine_bin.into(),
            endpoint,
            settings,
            store,
            probe,
            switch_lock: Mutex::new(()),
            slot: Mutex::new(Slot {
                child: None,
                active: None,
                state: EngineState::Stopped,
            }),
        })
    }

    pub fn endpoint(&self) -> &EngineEndpoint {
        &self.endpoint
    }

    pub fn probe(&self) -> &HealthProbe {
        &self.probe
    }

    /// Name of the model last switched to successfully
    pub fn active_model(&self) -> Option<String> {
        self.lock_slot().active.as_ref().map(|a| a.name.clone())
    }

    /// File name of the model the engine is serving right now.
    ///
    /// `None` unless the state is `Ready`; a failed switch leaves the
    /// previous model recorded as active but no longer loaded.
    pub fn serving_filename(&self) -> Option<String> {
        let slot = self.lock_slot();
        if !slot.state.is_ready() {
            return None;
        }
        slot.active.as_ref().map(|a| a.filename.clone())
    }

    pub fn state(&self) -> EngineState {
        self.lock_slot().state.clone()
    }

    /// Restarts the engine on `name` and waits for it to become healthy.
    ///
    /// Fails with `NotFound` before touching the running engine if the model
    /// file is absent. On timeout or early exit the new process is killed,
    /// the state becomes `Failed` and the active model keeps its previous
    /// value.
    pub fn switch_model(&self, name: &str) -> Result<()> {
        let _switching = self
            .switch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let model_path = self.store.resolve_installed(name)?;
        let active = ActiveModel {
            name: self
                .store
                .catalog()
                .find_by_name(name)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| name.to_string()),
            filename: self.store.filename_for(name),
        };

        self.stop_current();
        thread::sleep(self.settings.port_release_delay());

        self.set_state(EngineState::Starting {
            model: active.name.clone(),
        });

        let mut child = match self.spawn(&model_path) {
            Ok(child) => child,
            Err(e) => {
                self.fail(&active.name, &e);
                return Err(e);
            }
        };

        if let Err(e) = self.wait_until_ready(&mut child) {
            kill_child(&mut child);
            self.fail(&active.name, &e);
            return Err(e);
        }

        info!(model = %active.name, endpoint = %self.endpoint, "Engine ready");
        let mut slot = self.lock_slot();
        slot.child = Some(child);
        slot.state = EngineState::Ready {
            model: active.name.clone(),
        };
        slot.active = Some(active);
        Ok(())
    }

    /// Stops the engine this supervisor started, if any
    pub fn stop(&self) {
        let _switching = self
            .switch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let child = {
            let mut slot = self.lock_slot();
            slot.active = None;
            slot.state = EngineState::Stopped;
            slot.child.take()
        };
        if let Some(mut child) = child {
            info!(pid = child.id(), "Stopping engine");
            kill_child(&mut child);
        }
    }

    fn stop_current(&self) {
        let child = self.lock_slot().child.take();
        match child {
            Some(mut child) => {
                debug!(pid = child.id(), "Stopping previous engine");
                kill_child(&mut child);
            }
            None if self.settings.kill_orphans => self.kill_orphans(),
            None => {}
        }
    }

    /// Best effort: matches any process with the engine's binary name
    fn kill_orphans(&self) {
        let Some(pattern) = self.engine_bin.file_name().and_then(|n| n.to_str()) else {
            return;
        };

        #[cfg(unix)]
        {
            match Command::new("pkill")
                .arg("-f")
                .arg(pattern)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                Ok(status) => debug!(pattern, code = ?status.code(), "Orphan engine sweep"),
                Err(e) => debug!(pattern, error = %e, "pkill unavailable"),
            }
        }

        #[cfg(not(unix))]
        debug!(pattern, "Orphan engine sweep not supported on this platform");
    }

    fn spawn(&self, model_path: &Path) -> Result<Child> {
        let bind_host = self
            .settings
            .bind_host
            .as_deref()
            .unwrap_or_else(|| self.endpoint.host());

        let mut command = Command::new(&self.engine_bin);
        command
            .arg("-m")
            .arg(model_path)
            .arg("--host")
            .arg(bind_host)
            .arg("--port")
            .arg(self.endpoint.port().to_string())
            .arg("-t")
            .arg(self.settings.threads.to_string())
            .arg("-c")
            .arg(self.settings.context_size.to_string())
            .args(&self.settings.extra_args)
            .stdin(Stdio::null());

        match &self.settings.log_file {
            Some(path) => {
                let log = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| GatewayError::io_at("open engine log", path, e))?;
                let log_err = log
                    .try_clone()
                    .map_err(|e| GatewayError::io_at("open engine log", path, e))?;
                command.stdout(log).stderr(log_err);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        info!(
            engine = %self.engine_bin.display(),
            model = %model_path.display(),
            host = bind_host,
            port = self.endpoint.port(),
            "Starting engine"
        );
        command
            .spawn()
            .map_err(|e| GatewayError::io_at("start engine", &self.engine_bin, e))
    }

    fn wait_until_ready(&self, child: &mut Child) -> Result<()> {
        let timeout = self.settings.startup_timeout();
        let started = Instant::now();

        loop {
            thread::sleep(self.settings.poll_interval());

            match child.try_wait() {
                Ok(Some(status)) => {
                    warn!(%status, "Engine exited during startup");
                    return Err(GatewayError::EngineExited {
                        status: status.to_string(),
                    });
                }
                Ok(None) => {}
                Err(e) => return Err(GatewayError::io("Failed to poll engine process", e)),
            }

            if self.probe.is_healthy() {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Health probe passed");
                return Ok(());
            }

            if started.elapsed() >= timeout {
                warn!(timeout_secs = timeout.as_secs(), "Engine did not become ready");
                return Err(GatewayError::EngineStartTimeout {
                    seconds: timeout.as_secs(),
                });
            }
        }
    }

    fn fail(&self, model: &str, err: &GatewayError) {
        self.set_state(EngineState::Failed {
            model: model.to_string(),
            reason: err.to_string(),
        });
    }

    fn set_state(&self, state: EngineState) {
        self.lock_slot().state = state;
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "Engine already gone");
    }
    // reap so the pid is not left as a zombie
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn quick_settings() -> EngineSettings {
        EngineSettings {
            startup_timeout_secs: 1,
            poll_interval_ms: 50,
            port_release_ms: 0,
            kill_orphans: false,
            ..Default::default()
        }
    }

    fn supervisor(dir: &Path, bin: &Path) -> EngineSupervisor {
        let store = ModelStore::new(dir, Arc::new(ModelCatalog::builtin()));
        EngineSupervisor::new(
            bin,
            EngineEndpoint::parse("127.0.0.1:1"),
            quick_settings(),
            store,
        )
        .unwrap()
    }

    #[test]
    fn test_initial_state() {
        let temp = TempDir::new().unwrap();
        let sup = supervisor(temp.path(), Path::new("llama-server"));
        assert_eq!(sup.state(), EngineState::Stopped);
        assert!(sup.active_model().is_none());
        assert!(sup.serving_filename().is_none());
    }

    #[test]
    fn test_switch_missing_model_is_not_found() {
        let temp = TempDir::new().unwrap();
        let sup = supervisor(temp.path(), Path::new("llama-server"));

        let err = sup.switch_model("qwen2.5-7b").unwrap_err();
        assert!(err.is_not_found());
        // nothing was attempted
        assert_eq!(sup.state(), EngineState::Stopped);
    }

    #[test]
    fn test_switch_with_missing_binary_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("tiny.gguf"), b"weights").unwrap();
        let sup = supervisor(temp.path(), &temp.path().join("no-such-engine"));

        let err = sup.switch_model("tiny").unwrap_err();
        assert_eq!(err.category(), "io");
        assert!(matches!(sup.state(), EngineState::Failed { ref model, .. } if model == "tiny"));
        assert!(sup.active_model().is_none());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(EngineState::Stopped.to_string(), "stopped");
        assert_eq!(
            EngineState::Ready {
                model: "m".to_string()
            }
            .to_string(),
            "ready (m)"
        );
        assert!(EngineState::Ready {
            model: "m".to_string()
        }
        .is_ready());
    }
}
