use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Child;
use tokio::sync::Mutex;

use super::idb::IdbClient;
use crate::driver::traits::{LogQuery, SessionOptions, SimulatorBackend, SimulatorInfo};
use crate::utils::config::Config;

const DEFAULT_LOG_LINES: usize = 100;

struct Recording {
    child: Child,
    path: String,
}

/// Simulator backend driving `idb`. Session handles are simulator UDIDs.
pub struct IdbBackend {
    idb: IdbClient,
    artifacts_dir: PathBuf,
    /// One video recording per session
    recordings: Arc<Mutex<HashMap<String, Recording>>>,
}

impl IdbBackend {
    pub fn new(idb: IdbClient, artifacts_dir: PathBuf) -> Self {
        Self {
            idb,
            artifacts_dir,
            recordings: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let idb = IdbClient::locate(config.idb_path.as_deref())?;
        debug!("Using idb at {}", idb.path().display());
        Ok(Self::new(idb, config.artifacts_dir.clone()))
    }

    /// `<artifacts_dir>/<prefix>_<timestamp>.<ext>`, creating the directory
    fn artifact_path(&self, prefix: &str, extension: &str) -> Result<String> {
        std::fs::create_dir_all(&self.artifacts_dir).with_context(|| {
            format!("Failed to create artifacts dir {}", self.artifacts_dir.display())
        })?;
        let file = format!("{}_{}.{}", prefix, Local::now().format("%Y%m%d_%H%M%S%3f"), extension);
        Ok(self.artifacts_dir.join(file).to_string_lossy().to_string())
    }

    async fn simulators(&self) -> Result<Vec<SimulatorInfo>> {
        Ok(self
            .idb
            .list_targets()
            .await?
            .into_iter()
            .filter(|target| target.is_simulator())
            .map(SimulatorInfo::from)
            .collect())
    }
}

/// SIGINT the child through `kill_program`, falling back to SIGKILL when the
/// signal cannot be sent. idb finalizes a recording only on SIGINT.
async fn interrupt(child: &mut Child, kill_program: &str) -> Result<()> {
    if let Some(pid) = child.id() {
        match tokio::process::Command::new(kill_program)
            .args(["-2", &pid.to_string()])
            .output()
            .await
        {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => warn!(
                "kill -2 {} failed ({}): {}",
                pid,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Could not run {} for pid {}: {}", kill_program, pid, e),
        }
    }
    child.kill().await.context("Failed to kill idb record-video")
}

/// First simulator matching the options, booted ones preferred
fn select_simulator<'a>(simulators: &'a [SimulatorInfo], options: &SessionOptions) -> Option<&'a SimulatorInfo> {
    let name = options.device_name.as_ref().map(|n| n.to_lowercase());
    let matches = |sim: &&SimulatorInfo| {
        let name_ok = name
            .as_ref()
            .map_or(true, |n| sim.name.to_lowercase().contains(n.as_str()));
        let version_ok = options.platform_version.as_ref().map_or(true, |v| {
            sim.os_version
                .as_ref()
                .map_or(false, |os| os.contains(v.as_str()))
        });
        name_ok && version_ok
    };

    simulators
        .iter()
        .filter(matches)
        .find(|sim| sim.is_booted())
        .or_else(|| simulators.iter().find(matches))
}

#[async_trait]
impl SimulatorBackend for IdbBackend {
    fn name(&self) -> &str {
        "idb"
    }

    async fn create_session(&self, options: &SessionOptions) -> Result<String> {
        let simulators = self.simulators().await?;
        let simulator = select_simulator(&simulators, options).with_context(|| {
            format!(
                "No simulator matches device '{}' version '{}'",
                options.device_name.as_deref().unwrap_or("*"),
                options.platform_version.as_deref().unwrap_or("*")
            )
        })?;

        if options.autoboot && !simulator.is_booted() {
            info!("Booting {} ({})", simulator.name, simulator.udid);
            self.idb.boot(&simulator.udid).await?;
        }
        if let Err(e) = self.idb.connect(&simulator.udid).await {
            warn!("idb connect {} failed: {:#}", simulator.udid, e);
        }

        Ok(simulator.udid.clone())
    }

    async fn terminate_session(&self, session_id: &str) -> Result<()> {
        if self.recordings.lock().await.contains_key(session_id) {
            self.stop_recording(session_id).await?;
        }
        if let Err(e) = self.idb.disconnect(session_id).await {
            debug!("idb disconnect {} failed: {:#}", session_id, e);
        }
        self.idb.shutdown(session_id).await
    }

    async fn list_simulators(&self) -> Result<Vec<SimulatorInfo>> {
        self.simulators().await
    }

    async fn boot_simulator(&self, udid: &str) -> Result<()> {
        self.idb.boot(udid).await
    }

    async fn shutdown_simulator(&self, udid: &str) -> Result<()> {
        self.idb.shutdown(udid).await
    }

    async fn install_app(&self, session_id: &str, app_path: &str) -> Result<()> {
        self.idb.install(session_id, app_path).await
    }

    async fn launch_app(&self, session_id: &str, bundle_id: &str) -> Result<()> {
        self.idb.launch(session_id, bundle_id).await
    }

    async fn terminate_app(&self, session_id: &str, bundle_id: &str) -> Result<()> {
        self.idb.terminate(session_id, bundle_id).await
    }

    async fn uninstall_app(&self, session_id: &str, bundle_id: &str) -> Result<()> {
        self.idb.uninstall(session_id, bundle_id).await
    }

    async fn list_apps(&self, session_id: &str) -> Result<Value> {
        self.idb.list_apps(session_id).await
    }

    async fn tap(&self, session_id: &str, x: f64, y: f64, duration_secs: Option<f64>) -> Result<()> {
        self.idb.tap(session_id, x, y, duration_secs).await
    }

    async fn swipe(
        &self,
        session_id: &str,
        start: (f64, f64),
        end: (f64, f64),
        duration_secs: Option<f64>,
        delta: Option<u32>,
    ) -> Result<()> {
        self.idb.swipe(session_id, start, end, duration_secs, delta).await
    }

    async fn press_button(&self, session_id: &str, button: &str, duration_secs: Option<f64>) -> Result<()> {
        self.idb.press_button(session_id, button, duration_secs).await
    }

    async fn input_text(&self, session_id: &str, text: &str) -> Result<()> {
        self.idb.input_text(session_id, text).await
    }

    async fn press_key(&self, session_id: &str, key_code: u32, duration_secs: Option<f64>) -> Result<()> {
        self.idb.press_key(session_id, key_code, duration_secs).await
    }

    async fn press_key_sequence(&self, session_id: &str, key_codes: &[u32]) -> Result<()> {
        self.idb.press_key_sequence(session_id, key_codes).await
    }

    async fn describe_all(&self, session_id: &str) -> Result<Value> {
        self.idb.describe_all(session_id).await
    }

    async fn describe_point(&self, session_id: &str, x: f64, y: f64) -> Result<Value> {
        self.idb.describe_point(session_id, x, y).await
    }

    async fn take_screenshot(&self, session_id: &str, output_path: Option<&str>) -> Result<String> {
        let path = match output_path {
            Some(path) => path.to_string(),
            None => self.artifact_path("screenshot", "png")?,
        };
        self.idb.screenshot(session_id, &path).await?;
        Ok(path)
    }

    async fn start_recording(&self, session_id: &str, output_path: Option<&str>) -> Result<String> {
        let mut recordings = self.recordings.lock().await;
        if let Some(active) = recordings.get(session_id) {
            anyhow::bail!("Session {} is already recording to {}", session_id, active.path);
        }

        let path = match output_path {
            Some(path) => path.to_string(),
            None => self.artifact_path("recording", "mp4")?,
        };
        let child = self.idb.start_recording(session_id, &path)?;
        info!("Recording {} to {}", session_id, path);
        recordings.insert(
            session_id.to_string(),
            Recording {
                child,
                path: path.clone(),
            },
        );
        Ok(path)
    }

    async fn stop_recording(&self, session_id: &str) -> Result<Option<String>> {
        let Some(mut recording) = self.recordings.lock().await.remove(session_id) else {
            return Ok(None);
        };

        interrupt(&mut recording.child, "kill").await?;
        recording
            .child
            .wait()
            .await
            .context("Failed to wait for idb record-video")?;

        Ok(Some(recording.path))
    }

    async fn get_logs(&self, session_id: &str, query: &LogQuery) -> Result<String> {
        let limit = query.limit.map_or(DEFAULT_LOG_LINES, |l| l as usize);
        self.idb
            .logs(session_id, limit, query.bundle_id.as_deref())
            .await
    }

    async fn start_debug(&self, session_id: &str, bundle_id: &str, port: Option<u16>) -> Result<Value> {
        if let Some(port) = port {
            debug!("idb debugserver picks its own port; requested {} ignored", port);
        }
        let output = self.idb.debugserver_start(session_id, bundle_id).await?;
        Ok(json!({
            "bundleId": bundle_id,
            "output": output.trim(),
        }))
    }

    async fn stop_debug(&self, session_id: &str) -> Result<()> {
        self.idb.debugserver_stop(session_id).await
    }

    async fn debug_status(&self, session_id: &str) -> Result<Value> {
        let output = self.idb.debugserver_status(session_id).await?;
        Ok(json!({ "status": output.trim() }))
    }

    async fn list_crash_logs(&self, session_id: &str, bundle_id: Option<&str>) -> Result<Value> {
        self.idb.crash_list(session_id, bundle_id).await
    }

    async fn get_crash_log(&self, session_id: &str, name: &str) -> Result<String> {
        self.idb.crash_show(session_id, name).await
    }

    async fn delete_crash_logs(&self, session_id: &str, name: Option<&str>) -> Result<()> {
        self.idb.crash_delete(session_id, name).await
    }

    async fn install_dylib(&self, session_id: &str, dylib_path: &str) -> Result<()> {
        self.idb.install_dylib(session_id, dylib_path).await
    }

    async fn open_url(&self, session_id: &str, url: &str) -> Result<()> {
        self.idb.open_url(session_id, url).await
    }

    async fn clear_keychain(&self, session_id: &str) -> Result<()> {
        self.idb.clear_keychain(session_id).await
    }

    async fn set_location(&self, session_id: &str, latitude: f64, longitude: f64) -> Result<()> {
        self.idb.set_location(session_id, latitude, longitude).await
    }

    async fn add_media(&self, session_id: &str, paths: &[String]) -> Result<()> {
        self.idb.add_media(session_id, paths).await
    }

    async fn approve_permissions(&self, session_id: &str, bundle_id: &str, permissions: &[String]) -> Result<()> {
        self.idb.approve(session_id, bundle_id, permissions).await
    }

    async fn update_contacts(&self, session_id: &str, db_path: &str) -> Result<()> {
        self.idb.update_contacts(session_id, db_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sim(udid: &str, name: &str, state: &str, os: &str) -> SimulatorInfo {
        SimulatorInfo {
            udid: udid.into(),
            name: name.into(),
            state: state.into(),
            os_version: Some(os.into()),
        }
    }

    fn fleet() -> Vec<SimulatorInfo> {
        vec![
            sim("A", "iPhone 15", "Shutdown", "iOS 17.2"),
            sim("B", "iPhone 15", "Booted", "iOS 17.2"),
            sim("C", "iPad Air", "Shutdown", "iOS 16.4"),
        ]
    }

    #[test]
    fn test_select_prefers_booted_match() {
        let options = SessionOptions {
            device_name: Some("iphone".into()),
            ..Default::default()
        };
        assert_eq!(select_simulator(&fleet(), &options).unwrap().udid, "B");
    }

    #[test]
    fn test_select_filters_by_version() {
        let options = SessionOptions {
            platform_version: Some("16.4".into()),
            ..Default::default()
        };
        assert_eq!(select_simulator(&fleet(), &options).unwrap().udid, "C");

        let options = SessionOptions {
            device_name: Some("iPad".into()),
            platform_version: Some("17".into()),
            ..Default::default()
        };
        assert!(select_simulator(&fleet(), &options).is_none());
    }

    #[test]
    fn test_artifact_paths_land_in_artifacts_dir() {
        let dir = std::env::temp_dir().join(format!("sim-pilot-test-{}", uuid::Uuid::new_v4()));
        let backend = IdbBackend::new(IdbClient::new(PathBuf::from("idb")), dir.clone());
        let path = backend.artifact_path("screenshot", "png").unwrap();
        assert!(path.starts_with(dir.to_string_lossy().as_ref()));
        assert!(path.ends_with(".png"));
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_stop_without_recording_is_none() {
        let backend = IdbBackend::new(IdbClient::new(PathBuf::from("idb")), PathBuf::from("./output"));
        assert_eq!(backend.stop_recording("nope").await.unwrap(), None);
    }

    #[cfg(unix)]
    fn sleeper() -> Child {
        tokio::process::Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_sends_sigint() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = sleeper();
        interrupt(&mut child, "kill").await.unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.signal(), Some(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_falls_back_to_kill() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = sleeper();
        interrupt(&mut child, "/nonexistent/kill").await.unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.signal(), Some(9));
    }

    /// Writes an `idb` stand-in that sleeps before appending its arguments
    /// to `marker`.
    #[cfg(unix)]
    fn slow_idb(dir: &std::path::Path, marker: &std::path::Path, delay: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("idb");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nsleep {}\necho \"$@\" >> '{}'\n", delay, marker.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_idb_call_has_no_late_side_effects() {
        use crate::orchestrator::command::CommandFactory;
        use crate::orchestrator::{CommandKind, Orchestrator};
        use crate::parser::types::Params;

        let dir = std::env::temp_dir().join(format!("sim-pilot-idb-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let marker = dir.join("calls.log");
        let idb = slow_idb(&dir, &marker, "0.4");

        let backend = IdbBackend::new(IdbClient::new(idb), dir.clone());
        let config = Config {
            retry_delay_ms: 10,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(backend), config);
        orchestrator.set_active_session_id(Some("SIM-1".to_string()));

        let command = CommandFactory::default()
            .create(CommandKind::ClearKeychain, Params::new())
            .with_timeout_ms(100)
            .with_retries(1);
        let result = orchestrator.execute(&command).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("CLEAR_KEYCHAIN timed out after 100ms")
        );

        // Long enough for both abandoned attempts to have finished had they survived.
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!marker.exists(), "idb ran after the timeout");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_idb_call_within_timeout_runs_once() {
        let dir = std::env::temp_dir().join(format!("sim-pilot-idb-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let marker = dir.join("calls.log");
        let idb = slow_idb(&dir, &marker, "0");

        let backend = IdbBackend::new(IdbClient::new(idb), dir.clone());
        backend.clear_keychain("SIM-1").await.unwrap();

        let calls = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["clear-keychain --udid SIM-1"]);

        let _ = std::fs::remove_dir_all(dir);
    }
}
