//! Stub backend that records every capability call.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::traits::{LogQuery, SessionOptions, SimulatorBackend, SimulatorInfo};

pub struct RecordingBackend {
    calls: Mutex<Vec<String>>,
    /// capability -> remaining failures (None = always fail)
    failures: Mutex<HashMap<String, Option<u32>>>,
    delay: Option<Duration>,
    session: String,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            delay: None,
            session: "SIM-0001".to_string(),
        }
    }

    pub fn failing(self, capability: &str) -> Self {
        self.failures.lock().unwrap().insert(capability.to_string(), None);
        self
    }

    /// Fail the first `times` calls of `capability`, then succeed.
    pub fn failing_times(self, capability: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(capability.to_string(), Some(times));
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(delay_ms));
        self
    }

    pub fn with_session(mut self, session: &str) -> Self {
        self.session = session.to_string();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, capability: &str, detail: String) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let line = if detail.is_empty() {
            capability.to_string()
        } else {
            format!("{} {}", capability, detail)
        };
        self.calls.lock().unwrap().push(line);

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(capability) {
            Some(None) => Err(anyhow!("{} failed", capability)),
            Some(Some(0)) => Ok(()),
            Some(Some(remaining)) => {
                *remaining -= 1;
                Err(anyhow!("{} failed", capability))
            }
            None => Ok(()),
        }
    }
}

/// ` for <secs>` when a hold duration was given
fn held(duration_secs: Option<f64>) -> String {
    duration_secs.map(|d| format!(" for {}", d)).unwrap_or_default()
}

#[async_trait]
impl SimulatorBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_session(&self, options: &SessionOptions) -> Result<String> {
        self.record(
            "create_session",
            format!(
                "{:?} {:?} {}",
                options.device_name, options.platform_version, options.autoboot
            ),
        )
        .await?;
        Ok(self.session.clone())
    }

    async fn terminate_session(&self, session_id: &str) -> Result<()> {
        self.record("terminate_session", session_id.to_string()).await
    }

    async fn list_simulators(&self) -> Result<Vec<SimulatorInfo>> {
        self.record("list_simulators", String::new()).await?;
        Ok(vec![
            SimulatorInfo {
                udid: self.session.clone(),
                name: "iPhone 15".to_string(),
                state: "Booted".to_string(),
                os_version: Some("iOS 17.2".to_string()),
            },
            SimulatorInfo {
                udid: "SIM-0002".to_string(),
                name: "iPad Air".to_string(),
                state: "Shutdown".to_string(),
                os_version: Some("iOS 17.2".to_string()),
            },
        ])
    }

    async fn boot_simulator(&self, udid: &str) -> Result<()> {
        self.record("boot_simulator", udid.to_string()).await
    }

    async fn shutdown_simulator(&self, udid: &str) -> Result<()> {
        self.record("shutdown_simulator", udid.to_string()).await
    }

    async fn install_app(&self, session_id: &str, app_path: &str) -> Result<()> {
        self.record("install_app", format!("{} {}", session_id, app_path)).await
    }

    async fn launch_app(&self, session_id: &str, bundle_id: &str) -> Result<()> {
        self.record("launch_app", format!("{} {}", session_id, bundle_id)).await
    }

    async fn terminate_app(&self, session_id: &str, bundle_id: &str) -> Result<()> {
        self.record("terminate_app", format!("{} {}", session_id, bundle_id)).await
    }

    async fn uninstall_app(&self, session_id: &str, bundle_id: &str) -> Result<()> {
        self.record("uninstall_app", format!("{} {}", session_id, bundle_id)).await
    }

    async fn list_apps(&self, session_id: &str) -> Result<Value> {
        self.record("list_apps", session_id.to_string()).await?;
        Ok(json!([{ "bundle_id": "com.example.demo", "name": "Demo" }]))
    }

    async fn tap(&self, session_id: &str, x: f64, y: f64, duration_secs: Option<f64>) -> Result<()> {
        self.record("tap", format!("{} {} {}{}", session_id, x, y, held(duration_secs)))
            .await
    }

    async fn swipe(
        &self,
        session_id: &str,
        start: (f64, f64),
        end: (f64, f64),
        duration_secs: Option<f64>,
        delta: Option<u32>,
    ) -> Result<()> {
        self.record(
            "swipe",
            format!(
                "{} {} {} {} {}{}{}",
                session_id,
                start.0,
                start.1,
                end.0,
                end.1,
                held(duration_secs),
                delta.map(|d| format!(" delta {}", d)).unwrap_or_default()
            ),
        )
        .await
    }

    async fn press_button(&self, session_id: &str, button: &str, duration_secs: Option<f64>) -> Result<()> {
        self.record(
            "press_button",
            format!("{} {}{}", session_id, button, held(duration_secs)),
        )
        .await
    }

    async fn input_text(&self, session_id: &str, text: &str) -> Result<()> {
        self.record("input_text", format!("{} {}", session_id, text)).await
    }

    async fn press_key(&self, session_id: &str, key_code: u32, duration_secs: Option<f64>) -> Result<()> {
        self.record(
            "press_key",
            format!("{} {}{}", session_id, key_code, held(duration_secs)),
        )
        .await
    }

    async fn press_key_sequence(&self, session_id: &str, key_codes: &[u32]) -> Result<()> {
        self.record("press_key_sequence", format!("{} {:?}", session_id, key_codes))
            .await
    }

    async fn describe_all(&self, session_id: &str) -> Result<Value> {
        self.record("describe_all", session_id.to_string()).await?;
        Ok(json!([{ "AXLabel": "Settings", "type": "Button" }]))
    }

    async fn describe_point(&self, session_id: &str, x: f64, y: f64) -> Result<Value> {
        self.record("describe_point", format!("{} {} {}", session_id, x, y)).await?;
        Ok(json!({ "AXLabel": "Settings", "type": "Button" }))
    }

    async fn take_screenshot(&self, session_id: &str, output_path: Option<&str>) -> Result<String> {
        let path = output_path.unwrap_or("screenshot.png").to_string();
        self.record("take_screenshot", format!("{} {}", session_id, path)).await?;
        Ok(path)
    }

    async fn start_recording(&self, session_id: &str, output_path: Option<&str>) -> Result<String> {
        self.record("start_recording", format!("{} {:?}", session_id, output_path))
            .await?;
        Ok(output_path.unwrap_or("recording.mp4").to_string())
    }

    async fn stop_recording(&self, session_id: &str) -> Result<Option<String>> {
        self.record("stop_recording", session_id.to_string()).await?;
        Ok(Some("recording.mp4".to_string()))
    }

    async fn get_logs(&self, session_id: &str, query: &LogQuery) -> Result<String> {
        self.record(
            "get_logs",
            format!("{} {:?} {:?}", session_id, query.bundle_id, query.limit),
        )
        .await?;
        Ok("log line".to_string())
    }

    async fn start_debug(&self, session_id: &str, bundle_id: &str, port: Option<u16>) -> Result<Value> {
        self.record("start_debug", format!("{} {} {:?}", session_id, bundle_id, port))
            .await?;
        Ok(json!({ "bundleId": bundle_id }))
    }

    async fn stop_debug(&self, session_id: &str) -> Result<()> {
        self.record("stop_debug", session_id.to_string()).await
    }

    async fn debug_status(&self, session_id: &str) -> Result<Value> {
        self.record("debug_status", session_id.to_string()).await?;
        Ok(json!({ "status": "idle" }))
    }

    async fn list_crash_logs(&self, session_id: &str, bundle_id: Option<&str>) -> Result<Value> {
        self.record("list_crash_logs", format!("{} {:?}", session_id, bundle_id))
            .await?;
        Ok(json!([]))
    }

    async fn get_crash_log(&self, session_id: &str, name: &str) -> Result<String> {
        self.record("get_crash_log", format!("{} {}", session_id, name)).await?;
        Ok("crash".to_string())
    }

    async fn delete_crash_logs(&self, session_id: &str, name: Option<&str>) -> Result<()> {
        self.record("delete_crash_logs", format!("{} {:?}", session_id, name))
            .await
    }

    async fn install_dylib(&self, session_id: &str, dylib_path: &str) -> Result<()> {
        self.record("install_dylib", format!("{} {}", session_id, dylib_path)).await
    }

    async fn open_url(&self, session_id: &str, url: &str) -> Result<()> {
        self.record("open_url", format!("{} {}", session_id, url)).await
    }

    async fn clear_keychain(&self, session_id: &str) -> Result<()> {
        self.record("clear_keychain", session_id.to_string()).await
    }

    async fn set_location(&self, session_id: &str, latitude: f64, longitude: f64) -> Result<()> {
        self.record("set_location", format!("{} {} {}", session_id, latitude, longitude))
            .await
    }

    async fn add_media(&self, session_id: &str, paths: &[String]) -> Result<()> {
        self.record("add_media", format!("{} {:?}", session_id, paths)).await
    }

    async fn approve_permissions(&self, session_id: &str, bundle_id: &str, permissions: &[String]) -> Result<()> {
        self.record(
            "approve_permissions",
            format!("{} {} {:?}", session_id, bundle_id, permissions),
        )
        .await
    }

    async fn update_contacts(&self, session_id: &str, db_path: &str) -> Result<()> {
        self.record("update_contacts", format!("{} {}", session_id, db_path)).await
    }
}
