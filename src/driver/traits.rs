use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A simulator known to the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorInfo {
    pub udid: String,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub os_version: Option<String>,
}

impl SimulatorInfo {
    pub fn is_booted(&self) -> bool {
        self.state.eq_ignore_ascii_case("booted")
    }
}

/// Options for creating a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    /// Device name to look for (case-insensitive substring). First simulator if None.
    pub device_name: Option<String>,
    /// iOS runtime version the device must run
    pub platform_version: Option<String>,
    /// Boot the device if it is not already booted
    pub autoboot: bool,
}

/// Which log lines to fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    /// Maximum number of lines
    pub limit: Option<u32>,
    /// Restrict to one app
    pub bundle_id: Option<String>,
}

/// Simulator-control capabilities
///
/// Every capability is keyed by a session handle (the simulator UDID) and may
/// fail. Calls can be slow: booting and video capture take seconds.
///
/// Capabilities default to an "unsupported" error so partial backends only
/// implement what they need.
#[async_trait]
pub trait SimulatorBackend: Send + Sync {
    /// Backend name for logs (e.g. "idb")
    fn name(&self) -> &str;

    // -- Sessions and simulator lifecycle --

    /// Pick (and optionally boot) a simulator and return its session handle
    async fn create_session(&self, _options: &SessionOptions) -> Result<String> {
        unsupported("create_session")
    }

    async fn terminate_session(&self, _session_id: &str) -> Result<()> {
        unsupported("terminate_session")
    }

    async fn list_simulators(&self) -> Result<Vec<SimulatorInfo>> {
        unsupported("list_simulators")
    }

    async fn list_booted_simulators(&self) -> Result<Vec<SimulatorInfo>> {
        Ok(self
            .list_simulators()
            .await?
            .into_iter()
            .filter(SimulatorInfo::is_booted)
            .collect())
    }

    async fn boot_simulator(&self, _udid: &str) -> Result<()> {
        unsupported("boot_simulator")
    }

    async fn shutdown_simulator(&self, _udid: &str) -> Result<()> {
        unsupported("shutdown_simulator")
    }

    // -- App lifecycle --

    /// Install an app
    ///
    /// # Arguments
    /// * `app_path` - Path to a .app bundle or .ipa archive
    async fn install_app(&self, _session_id: &str, _app_path: &str) -> Result<()> {
        unsupported("install_app")
    }

    async fn launch_app(&self, _session_id: &str, _bundle_id: &str) -> Result<()> {
        unsupported("launch_app")
    }

    async fn terminate_app(&self, _session_id: &str, _bundle_id: &str) -> Result<()> {
        unsupported("terminate_app")
    }

    async fn uninstall_app(&self, _session_id: &str, _bundle_id: &str) -> Result<()> {
        unsupported("uninstall_app")
    }

    async fn list_apps(&self, _session_id: &str) -> Result<Value> {
        unsupported("list_apps")
    }

    async fn is_app_installed(&self, session_id: &str, bundle_id: &str) -> Result<bool> {
        let apps = self.list_apps(session_id).await?;
        Ok(apps
            .as_array()
            .map(|apps| {
                apps.iter().any(|app| {
                    app.get("bundle_id")
                        .or_else(|| app.get("bundleId"))
                        .and_then(Value::as_str)
                        == Some(bundle_id)
                })
            })
            .unwrap_or(false))
    }

    // -- UI interaction --

    /// Tap at a point, holding for `duration_secs` when given
    async fn tap(&self, _session_id: &str, _x: f64, _y: f64, _duration_secs: Option<f64>) -> Result<()> {
        unsupported("tap")
    }

    /// Swipe between two points
    ///
    /// # Arguments
    /// * `start` / `end` - Points in screen coordinates
    /// * `duration_secs` - Gesture duration
    /// * `delta` - Step size in points between touch events
    async fn swipe(
        &self,
        _session_id: &str,
        _start: (f64, f64),
        _end: (f64, f64),
        _duration_secs: Option<f64>,
        _delta: Option<u32>,
    ) -> Result<()> {
        unsupported("swipe")
    }

    /// Press a hardware button (HOME, LOCK, SIDE_BUTTON, SIRI, APPLE_PAY)
    async fn press_button(&self, _session_id: &str, _button: &str, _duration_secs: Option<f64>) -> Result<()> {
        unsupported("press_button")
    }

    async fn input_text(&self, _session_id: &str, _text: &str) -> Result<()> {
        unsupported("input_text")
    }

    /// Press a HID key code
    async fn press_key(&self, _session_id: &str, _key_code: u32, _duration_secs: Option<f64>) -> Result<()> {
        unsupported("press_key")
    }

    async fn press_key_sequence(&self, _session_id: &str, _key_codes: &[u32]) -> Result<()> {
        unsupported("press_key_sequence")
    }

    // -- Accessibility --

    async fn describe_all(&self, _session_id: &str) -> Result<Value> {
        unsupported("describe_all")
    }

    async fn describe_point(&self, _session_id: &str, _x: f64, _y: f64) -> Result<Value> {
        unsupported("describe_point")
    }

    // -- Capture and logs --

    /// Take a screenshot
    ///
    /// # Returns
    /// The path the PNG was written to
    async fn take_screenshot(&self, _session_id: &str, _output_path: Option<&str>) -> Result<String> {
        unsupported("take_screenshot")
    }

    /// Start recording; returns the output path
    async fn start_recording(&self, _session_id: &str, _output_path: Option<&str>) -> Result<String> {
        unsupported("start_recording")
    }

    /// Stop recording; returns the finished file path if one was running
    async fn stop_recording(&self, _session_id: &str) -> Result<Option<String>> {
        unsupported("stop_recording")
    }

    async fn get_logs(&self, _session_id: &str, _query: &LogQuery) -> Result<String> {
        unsupported("get_logs")
    }

    // -- Debugging and crash reports --

    async fn start_debug(&self, _session_id: &str, _bundle_id: &str, _port: Option<u16>) -> Result<Value> {
        unsupported("start_debug")
    }

    async fn stop_debug(&self, _session_id: &str) -> Result<()> {
        unsupported("stop_debug")
    }

    async fn debug_status(&self, _session_id: &str) -> Result<Value> {
        unsupported("debug_status")
    }

    async fn list_crash_logs(&self, _session_id: &str, _bundle_id: Option<&str>) -> Result<Value> {
        unsupported("list_crash_logs")
    }

    async fn get_crash_log(&self, _session_id: &str, _name: &str) -> Result<String> {
        unsupported("get_crash_log")
    }

    /// Delete one crash report by name, or all of them when `name` is None
    async fn delete_crash_logs(&self, _session_id: &str, _name: Option<&str>) -> Result<()> {
        unsupported("delete_crash_logs")
    }

    // -- Device state --

    async fn install_dylib(&self, _session_id: &str, _dylib_path: &str) -> Result<()> {
        unsupported("install_dylib")
    }

    async fn open_url(&self, _session_id: &str, _url: &str) -> Result<()> {
        unsupported("open_url")
    }

    async fn clear_keychain(&self, _session_id: &str) -> Result<()> {
        unsupported("clear_keychain")
    }

    async fn set_location(&self, _session_id: &str, _latitude: f64, _longitude: f64) -> Result<()> {
        unsupported("set_location")
    }

    async fn add_media(&self, _session_id: &str, _paths: &[String]) -> Result<()> {
        unsupported("add_media")
    }

    async fn approve_permissions(&self, _session_id: &str, _bundle_id: &str, _permissions: &[String]) -> Result<()> {
        unsupported("approve_permissions")
    }

    async fn update_contacts(&self, _session_id: &str, _db_path: &str) -> Result<()> {
        unsupported("update_contacts")
    }
}

fn unsupported<T>(capability: &str) -> Result<T> {
    Err(anyhow::anyhow!(
        "{} not implemented for this backend",
        capability
    ))
}
