//! IDB (iOS Development Bridge) CLI wrapper
//!
//! Thin async wrappers over `idb` subcommands. Every call spawns one idb
//! process; long-running ones (video recording, log streaming) hand back the
//! child or bound the capture themselves.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::driver::traits::SimulatorInfo;
use crate::utils::binary_resolver;

/// idb subcommand groups whose target flag goes after the second word
const NESTED_GROUPS: &[&str] = &["ui", "crash", "debugserver", "dylib", "contacts", "file"];

/// How long `log` output is collected before the stream is cut
const LOG_CAPTURE_WINDOW: Duration = Duration::from_secs(3);

/// iOS device/simulator target as printed by `idb list-targets --json`
#[derive(Debug, Clone, Deserialize)]
pub struct IosTarget {
    pub udid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub target_type: String,
    pub state: String,
    #[serde(default)]
    pub os_version: Option<String>,
}

impl IosTarget {
    pub fn is_simulator(&self) -> bool {
        self.target_type.is_empty() || self.target_type.eq_ignore_ascii_case("simulator")
    }
}

impl From<IosTarget> for SimulatorInfo {
    fn from(target: IosTarget) -> Self {
        SimulatorInfo {
            udid: target.udid,
            name: target.name,
            state: target.state,
            os_version: target.os_version,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdbClient {
    path: PathBuf,
}

impl IdbClient {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolve the idb executable (env override, configured path, then PATH)
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(binary_resolver::find_idb(configured)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run idb command and return stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("idb {}", args.join(" "));
        let output = Command::new(&self.path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute idb command. Is idb installed?")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("idb {} failed: {}", args.first().unwrap_or(&""), stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run idb command against one target
    async fn run_with_target(&self, udid: &str, args: &[&str]) -> Result<String> {
        self.run(&target_args(udid, args)).await
    }

    fn spawn_with_target(&self, udid: &str, args: &[&str], stdout: Stdio) -> Result<Child> {
        Command::new(&self.path)
            .args(target_args(udid, args))
            .stdout(stdout)
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start idb {}", args.first().unwrap_or(&"")))
    }

    /// List all known targets
    pub async fn list_targets(&self) -> Result<Vec<IosTarget>> {
        let output = self.run(&["list-targets", "--json"]).await?;
        Ok(parse_targets(&output))
    }

    pub async fn boot(&self, udid: &str) -> Result<()> {
        self.run(&["boot", udid]).await?;
        Ok(())
    }

    pub async fn shutdown(&self, udid: &str) -> Result<()> {
        self.run(&["shutdown", udid]).await?;
        Ok(())
    }

    pub async fn connect(&self, udid: &str) -> Result<()> {
        self.run(&["connect", udid]).await?;
        Ok(())
    }

    pub async fn disconnect(&self, udid: &str) -> Result<()> {
        self.run(&["disconnect", udid]).await?;
        Ok(())
    }

    pub async fn install(&self, udid: &str, app_path: &str) -> Result<()> {
        self.run_with_target(udid, &["install", app_path]).await?;
        Ok(())
    }

    pub async fn launch(&self, udid: &str, bundle_id: &str) -> Result<()> {
        self.run_with_target(udid, &["launch", bundle_id]).await?;
        Ok(())
    }

    pub async fn terminate(&self, udid: &str, bundle_id: &str) -> Result<()> {
        self.run_with_target(udid, &["terminate", bundle_id]).await?;
        Ok(())
    }

    pub async fn uninstall(&self, udid: &str, bundle_id: &str) -> Result<()> {
        self.run_with_target(udid, &["uninstall", bundle_id]).await?;
        Ok(())
    }

    pub async fn list_apps(&self, udid: &str) -> Result<Value> {
        let output = self.run_with_target(udid, &["list-apps", "--json"]).await?;
        Ok(Value::Array(parse_json_lines(&output)))
    }

    /// Tap at coordinates, holding for `duration` seconds when given
    pub async fn tap(&self, udid: &str, x: f64, y: f64, duration: Option<f64>) -> Result<()> {
        let (x, y) = (coordinate(x), coordinate(y));
        let mut args = vec!["ui", "tap", x.as_str(), y.as_str()];
        let duration = duration.map(seconds);
        if let Some(duration) = &duration {
            args.extend(["--duration", duration.as_str()]);
        }
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    pub async fn swipe(
        &self,
        udid: &str,
        start: (f64, f64),
        end: (f64, f64),
        duration: Option<f64>,
        delta: Option<u32>,
    ) -> Result<()> {
        let points = [
            coordinate(start.0),
            coordinate(start.1),
            coordinate(end.0),
            coordinate(end.1),
        ];
        let mut args = vec!["ui", "swipe"];
        args.extend(points.iter().map(String::as_str));

        let duration = duration.map(seconds);
        if let Some(duration) = &duration {
            args.extend(["--duration", duration.as_str()]);
        }
        let delta = delta.map(|d| d.to_string());
        if let Some(delta) = &delta {
            args.extend(["--delta", delta.as_str()]);
        }

        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    /// Press a hardware button (HOME, LOCK, SIDE_BUTTON, SIRI, APPLE_PAY)
    pub async fn press_button(&self, udid: &str, button: &str, duration: Option<f64>) -> Result<()> {
        let mut args = vec!["ui", "button", button];
        let duration = duration.map(seconds);
        if let Some(duration) = &duration {
            args.extend(["--duration", duration.as_str()]);
        }
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    pub async fn input_text(&self, udid: &str, text: &str) -> Result<()> {
        self.run_with_target(udid, &["ui", "text", text]).await?;
        Ok(())
    }

    /// Press a HID keycode
    pub async fn press_key(&self, udid: &str, key_code: u32, duration: Option<f64>) -> Result<()> {
        let key = key_code.to_string();
        let mut args = vec!["ui", "key", key.as_str()];
        let duration = duration.map(seconds);
        if let Some(duration) = &duration {
            args.extend(["--duration", duration.as_str()]);
        }
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    pub async fn press_key_sequence(&self, udid: &str, key_codes: &[u32]) -> Result<()> {
        let keys: Vec<String> = key_codes.iter().map(u32::to_string).collect();
        let mut args = vec!["ui", "key-sequence"];
        args.extend(keys.iter().map(String::as_str));
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    /// Get UI hierarchy (accessibility tree)
    pub async fn describe_all(&self, udid: &str) -> Result<Value> {
        let output = self.run_with_target(udid, &["ui", "describe-all", "--json"]).await?;
        parse_json_output(&output)
    }

    pub async fn describe_point(&self, udid: &str, x: f64, y: f64) -> Result<Value> {
        let (x, y) = (coordinate(x), coordinate(y));
        let output = self
            .run_with_target(udid, &["ui", "describe-point", "--json", x.as_str(), y.as_str()])
            .await?;
        parse_json_output(&output)
    }

    pub async fn screenshot(&self, udid: &str, output_path: &str) -> Result<()> {
        self.run_with_target(udid, &["screenshot", output_path]).await?;
        Ok(())
    }

    /// Start video recording; the caller owns the child and stops it
    pub fn start_recording(&self, udid: &str, output_path: &str) -> Result<Child> {
        self.spawn_with_target(udid, &["record-video", output_path], Stdio::null())
    }

    /// Collect log lines, at most `limit` of them or whatever arrives in the
    /// capture window. `bundle_id` narrows the stream to one subsystem.
    pub async fn logs(&self, udid: &str, limit: usize, bundle_id: Option<&str>) -> Result<String> {
        let predicate = bundle_id.map(|b| format!("subsystem == \"{}\"", b));
        let mut args = vec!["log", "--", "--style", "compact"];
        if let Some(predicate) = &predicate {
            args.extend(["--predicate", predicate.as_str()]);
        }

        let mut child = self.spawn_with_target(udid, &args, Stdio::piped())?;
        let stdout = child
            .stdout
            .take()
            .context("idb log produced no output stream")?;

        let mut reader = BufReader::new(stdout).lines();
        let mut lines = Vec::new();
        let _ = tokio::time::timeout(LOG_CAPTURE_WINDOW, async {
            while lines.len() < limit {
                match reader.next_line().await {
                    Ok(Some(line)) => lines.push(line),
                    _ => break,
                }
            }
        })
        .await;

        let _ = child.kill().await;
        Ok(lines.join("\n"))
    }

    pub async fn debugserver_start(&self, udid: &str, bundle_id: &str) -> Result<String> {
        self.run_with_target(udid, &["debugserver", "start", bundle_id]).await
    }

    pub async fn debugserver_stop(&self, udid: &str) -> Result<()> {
        self.run_with_target(udid, &["debugserver", "stop"]).await?;
        Ok(())
    }

    pub async fn debugserver_status(&self, udid: &str) -> Result<String> {
        self.run_with_target(udid, &["debugserver", "status"]).await
    }

    pub async fn crash_list(&self, udid: &str, bundle_id: Option<&str>) -> Result<Value> {
        let mut args = vec!["crash", "list", "--json"];
        if let Some(bundle_id) = bundle_id {
            args.extend(["--bundle-id", bundle_id]);
        }
        let output = self.run_with_target(udid, &args).await?;
        Ok(Value::Array(parse_json_lines(&output)))
    }

    pub async fn crash_show(&self, udid: &str, name: &str) -> Result<String> {
        self.run_with_target(udid, &["crash", "show", name]).await
    }

    pub async fn crash_delete(&self, udid: &str, name: Option<&str>) -> Result<()> {
        let args = match name {
            Some(name) => vec!["crash", "delete", name],
            None => vec!["crash", "delete", "--all"],
        };
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    pub async fn install_dylib(&self, udid: &str, dylib_path: &str) -> Result<()> {
        self.run_with_target(udid, &["dylib", "install", dylib_path]).await?;
        Ok(())
    }

    /// Open URL or deep link
    pub async fn open_url(&self, udid: &str, url: &str) -> Result<()> {
        self.run_with_target(udid, &["open", url]).await?;
        Ok(())
    }

    pub async fn clear_keychain(&self, udid: &str) -> Result<()> {
        self.run_with_target(udid, &["clear-keychain"]).await?;
        Ok(())
    }

    pub async fn set_location(&self, udid: &str, latitude: f64, longitude: f64) -> Result<()> {
        let (latitude, longitude) = (latitude.to_string(), longitude.to_string());
        self.run_with_target(udid, &["set-location", latitude.as_str(), longitude.as_str()])
            .await?;
        Ok(())
    }

    pub async fn add_media(&self, udid: &str, paths: &[String]) -> Result<()> {
        let mut args = vec!["add-media"];
        args.extend(paths.iter().map(String::as_str));
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    pub async fn approve(&self, udid: &str, bundle_id: &str, permissions: &[String]) -> Result<()> {
        let mut args = vec!["approve", bundle_id];
        args.extend(permissions.iter().map(String::as_str));
        self.run_with_target(udid, &args).await?;
        Ok(())
    }

    pub async fn update_contacts(&self, udid: &str, db_path: &str) -> Result<()> {
        self.run_with_target(udid, &["contacts", "update", db_path]).await?;
        Ok(())
    }
}

/// Place `--udid` where idb expects it: after the subcommand, or after the
/// second word for grouped subcommands like `ui tap`.
fn target_args<'a>(udid: &'a str, args: &[&'a str]) -> Vec<&'a str> {
    let split = match args {
        [group, _, ..] if NESTED_GROUPS.contains(group) => 2,
        [] => 0,
        _ => 1,
    };
    let mut full_args = Vec::with_capacity(args.len() + 2);
    full_args.extend_from_slice(&args[..split]);
    full_args.extend(["--udid", udid]);
    full_args.extend_from_slice(&args[split..]);
    full_args
}

fn coordinate(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn seconds(value: f64) -> String {
    format!("{:.2}", value)
}

fn parse_targets(output: &str) -> Vec<IosTarget> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<IosTarget>(line).ok())
        .collect()
}

/// idb prints one JSON object per line for list commands
fn parse_json_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .collect()
}

/// A single JSON document, or JSON lines, or raw text as a last resort
fn parse_json_output(output: &str) -> Result<Value> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    let lines = parse_json_lines(trimmed);
    if lines.is_empty() {
        Ok(Value::String(trimmed.to_string()))
    } else {
        Ok(Value::Array(lines))
    }
}
