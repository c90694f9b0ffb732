//! Policy, threshold and notification settings
//!
//! Settings live in three flat JSON documents inside a settings directory:
//! `config.json` (notification channels and alert thresholds),
//! `autoscaling_policy.json` and `namespaces.json`. A missing document means
//! defaults. A cycle reads them once and treats them as immutable; the CLI
//! `set-*` / `reset-*` commands are the only writers.

use crate::error::{MonitorError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "config.json";
pub const POLICY_FILE: &str = "autoscaling_policy.json";
pub const NAMESPACES_FILE: &str = "namespaces.json";

pub const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_EMAIL_PORT: u16 = 587;

/// Scaling strategy; advisory only, both execute the same trend rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingStrategy {
    #[default]
    Static,
    Dynamic,
}

/// Thresholds driving the recommendation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub max_replicas_change: u32,
    pub strategy: ScalingStrategy,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            cpu_threshold: 60.0,
            memory_threshold: 60.0,
            max_replicas_change: 5,
            strategy: ScalingStrategy::Static,
        }
    }
}

impl ScalingPolicy {
    /// Build a policy from the flat key/value mapping; unknown keys are ignored
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        parse_document::<PolicyDocument>(map, POLICY_FILE)?.resolve()
    }
}

/// `autoscaling_policy.json` as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_replicas_change: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling_strategy: Option<ScalingStrategy>,
}

impl PolicyDocument {
    /// Apply defaults for the missing keys
    pub fn resolve(&self) -> Result<ScalingPolicy> {
        let defaults = ScalingPolicy::default();
        let max_replicas_change = self
            .max_replicas_change
            .unwrap_or(defaults.max_replicas_change);
        if max_replicas_change == 0 {
            return Err(MonitorError::Config(
                "max_replicas_change must be positive".to_string(),
            ));
        }

        Ok(ScalingPolicy {
            cpu_threshold: self.cpu_threshold.unwrap_or(defaults.cpu_threshold),
            memory_threshold: self.memory_threshold.unwrap_or(defaults.memory_threshold),
            max_replicas_change,
            strategy: self.scaling_strategy.unwrap_or(defaults.strategy),
        })
    }
}

/// Thresholds for operator notifications (independent of scaling)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// CPU threshold, compared directly against the current average
    pub cpu_threshold: f64,
    /// Memory threshold in Mi
    pub memory_threshold: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_threshold: 80.0,
            memory_threshold: 75.0,
        }
    }
}

impl AlertThresholds {
    /// Read `alert_cpu_threshold` / `alert_memory_threshold` from the config document
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        Ok(parse_document::<ConfigDocument>(map, CONFIG_FILE)?.thresholds())
    }
}

/// Transactional email destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub sender: String,
    /// SMTP password; no login is attempted without it
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub recipient: String,
}

/// Chat webhook destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub webhook_url: String,
}

/// Notification channels, passed explicitly to the alert transports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub email: Option<EmailConfig>,
    pub chat: Option<ChatConfig>,
}

impl NotificationConfig {
    /// Email is configured only when both host and recipient are present
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        parse_document::<ConfigDocument>(map, CONFIG_FILE)?.notifications()
    }
}

/// SMTP port, accepted as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmailPort {
    Number(u16),
    Text(String),
}

impl EmailPort {
    fn resolve(&self) -> Result<u16> {
        match self {
            EmailPort::Number(port) => Ok(*port),
            EmailPort::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| MonitorError::Config(format!("invalid email_port '{}'", s))),
        }
    }
}

/// `config.json` as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_port: Option<EmailPort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_cpu_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_memory_threshold: Option<f64>,
}

impl ConfigDocument {
    pub fn thresholds(&self) -> AlertThresholds {
        let defaults = AlertThresholds::default();
        AlertThresholds {
            cpu_threshold: self.alert_cpu_threshold.unwrap_or(defaults.cpu_threshold),
            memory_threshold: self
                .alert_memory_threshold
                .unwrap_or(defaults.memory_threshold),
        }
    }

    pub fn notifications(&self) -> Result<NotificationConfig> {
        let email = match (non_empty(&self.email_host), non_empty(&self.recipient_email)) {
            (Some(host), Some(recipient)) => {
                let port = match &self.email_port {
                    Some(port) => port.resolve()?,
                    None => DEFAULT_EMAIL_PORT,
                };
                Some(EmailConfig {
                    host,
                    port,
                    sender: non_empty(&self.sender_email).unwrap_or_else(|| recipient.clone()),
                    password: non_empty(&self.sender_password),
                    recipient,
                })
            }
            _ => None,
        };

        let chat = non_empty(&self.slack_webhook_url).map(|webhook_url| ChatConfig { webhook_url });

        Ok(NotificationConfig { email, chat })
    }
}

/// Namespaces to evaluate, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSelection {
    pub namespaces: Vec<String>,
}

impl Default for NamespaceSelection {
    fn default() -> Self {
        Self {
            namespaces: vec![DEFAULT_NAMESPACE.to_string()],
        }
    }
}

impl NamespaceSelection {
    /// Empty or absent selections collapse to `["default"]`
    pub fn new(namespaces: Vec<String>) -> Self {
        let namespaces: Vec<String> = namespaces
            .into_iter()
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .collect();
        if namespaces.is_empty() {
            Self::default()
        } else {
            Self { namespaces }
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let document = parse_document::<NamespacesDocument>(map, NAMESPACES_FILE)?;
        Ok(Self::new(document.namespaces.unwrap_or_default()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }
}

/// `namespaces.json` as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespacesDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
}

/// Knobs for a single monitoring cycle
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Window for the "current" averages (default: 10 minutes)
    pub current_window: Duration,
    /// Window for the trend history (default: 60 minutes)
    pub trend_window: Duration,
    /// Apply recommendations to autoscaler objects
    pub reconcile: bool,
    /// Evaluate alert thresholds
    pub alerts: bool,
    pub min_replicas: i32,
    pub max_replicas: i32,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            current_window: Duration::from_secs(10 * 60),
            trend_window: Duration::from_secs(60 * 60),
            reconcile: true,
            alerts: true,
            min_replicas: 1,
            max_replicas: 10,
        }
    }
}

/// Everything read from the settings directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    pub policy: ScalingPolicy,
    pub thresholds: AlertThresholds,
    pub notifications: NotificationConfig,
    pub namespaces: NamespaceSelection,
}

impl Settings {
    /// Load all documents from `dir`; missing documents fall back to defaults
    pub fn load(dir: &Path) -> Result<Self> {
        let config = Self::document(dir, SettingsDocument::Config)?;
        let policy = Self::document(dir, SettingsDocument::Policy)?;
        let namespaces = Self::document(dir, SettingsDocument::Namespaces)?;

        Ok(Self {
            policy: ScalingPolicy::from_map(&policy)?,
            thresholds: AlertThresholds::from_map(&config)?,
            notifications: NotificationConfig::from_map(&config)?,
            namespaces: NamespaceSelection::from_map(&namespaces)?,
        })
    }

    /// A stored document as written, without defaults applied
    pub fn document(dir: &Path, document: SettingsDocument) -> Result<Map<String, Value>> {
        load_json_map(&document.path(dir))
    }

    /// Merge `updates` into a stored document and write it back
    ///
    /// Keys absent from `updates` keep their stored values. The merged
    /// document is validated first, so a rejected update leaves the file as
    /// it was.
    pub fn update(
        dir: &Path,
        document: SettingsDocument,
        updates: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let path = document.path(dir);
        let mut map = load_json_map(&path)?;
        map.extend(updates);
        document.validate(&map)?;
        save_json_map(&path, &map)?;

        debug!(path = %path.display(), keys = map.len(), "Settings document updated");
        Ok(map)
    }

    /// Delete a stored document so its defaults apply again
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn reset(dir: &Path, document: SettingsDocument) -> Result<bool> {
        let path = document.path(dir);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MonitorError::Config(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// The three documents kept in a settings directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsDocument {
    Config,
    Policy,
    Namespaces,
}

impl SettingsDocument {
    pub fn file_name(&self) -> &'static str {
        match self {
            SettingsDocument::Config => CONFIG_FILE,
            SettingsDocument::Policy => POLICY_FILE,
            SettingsDocument::Namespaces => NAMESPACES_FILE,
        }
    }

    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    fn validate(&self, map: &Map<String, Value>) -> Result<()> {
        match self {
            SettingsDocument::Config => {
                NotificationConfig::from_map(map)?;
            }
            SettingsDocument::Policy => {
                ScalingPolicy::from_map(map)?;
            }
            SettingsDocument::Namespaces => {
                NamespaceSelection::from_map(map)?;
            }
        }
        Ok(())
    }
}

/// Flatten a typed document into the key/value form stored on disk
pub fn document_map<T: Serialize>(document: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(document) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MonitorError::Config(format!(
            "settings document must be an object, got {}",
            other
        ))),
        Err(e) => Err(MonitorError::Config(e.to_string())),
    }
}

/// Read a flat JSON object; a missing file yields an empty map
pub fn load_json_map(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "Settings file not found, using defaults");
        return Ok(Map::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| MonitorError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MonitorError::Config(format!(
            "{} must contain a JSON object, got {}",
            path.display(),
            other
        ))),
        Err(e) => Err(MonitorError::Config(format!(
            "failed to parse {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write a flat JSON object, creating the settings directory if needed
pub fn save_json_map(path: &Path, map: &Map<String, Value>) -> Result<()> {
    let io_error =
        |e: std::io::Error| MonitorError::Config(format!("failed to write {}: {}", path.display(), e));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut content = serde_json::to_string_pretty(map)
        .map_err(|e| MonitorError::Config(format!("failed to encode {}: {}", path.display(), e)))?;
    content.push('\n');

    // Readers never see a half-written document
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, content).map_err(io_error)?;
    std::fs::rename(&staging, path).map_err(io_error)?;
    Ok(())
}

/// Default settings directory (`~/.config/k8s-monitor`)
pub fn default_settings_dir(home: Option<PathBuf>) -> PathBuf {
    home.map(|h| h.join(".config").join("k8s-monitor"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_document<T: DeserializeOwned>(map: &Map<String, Value>, file: &str) -> Result<T> {
    serde_json::from_value(Value::Object(map.clone()))
        .map_err(|e| MonitorError::Config(format!("invalid {}: {}", file, e)))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}
