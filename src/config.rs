use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Greeting line sent when a shell session starts.
    #[serde(default = "default_banner")]
    pub banner: String,
    /// Maximum concurrent sessions. 0 means unbounded (the historical
    /// behavior) — a warning is logged at startup in that case.
    #[serde(default)]
    pub max_sessions: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Backing directory all synthetic filesystem operations are
    /// confined to.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Synthetic home directory, relative to the root. `cd` with no
    /// argument lands here.
    #[serde(default = "default_home")]
    pub home: String,
    /// Identity shown in the shell prompt.
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_username")]
    pub username: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThrottleConfig {
    #[serde(default = "default_throttle_initial")]
    pub initial_ms: u64,
    #[serde(default = "default_throttle_increment")]
    pub increment_ms: u64,
    #[serde(default = "default_throttle_max")]
    pub max_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    /// Directory the three audit logs are written under.
    #[serde(default = "default_audit_dir")]
    pub dir: PathBuf,
    /// Size threshold at which a log is rotated.
    #[serde(default = "default_audit_max_bytes")]
    pub max_bytes: u64,
    /// Number of rotated backups to keep per log.
    #[serde(default = "default_audit_backups")]
    pub backups: usize,
}

fn default_banner() -> String {
    "Welcome to prod-web01!".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("/tmp/mireshell_root")
}

fn default_home() -> String {
    "home/admin".to_string()
}

fn default_hostname() -> String {
    "prod-web01".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_throttle_initial() -> u64 {
    500
}

fn default_throttle_increment() -> u64 {
    100
}

fn default_throttle_max() -> u64 {
    5000
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_audit_max_bytes() -> u64 {
    2000
}

fn default_audit_backups() -> usize {
    5
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            home: default_home(),
            hostname: default_hostname(),
            username: default_username(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_throttle_initial(),
            increment_ms: default_throttle_increment(),
            max_ms: default_throttle_max(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: default_audit_dir(),
            max_bytes: default_audit_max_bytes(),
            backups: default_audit_backups(),
        }
    }
}

impl SandboxConfig {
    /// Shell prompt shown to the client, e.g. `admin@prod-web01:~# `.
    pub fn prompt(&self) -> String {
        format!("{}@{}:~# ", self.username, self.hostname)
    }
}

impl ThrottleConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn increment(&self) -> Duration {
        Duration::from_millis(self.increment_ms)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${MIRESHELL_PORT}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }
}
