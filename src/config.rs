//! monsync configuration (`config.toml`)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::classification::{ClassRule, ClassificationMap};

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub inventory: InventoryConfig,
    pub monitoring: MonitoringConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Classification tag -> groups and templates
    #[serde(default)]
    pub classes: BTreeMap<String, ClassRule>,
}

/// NetBox connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub url: String,
    pub token: String,
    /// Custom field holding the classification tag
    #[serde(default = "default_class_field")]
    pub class_field: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Zabbix connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// JSON-RPC endpoint (`.../api_jsonrpc.php`)
    pub url: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sentinel managed-by-sync group id
    pub managed_group: u64,
    /// SNMP v2c community for every managed interface
    pub community: String,
    /// Ask before every write
    #[serde(default)]
    pub confirm: bool,
    /// Let the IP fallback adopt hosts outside the managed group
    #[serde(default)]
    pub adopt_unmanaged: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level used when no `-v` is given (error, warn, info, debug, trace)
    #[serde(default)]
    pub level: Option<String>,
    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_class_field() -> String {
    "monitoring_class".to_string()
}

fn default_page_size() -> u32 {
    netboxkit::backend::netbox::DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bind() -> String {
    "0.0.0.0:9000".to_string()
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load and validate the config at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("inventory.url", &self.inventory.url)?;
        validate_url("monitoring.url", &self.monitoring.url)?;

        if self.inventory.token.trim().is_empty() {
            bail!("inventory.token must not be empty");
        }
        if self.inventory.class_field.trim().is_empty() {
            bail!("inventory.class_field must not be empty");
        }
        if self.inventory.page_size == 0 {
            bail!("inventory.page_size must be greater than zero");
        }
        if self.monitoring.user.trim().is_empty() {
            bail!("monitoring.user must not be empty");
        }
        if self.sync.managed_group == 0 {
            bail!("sync.managed_group must be a host group id");
        }
        if self.sync.community.is_empty() {
            bail!("sync.community must not be empty");
        }
        if self.classes.is_empty() {
            bail!("at least one [classes.<tag>] section is required");
        }
        if let Some(tag) = self.classes.keys().find(|tag| tag.trim().is_empty()) {
            bail!("invalid classification tag {tag:?}");
        }
        if let Some(level) = &self.log.level {
            level
                .parse::<log::LevelFilter>()
                .with_context(|| format!("log.level {level:?} is not a log level"))?;
        }
        self.webhook
            .bind
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("webhook.bind {:?} is not an address", self.webhook.bind))?;

        Ok(())
    }

    /// Build the classification map
    pub fn classification(&self) -> ClassificationMap {
        ClassificationMap::new(self.classes.clone(), self.sync.managed_group)
    }

    pub fn inventory_timeout(&self) -> Duration {
        Duration::from_secs(self.inventory.timeout_secs)
    }

    pub fn monitoring_timeout(&self) -> Duration {
        Duration::from_secs(self.monitoring.timeout_secs)
    }
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        bail!("{key} must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{key} must be an http(s) URL, got {url:?}");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
