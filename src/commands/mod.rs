pub mod check;
pub mod device;
pub mod serve;
pub mod sync;

use anyhow::{Context as _, Result};
use converge::{AutoConfirm, AutoDecline, ConfirmCallback};
use netboxkit::NetboxBackend;
use zabbixkit::Session;

use crate::Context;
use crate::cli::WriteMode;
use crate::config::Config;
use crate::engine::{RunReport, SyncOptions, display_report};
use crate::prompt::Prompt;

/// Inventory client for the configured NetBox
pub fn inventory(config: &Config) -> NetboxBackend {
    let netbox = NetboxBackend::new(
        &config.inventory.url,
        &config.inventory.token,
        config.inventory_timeout(),
    )
    .with_page_size(config.inventory.page_size);
    log::debug!("Reading devices from {}", netbox.base_url());
    netbox
}

/// Log in to the configured Zabbix
pub fn login(config: &Config) -> Result<Session> {
    log::debug!("Logging in to {} as {}", config.monitoring.url, config.monitoring.user);
    Session::login(
        &config.monitoring.url,
        &config.monitoring.user,
        &config.monitoring.password,
        config.monitoring_timeout(),
    )
    .with_context(|| format!("Could not log in to {}", config.monitoring.url))
}

/// End the session, warning instead of failing the command
pub fn logout(session: Session) {
    if let Err(err) = session.logout() {
        log::warn!("Logout failed: {err}");
    }
}

pub fn sync_options(config: &Config) -> SyncOptions {
    SyncOptions {
        class_field: config.inventory.class_field.clone(),
        community: config.sync.community.clone(),
        adopt_unmanaged: config.sync.adopt_unmanaged,
    }
}

/// Confirmation hook for a command-line run
pub fn confirmation(mode: WriteMode, config: &Config) -> Box<dyn ConfirmCallback> {
    if mode.dry_run {
        Box::new(AutoDecline)
    } else if mode.yes || !config.sync.confirm {
        Box::new(AutoConfirm)
    } else {
        Box::new(Prompt::default())
    }
}

/// Print a finished report as text or JSON
pub fn print_report(ctx: &Context, report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else if !ctx.quiet || !report.issues.is_empty() {
        display_report(report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[inventory]
url = "https://netbox.example.com/"
token = "0123456789abcdef"

[monitoring]
url = "https://zabbix.example.com/api_jsonrpc.php"
user = "Admin"
password = "zabbix"

[sync]
managed_group = 42
community = "public"
confirm = true

[classes.router]
groups = [5]
"#;

    #[test]
    fn test_inventory_trims_trailing_slash() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert_eq!(inventory(&config).base_url(), "https://netbox.example.com");
    }

    #[test]
    fn test_dry_run_declines() {
        let config = Config::from_toml(CONFIG).unwrap();
        let change = converge::Change::update("r1", "status", "enabled", "disabled");

        let mut confirm = confirmation(
            WriteMode {
                dry_run: true,
                yes: false,
            },
            &config,
        );
        assert!(!confirm.confirm(&change).unwrap());

        let mut confirm = confirmation(
            WriteMode {
                dry_run: false,
                yes: true,
            },
            &config,
        );
        assert!(confirm.confirm(&change).unwrap());
    }

    #[test]
    fn test_sync_options_from_config() {
        let config = Config::from_toml(CONFIG).unwrap();
        let options = sync_options(&config);
        assert_eq!(options.class_field, "monitoring_class");
        assert_eq!(options.community, "public");
        assert!(!options.adopt_unmanaged);
    }
}
