use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::Context;
use crate::config::Config;
use crate::engine::applier::format_ids;
use crate::ui;

/// Show the validated config and the classification map
pub fn run(ctx: &Context, config: &Config, path: &Path) -> Result<()> {
    if ctx.quiet {
        return Ok(());
    }

    ui::header("Configuration");
    ui::kv("file", &path.display().to_string());
    ui::kv("inventory", &config.inventory.url);
    ui::kv("token", &ui::redact(&config.inventory.token));
    ui::kv("class field", &config.inventory.class_field);
    ui::kv("monitoring", &config.monitoring.url);
    ui::kv("user", &config.monitoring.user);
    ui::kv("managed group", &config.sync.managed_group.to_string());
    ui::kv("community", &ui::redact(&config.sync.community));
    ui::kv("webhook", &config.webhook.bind);

    let classes = config.classification();
    ui::header(&format!("Classes ({})", classes.len()));
    for tag in classes.tags() {
        let Some(rule) = classes.rule(tag) else {
            continue;
        };
        println!(
            "  {:<20} groups {} templates {}",
            tag.bold(),
            format_ids(&classes.target_groups(rule)),
            format_ids(&rule.templates)
        );
    }

    if config.sync.adopt_unmanaged {
        println!();
        ui::warn("adopt_unmanaged is on: hosts outside the managed group can be renamed");
    }
    println!();
    ui::success("Config is valid");
    Ok(())
}
