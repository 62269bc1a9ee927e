use anyhow::Result;

use crate::Context;
use crate::cli::SyncArgs;
use crate::config::Config;
use crate::engine::Reconciler;

use super::{confirmation, inventory, login, logout, print_report, sync_options};

/// Full pass: fetch, reconcile every device, sweep stale hosts
pub fn run(ctx: &Context, config: &Config, args: &SyncArgs) -> Result<()> {
    let classes = config.classification();
    let netbox = inventory(config);
    let session = login(config)?;
    let mut confirm = confirmation(args.mode, config);

    if args.mode.dry_run {
        log::info!("Dry run: no changes will be written");
    }
    let result = Reconciler::new(&netbox, &session, &classes, sync_options(config))
        .run(confirm.as_mut());
    logout(session);

    let report = result?;
    if !args.mode.dry_run && !report.has_writes() {
        log::info!("Monitoring already matches the inventory");
    }
    print_report(ctx, &report, args.json)
}
