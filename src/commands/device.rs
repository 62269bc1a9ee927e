use anyhow::Result;

use crate::Context;
use crate::cli::DeviceArgs;
use crate::config::Config;
use crate::engine::Reconciler;

use super::{confirmation, inventory, login, logout, print_report, sync_options};

/// Single-device pass, the same one a webhook triggers
pub fn run(ctx: &Context, config: &Config, args: &DeviceArgs) -> Result<()> {
    let classes = config.classification();
    let netbox = inventory(config);
    let session = login(config)?;
    let mut confirm = confirmation(args.mode, config);

    let result = Reconciler::new(&netbox, &session, &classes, sync_options(config))
        .run_device(args.id, confirm.as_mut());
    logout(session);

    let report = result?;
    print_report(ctx, &report, args.json)
}
