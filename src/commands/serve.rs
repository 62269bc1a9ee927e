use anyhow::{Context as _, Result};
use converge::AutoConfirm;
use std::net::SocketAddr;

use crate::Context;
use crate::cli::ServeArgs;
use crate::config::Config;
use crate::engine::{Reconciler, RunReport};
use crate::ui;
use crate::webhook::{self, AppState, DevicePass};

use super::{inventory, login, logout, sync_options};

/// Device pass against the live systems, one session per event
struct LivePass {
    config: Config,
}

impl DevicePass for LivePass {
    fn run_device(&self, id: u64) -> Result<RunReport> {
        let classes = self.config.classification();
        let netbox = inventory(&self.config);
        let session = login(&self.config)?;

        let result = Reconciler::new(&netbox, &session, &classes, sync_options(&self.config))
            .run_device(id, &mut AutoConfirm);
        logout(session);

        let report = result?;
        log::info!(
            "Device {id}: {} changes, {} issues",
            report.changes.len(),
            report.issues.len()
        );
        Ok(report)
    }
}

/// Run the webhook listener until Ctrl-C
pub fn run(ctx: &Context, config: Config, args: &ServeArgs) -> Result<()> {
    let bind = args.bind.as_deref().unwrap_or(&config.webhook.bind);
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid listen address {bind:?}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Could not start the async runtime")?;

    let state = AppState::new(LivePass { config });
    if !ctx.quiet {
        ui::info(&format!("Listening on http://{addr}/webhook/"));
    }
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Could not listen on {addr}"))?;
        axum::serve(listener, webhook::router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Webhook listener failed")
    })?;

    log::info!("Webhook listener stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
