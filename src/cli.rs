use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::paths::ENV_CONFIG;

#[derive(Parser)]
#[command(name = "monsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile NetBox device inventory into Zabbix monitored hosts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file [default: ~/.config/monsync/config.toml]
    #[arg(short, long, global = true, env = ENV_CONFIG)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile every classified device, then disable stale hosts
    Sync(SyncArgs),

    /// Reconcile a single inventory device (no stale-host sweep)
    Device(DeviceArgs),

    /// Listen for inventory webhooks and reconcile changed devices
    Serve(ServeArgs),

    /// Validate the config file and show the classification map
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// How writes are approved
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct WriteMode {
    /// Show what would change without writing anything
    #[arg(short = 'n', long, conflicts_with = "yes")]
    pub dry_run: bool,

    /// Apply every change without asking, even if `sync.confirm` is set
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub mode: WriteMode,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DeviceArgs {
    /// Inventory device id
    pub id: u64,

    #[command(flatten)]
    pub mode: WriteMode,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address, overriding `webhook.bind`
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from(["monsync", "-vv", "sync", "--dry-run", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Sync(args) => {
                assert!(args.mode.dry_run);
                assert!(!args.mode.yes);
                assert!(args.json);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_dry_run_conflicts_with_yes() {
        assert!(Cli::try_parse_from(["monsync", "sync", "--dry-run", "--yes"]).is_err());
    }

    #[test]
    fn test_parse_device() {
        let cli = Cli::try_parse_from(["monsync", "device", "17", "-y"]).unwrap();
        match cli.command {
            Command::Device(args) => {
                assert_eq!(args.id, 17);
                assert!(args.mode.yes);
            }
            _ => panic!("expected device"),
        }
    }
}
