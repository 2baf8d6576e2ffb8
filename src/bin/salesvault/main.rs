use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::error;

use salesvault::ops::Vault;
use salesvault::VaultConfig;

mod cli;
mod util;
mod cmd_init;
mod cmd_status;
mod cmd_snapshot;
mod cmd_restore;
mod cmd_audit;
mod cmd_repair;
mod cmd_sweep;

fn init_logger() {
    // RUST_LOG wins, default is info.
    // Example: RUST_LOG=salesvault=debug salesvault repair --dry-run
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();

    let mut cfg = VaultConfig::from_env()
        .with_db_path(cli.db)
        .with_snapshot_dir(cli.snapshot_dir);
    if cli.foreign_keys {
        cfg = cfg.with_foreign_keys(true);
    }

    let res = match cli.cmd {
        cli::Cmd::Init => cmd_init::exec(Vault::new(cfg)),

        cli::Cmd::Status { json } => cmd_status::exec(Vault::new(cfg), json),

        cli::Cmd::Snapshot(args) => match args.action {
            None => {
                let mut cfg = cfg.with_snapshot_keep(args.keep);
                if args.gzip {
                    cfg = cfg.with_snapshot_gzip(true);
                }
                cmd_snapshot::exec_create(Vault::new(cfg), args.name, args.json, args.strict)
            }
            Some(cli::SnapshotCmd::List { json }) => cmd_snapshot::exec_list(Vault::new(cfg), json),
            Some(cli::SnapshotCmd::Inspect { name, json }) => {
                cmd_snapshot::exec_inspect(Vault::new(cfg), name, json)
            }
            Some(cli::SnapshotCmd::Prune { keep }) => cmd_snapshot::exec_prune(Vault::new(cfg), keep),
        },

        cli::Cmd::Restore { name, strict, json } => {
            cmd_restore::exec(Vault::new(cfg), name, json, strict)
        }

        cli::Cmd::Audit { json, strict } => cmd_audit::exec(Vault::new(cfg), json, strict),

        cli::Cmd::Repair {
            dry_run,
            fallback_rep,
            json,
            strict,
        } => {
            let cfg = cfg.with_fallback_representative(fallback_rep);
            if dry_run {
                cmd_repair::exec_plan(Vault::new(cfg), json)
            } else {
                cmd_repair::exec(Vault::new(cfg), json, strict)
            }
        }

        cli::Cmd::Sweep { json } => cmd_sweep::exec(Vault::new(cfg), json),
    };

    if cli.metrics {
        util::print_metrics();
    }
    res
}
