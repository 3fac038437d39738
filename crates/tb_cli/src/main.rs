mod cli;
mod commands {
    pub mod config;
    pub mod dedupe;
    pub mod sync;
}

use clap::Parser;
use cli::{Cli, Command, ConfigCmd};
use tb_core::app_error::AppError;

fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before unix epoch");
    now.as_millis() as i64
}

// 0 = success (clean dry-run included), 1 = partial apply,
// 2 = configuration, lock, or other fatal error.
fn fatal(err: AppError) -> ! {
    eprintln!("{}: {}", err.code, err.message);
    std::process::exit(2);
}

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Sync {
            vault,
            apply,
            direction,
            list_ids,
            no_dedup,
            dedup_auto_apply,
            verbose,
        } => {
            match commands::sync::run_sync_command(
                &cli.config,
                vault.as_deref(),
                apply,
                direction.into(),
                &list_ids,
                no_dedup,
                dedup_auto_apply,
                verbose,
                now_ms(),
            ) {
                Ok(report) if report.partial => std::process::exit(1),
                Ok(_) => {}
                Err(err) => fatal(err),
            }
        }
        Command::Config { cmd } => {
            let result = match cmd {
                ConfigCmd::Init => commands::config::run_init(&cli.config),
                ConfigCmd::Show => commands::config::run_show(&cli.config),
            };
            if let Err(err) = result {
                fatal(err);
            }
        }
        Command::Dedupe { vault, verbose } => {
            if let Err(err) =
                commands::dedupe::run_dedupe(&cli.config, vault.as_deref(), verbose, now_ms())
            {
                fatal(err);
            }
        }
    }
}
