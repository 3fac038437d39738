use clap::{Parser, Subcommand, ValueEnum};
use tb_core::engine::Direction;

#[derive(Parser)]
#[command(name = "taskbridge")]
#[command(about = "Bidirectional Obsidian / Apple Reminders task sync")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, short, default_value = "taskbridge.json")]
    pub config: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan and optionally apply a sync run (dry-run by default).
    Sync {
        /// Vault name or id; defaults to the configured default vault.
        #[arg(long)]
        vault: Option<String>,
        /// Apply the plan instead of only reporting it.
        #[arg(long)]
        apply: bool,
        #[arg(long, value_enum, default_value_t = DirectionArg::Both)]
        direction: DirectionArg,
        /// Explicit Reminders list ids to query (repeatable); defaults to
        /// the vault's default list plus every routed list.
        #[arg(long = "list-id")]
        list_ids: Vec<String>,
        /// Skip duplicate detection for this run.
        #[arg(long)]
        no_dedup: bool,
        /// Resolve duplicate clusters automatically, keeping one member.
        #[arg(long)]
        dedup_auto_apply: bool,
        /// Print the full report as JSON.
        #[arg(long, short)]
        verbose: bool,
    },
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
    /// Report duplicate clusters without planning any sync mutation.
    Dedupe {
        #[arg(long)]
        vault: Option<String>,
        #[arg(long, short)]
        verbose: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Write a fresh default configuration file.
    Init,
    /// Print the parsed configuration.
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Both,
    ObsToRem,
    RemToObs,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Both => Direction::Both,
            DirectionArg::ObsToRem => Direction::ObsToRem,
            DirectionArg::RemToObs => Direction::RemToObs,
        }
    }
}
