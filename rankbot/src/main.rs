//! Hackathon grading CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rankbot::core::types::GroupId;
use rankbot::evaluate::{cmd_inspect, cmd_run};
use rankbot::io::config::process_env;
use rankbot::logging;

#[derive(Parser)]
#[command(
    name = "rankbot",
    version,
    about = "Score hackathon submissions with tool-using LLM judges"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize, score and rank every submission of a cohort.
    Run {
        /// Cohort label from the configuration.
        #[arg(long, default_value = "c4")]
        cohort: String,
        /// Only evaluate these group ids.
        #[arg(long, num_args = 1..)]
        groups: Vec<GroupId>,
        /// Config file (defaults to `<base>/rankbot.toml`).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print each group's resolved submission location.
    Inspect {
        #[arg(long, default_value = "c4")]
        cohort: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let output = match cli.command {
        Command::Run {
            cohort,
            groups,
            config,
        } => cmd_run(&cohort, &groups, config.as_deref(), &cwd, &process_env)?,
        Command::Inspect { cohort, config } => {
            cmd_inspect(&cohort, config.as_deref(), &cwd, &process_env)?
        }
    };
    print!("{output}");
    Ok(())
}
