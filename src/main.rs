use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use data_version::cli::{preview_next_release, run_pipeline, Stage};
use data_version::config::{self, Config};
use data_version::logging::{LogFormat, Logging};
use data_version::ui;

#[derive(Parser)]
#[command(
    name = "data-version",
    version,
    about = "Download, cleanse, split and version datasets with DVC and git tags"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, global = true, help = "Log filter, e.g. info or data_version=debug")]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum, help = "Log output format")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every stage: gather, cleanse, split and push
    Run,
    /// Download the raw dataset
    Gather {
        #[arg(long, help = "Download from this URL instead of the configured one")]
        url: Option<String>,
    },
    /// Clean the raw dataset
    Cleanse,
    /// Split the cleansed dataset into train, validation and test
    Split,
    /// Version the partitions with DVC and tag the commit
    Push,
    /// Show the next version tag without changing anything
    NextTag {
        #[arg(long, help = "Working copy to read tags from (defaults to git.save_dir)")]
        repo: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    let _logging = Logging::install(&config.logging)?;

    if let Err(e) = run(args.command, config) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

fn run(command: Command, mut config: Config) -> Result<()> {
    let stages: Vec<Stage> = match command {
        Command::Run => Stage::ALL.to_vec(),
        Command::Gather { url } => {
            if let Some(url) = url {
                config.data_url = url;
            }
            vec![Stage::Gather]
        }
        Command::Cleanse => vec![Stage::Cleanse],
        Command::Split => vec![Stage::Split],
        Command::Push => vec![Stage::Push],
        Command::NextTag { repo } => {
            let scheme = config.tag_scheme()?;
            let plan = preview_next_release(&config, repo.as_deref())?;
            ui::display_release_plan(&plan, &scheme);
            return Ok(());
        }
    };

    let names: Vec<&str> = stages.iter().map(Stage::name).collect();
    ui::display_status(&format!("Running {}", names.join(", ")));

    let report = run_pipeline(&stages, &config)?;
    ui::display_report(&report);
    Ok(())
}
