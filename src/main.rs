use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use profmgr::{
    ProfileError, ProfileStore,
    commands::{self, AddArgs, UpdateArgs},
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "profmgr")]
#[command(about = "Profile Manager - create, update and delete server credential profiles")]
#[command(version)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all stored profiles
    List,

    /// Add a new profile
    Add(AddArgs),

    /// Remove a profile
    Remove {
        /// Name of the profile to remove
        name: String,
    },

    /// Update an existing profile
    Update(UpdateArgs),

    /// Show the details of a profile
    Show {
        /// Name of the profile to show
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    match run(cli, &ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ProfileError>() {
            Some(status) => {
                ui.status(*status);
                ExitCode::from(status.code())
            }
            None => {
                ui.err(format!("{e:#}"));
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    let paths = Paths::new()?;
    let mut store = ProfileStore::open(paths)?;

    match cli.command {
        Commands::List => commands::list(&store, ui),
        Commands::Add(args) => {
            let interactive = std::io::stdin().is_terminal();
            commands::add(&mut store, ui, args, interactive)
        }
        Commands::Remove { name } => commands::remove(&mut store, ui, &name),
        Commands::Update(args) => commands::update(&mut store, ui, args),
        Commands::Show { name } => commands::show(&mut store, ui, &name),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("profmgr={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
