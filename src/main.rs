use clap::{Parser, Subcommand};
use pip_pilot::commands::*;
use pip_pilot::core::{error::Result, print_error, CommandContext, GlobalOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pip-pilot")]
#[command(about = "Inspect, update and clean up the packages of a Python environment")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Python interpreter whose packages are managed
    #[arg(long, global = true, env = "PIP_PILOT_PYTHON", default_value = "python3")]
    python: PathBuf,

    /// Registry JSON API base URL (overrides the config file)
    #[arg(long, global = true, env = "PIP_PILOT_REGISTRY")]
    registry: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed packages and whether they are up to date
    List {
        /// Show the last synchronized inventory without checking again
        #[arg(long)]
        cached: bool,
        /// Show outdated packages first
        #[arg(long)]
        outdated_first: bool,
        /// Only show packages whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Install a package
    Install {
        package: String,
        /// Do not refresh the inventory afterwards
        #[arg(long)]
        no_refresh: bool,
    },
    /// Update a package to its latest version
    Update {
        package: String,
        /// Do not refresh the inventory afterwards
        #[arg(long)]
        no_refresh: bool,
    },
    /// Uninstall a package
    Uninstall {
        package: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Do not refresh the inventory afterwards
        #[arg(long)]
        no_refresh: bool,
    },
    /// Update all installed packages, one after another
    UpdateAll {
        /// Only update packages with a newer registry version
        #[arg(long)]
        outdated: bool,
    },
    /// Show details and the latest version of a package
    Show { package: String },
    /// Remove every cached inventory
    ClearCache,
}

fn main() {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    let level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let context = CommandContext::initialize(&GlobalOptions {
        python: cli.python,
        registry: cli.registry,
    })?;

    match cli.command {
        Commands::List {
            cached,
            outdated_first,
            filter,
        } => execute_list(
            &context,
            ListOptions {
                cached,
                outdated_first,
                filter,
            },
        ),
        Commands::Install {
            package,
            no_refresh,
        } => execute_install(&context, &package, !no_refresh),
        Commands::Update {
            package,
            no_refresh,
        } => execute_update(&context, &package, !no_refresh),
        Commands::Uninstall {
            package,
            yes,
            no_refresh,
        } => execute_uninstall(&context, &package, yes, !no_refresh),
        Commands::UpdateAll { outdated } => execute_update_all(&context, outdated),
        Commands::Show { package } => execute_show(&context, &package),
        Commands::ClearCache => execute_clear_cache(&context),
    }
}
