use anyhow::Result;
use clap::Parser;
use dotlink::commands;
use dotlink::plan::ConflictPolicy;
use std::path::PathBuf;

/// dotlink - symlink dotfiles manager
///
/// Mirrors the files of a package directory into a target directory as
/// relative symlinks and tracks what it created in a per-user registry.
///
/// Install takes a package directory path; uninstall takes the package NAME
/// recorded at install time (the final component of the package directory),
/// because the registry is keyed by name and the package directory may no
/// longer exist.
///
/// Examples:
///   dotlink install ~/dotfiles/shell          # Link shell's files into $HOME
///   dotlink uninstall shell                   # Remove the links it created
#[derive(Parser, Debug)]
#[command(author, version = env!("DOTLINK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry file (overrides the platform default; also via DOTLINK_REGISTRY)
    #[arg(
        long = "registry",
        env = "DOTLINK_REGISTRY",
        value_name = "PATH",
        global = true
    )]
    pub registry: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a package by creating symlinks
    Install(InstallArgs),

    /// Uninstall a registered package by removing its symlinks
    Uninstall(UninstallArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Package directory whose files will be linked
    #[arg(value_name = "PACKAGE")]
    pub package: PathBuf,

    /// Directory to create the symlinks in (default: home directory)
    #[arg(value_name = "TARGET")]
    pub target: Option<PathBuf>,

    /// Show what would be done without doing it
    #[arg(long = "dry-run", short = 'n')]
    pub dry_run: bool,

    /// How to handle conflicting files
    #[arg(long = "on-conflict", value_enum, default_value_t)]
    pub on_conflict: ConflictPolicy,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// Registered package name (not a path)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Show what would be done without doing it
    #[arg(long = "dry-run", short = 'n')]
    pub dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = dotlink::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => commands::install(
            runtime,
            &args.package,
            args.target,
            args.on_conflict,
            args.dry_run,
            cli.registry,
        ),
        Commands::Uninstall(args) => {
            commands::uninstall(runtime, &args.name, args.dry_run, cli.registry)
        }
    }
}
