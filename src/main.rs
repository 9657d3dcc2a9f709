// ─── CLI Shell ───
// Thin command-line front end over the bootstrap engine: list versions,
// or install-and-launch one with progress on stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mc_bootstrap::{catalog, Bootstrap, LaunchConfig};

#[derive(Parser)]
#[command(name = "mc-bootstrap", version, about = "Minecraft client bootstrap")]
struct Cli {
    /// Minecraft installation directory (defaults to the platform's
    /// standard .minecraft location).
    #[arg(long, global = true)]
    mc_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List installed and remotely available versions.
    Versions {
        /// Only stable releases.
        #[arg(long)]
        releases: bool,
    },
    /// Download anything missing for a version and launch it.
    Launch {
        /// Version id, e.g. "1.20.1".
        version: String,
        /// Offline profile name.
        #[arg(long, default_value = "Player")]
        username: String,
        /// Maximum JVM heap in megabytes.
        #[arg(long, default_value_t = 2048)]
        max_memory: u32,
        /// Initial JVM heap in megabytes.
        #[arg(long, default_value_t = 512)]
        min_memory: u32,
        /// Fetch missing files but skip spawning the game.
        #[arg(long)]
        no_launch: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mc_dir = cli
        .mc_dir
        .unwrap_or_else(mc_bootstrap::layout::default_mc_dir);

    match cli.command {
        Command::Versions { releases } => list_versions(&mc_dir, releases).await,
        Command::Launch {
            version,
            username,
            max_memory,
            min_memory,
            no_launch,
        } => bootstrap(&mc_dir, version, username, max_memory, min_memory, no_launch).await,
    }
}

async fn list_versions(mc_dir: &std::path::Path, releases_only: bool) -> ExitCode {
    let client = match mc_bootstrap::http::build_http_client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    for version in catalog::available_versions(&client, mc_dir).await {
        if releases_only && version.version_type != "release" {
            continue;
        }
        println!("{version}");
    }
    ExitCode::SUCCESS
}

async fn bootstrap(
    mc_dir: &std::path::Path,
    version: String,
    username: String,
    max_memory: u32,
    min_memory: u32,
    no_launch: bool,
) -> ExitCode {
    let config = LaunchConfig::new()
        .username(username)
        .mc_dir(mc_dir)
        .libraries(mc_dir.join("libraries"))
        .assets(mc_dir.join("assets"))
        .max_memory_mb(max_memory)
        .min_memory_mb(min_memory)
        .discover_version(version);

    let engine = match Bootstrap::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    engine.init().await;
    let state = engine.state();
    if let Some(error) = state.last_error() {
        eprintln!("Initialization failed: {error}");
        return ExitCode::FAILURE;
    }

    if state.needs_download() {
        eprintln!("{}", state.status_message());
        let download = match engine.download() {
            Ok(download) => download,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        };
        download.on_progress(|d| {
            eprint!("\r{} {}        ", d.formatted_progress(), d.current_file());
        });
        download.on_error(|e| {
            eprintln!("\nDownload error: {e}");
        });
        download.wait_for_completion().await;
        eprintln!();

        if !download.is_completed() {
            eprintln!("Download did not complete (status: {})", download.status());
            return ExitCode::FAILURE;
        }
        if download.failed_files() > 0 {
            eprintln!("{} files failed to download", download.failed_files());
        }
    }

    let state = engine.state();
    if !state.can_launch() {
        eprintln!("Not launchable: {}", state.status_message());
        return ExitCode::FAILURE;
    }
    if no_launch {
        eprintln!("Ready to launch (skipped)");
        return ExitCode::SUCCESS;
    }

    let mut child = match engine.run().await {
        Ok(child) => child,
        Err(e) => {
            eprintln!("Launch failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    engine.close();

    match child.wait() {
        Ok(status) if status.success() => ExitCode::SUCCESS,
        Ok(status) => {
            eprintln!("Game exited with {status}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Failed to wait for game process: {e}");
            ExitCode::FAILURE
        }
    }
}
