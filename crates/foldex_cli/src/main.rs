/* 📖 # Why does the CLI open the store through RealPal with .foldex excluded?

foldex keeps its settings inside the folder tree it maintains, under
`.foldex/settings.toml`. RealPal hides that directory from listings and change
notifications, so the settings never show up in an index and saving them never
triggers a rebuild.

Commands:
- `foldex watch` keeps every index current until interrupted
- `foldex rebuild [FOLDER]` rebuilds one folder, or every folder
- `foldex settings` prints the current settings as JSON
- `foldex set-index-name NAME` renames every index document
- `foldex set-ignored PATTERNS` replaces the comma-separated ignore patterns

Exit codes:
- 0: Success
- 1: Error (settings unreadable, store not watchable, or a rebuild failed)
*/

use std::env;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use foldex_base::tracing::init_tracing;
use foldex_base::{FilePath, PalHandle, RealPal};
use foldex_engine::{
    DEFAULT_SETTINGS_PATH, IndexOutcome, IndexService, SETTINGS_DIRECTORY, TreeReport,
};

#[derive(Parser)]
#[command(name = "foldex")]
#[command(about = "Keeps an index document in every folder of a notes tree")]
#[command(version)]
struct Cli {
    /// Root of the folder tree (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Settings file, relative to the root
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    settings: String,

    /// Pause after a rename before rebuilding, in milliseconds
    #[arg(long, global = true, default_value_t = 100)]
    settle_delay_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the tree and rebuild indexes as it changes
    Watch {
        /// Rebuild every index before watching
        #[arg(long)]
        rebuild_on_start: bool,
    },

    /// Rebuild the index of one folder, or of every folder
    Rebuild {
        /// Folder relative to the root
        folder: Option<String>,
    },

    /// Print the current settings as JSON
    Settings,

    /// Change the index file name and rename every index document
    SetIndexName { name: String },

    /// Replace the comma-separated list of ignore patterns
    SetIgnored { patterns: String },
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir().unwrap_or_else(|e| {
            eprintln!("Error: Failed to get current directory: {}", e);
            process::exit(1);
        }),
    };

    let pal = PalHandle::new(RealPal::new(root.clone()).with_excluded_directory(SETTINGS_DIRECTORY));
    let service = match IndexService::open(pal, FilePath::from(cli.settings.as_str())) {
        Ok(service) => service.with_settle_delay(Duration::from_millis(cli.settle_delay_ms)),
        Err(e) => {
            eprintln!("Error: Failed to load settings from {}: {}", cli.settings, e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Watch { rebuild_on_start } => {
            if rebuild_on_start {
                print_report(&service.rebuild_all());
            }
            let _watching = service.watch().unwrap_or_else(|e| {
                eprintln!("Error: Failed to watch {}: {}", root.display(), e);
                process::exit(1);
            });
            info!(root = %root.display(), "foldex is watching, press Ctrl-C to stop");
            loop {
                thread::park();
            }
        }
        Commands::Rebuild { folder: Some(folder) } => {
            let outcome = service.rebuild_folder(&FilePath::from(folder.as_str()));
            print_outcome(&outcome);
            if outcome.is_failed() {
                process::exit(1);
            }
        }
        Commands::Rebuild { folder: None } => {
            let report = service.rebuild_all();
            print_report(&report);
            if report.failed() > 0 {
                process::exit(1);
            }
        }
        Commands::Settings => match serde_json::to_string_pretty(&service.settings()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: Failed to render settings: {}", e);
                process::exit(1);
            }
        },
        Commands::SetIndexName { name } => match service.set_index_file_name(&name) {
            Ok(Some(report)) => {
                println!(
                    "Index file name changed to {}",
                    service.settings().index_file_name
                );
                print_report(&report);
            }
            Ok(None) => println!(
                "Index file name unchanged: {}",
                service.settings().index_file_name
            ),
            Err(e) => {
                eprintln!("Error: Failed to change index file name: {}", e);
                process::exit(1);
            }
        },
        Commands::SetIgnored { patterns } => {
            if let Err(e) = service.set_ignored_patterns(&patterns) {
                eprintln!("Error: Failed to change ignored patterns: {}", e);
                process::exit(1);
            }
            println!("Ignored patterns set to: {}", patterns);
        }
    }
}

fn print_outcome(outcome: &IndexOutcome) {
    match outcome {
        IndexOutcome::Written { index_path, .. } => println!("Wrote {}", index_path),
        IndexOutcome::Skipped { folder, reason } => {
            println!("Skipped '{}': {:?}", folder, reason)
        }
        IndexOutcome::Failed { folder, error } => {
            eprintln!("Failed '{}': {}", folder, error)
        }
    }
}

fn print_report(report: &TreeReport) {
    for outcome in report.outcomes.iter().filter(|o| o.is_failed()) {
        print_outcome(outcome);
    }
    for folder in &report.unlisted {
        eprintln!("Could not list subfolders of '{}'", folder);
    }
    println!(
        "Rebuilt indexes: {} written, {} skipped, {} failed",
        report.written(),
        report.skipped(),
        report.failed()
    );
}
