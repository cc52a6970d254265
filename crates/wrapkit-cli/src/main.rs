use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;
use wrapkit_core::artifacts::BuildDirArtifacts;
use wrapkit_core::config::ProjectLayout;
use wrapkit_core::extractor::{self, ExtractionReport};
use wrapkit_core::imports::{ClosureMode, ImportResolver};
use wrapkit_core::overlay::{self, WrappersConfig};
use wrapkit_core::Error;

/// wrapkit - contract wrapper schema tool
///
/// Extract callable interfaces from TypeScript contract wrappers and
/// compute the files a wrapper depends on.
#[derive(Parser)]
#[command(name = "wrapkit", version, about, long_about = None)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe every wrapper of a project and write wrappers.json + config.json
    Schema {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Wrappers directory, relative to the root
        #[arg(long)]
        wrappers: Option<PathBuf>,
        /// Compiled artifacts directory, relative to the root
        #[arg(long)]
        build: Option<PathBuf>,
        /// Output directory, relative to the root
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the schema to stdout instead of writing files
        #[arg(long)]
        json: bool,
    },

    /// Describe one wrapper class
    Inspect {
        /// Path to the wrapper .ts file
        file: PathBuf,
        /// Class name (defaults to the file stem)
        class: Option<String>,
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Compiled artifacts directory, relative to the root
        #[arg(long)]
        build: Option<PathBuf>,
    },

    /// List the source files a set of wrappers imports, transitively
    Imports {
        /// Entry .ts files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Base directory the entries are relative to
        #[arg(long, default_value = ".")]
        base: PathBuf,
        /// Follow every resolvable import instead of the first one per file
        #[arg(long)]
        exhaustive: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Schema {
            root,
            wrappers,
            build,
            out,
            json,
        } => {
            let mut layout = ProjectLayout::new(root);
            if let Some(dir) = wrappers {
                layout = layout.with_wrappers_dir(dir);
            }
            if let Some(dir) = build {
                layout = layout.with_build_dir(dir);
            }
            if let Some(dir) = out {
                layout = layout.with_output_dir(dir);
            }
            cmd_schema(&layout, json, cli.quiet)
        }
        Commands::Inspect {
            file,
            class,
            root,
            build,
        } => {
            let mut layout = ProjectLayout::new(root);
            if let Some(dir) = build {
                layout = layout.with_build_dir(dir);
            }
            cmd_inspect(&file, class, &layout)
        }
        Commands::Imports {
            files,
            base,
            exhaustive,
            json,
        } => cmd_imports(&files, &base, exhaustive, json, cli.quiet),
        Commands::Version => {
            println!("wrapkit {}", env!("CARGO_PKG_VERSION"));
            0
        }
    };

    process::exit(exit_code);
}

// ── Helpers ───────────────────────────────────────────────

fn report_error(context: &str, err: &Error) -> i32 {
    eprintln!("{} {}: {}", "error:".red().bold(), context, err);
    2
}

/// Extraction problems are a failed check (1); environment problems are errors (2)
fn exit_code_for(err: &Error) -> i32 {
    match err {
        Error::Io { .. } => 2,
        _ => 1,
    }
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Io { path: path.display().to_string(), message: e.to_string() })?;
    fs::write(path, text + "\n").map_err(|e| Error::io(path, e))
}

/// Existing overlay, if present and readable
fn read_overlay(path: &Path) -> Option<WrappersConfig> {
    let text = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable display config");
            None
        }
    }
}

// ── Commands ──────────────────────────────────────────────

fn print_report(report: &ExtractionReport) {
    for (name, info) in &report.wrappers {
        println!(
            "{} {} ({} send, {} get{})",
            "✓".green(),
            name,
            info.send_functions.len(),
            info.get_functions.len(),
            if info.deploy.can_be_created_from_config { ", deployable" } else { "" }
        );
    }
    for failure in &report.failures {
        println!("{} {}: {}", "✗".red(), failure.class, failure.error);
    }
}

fn cmd_schema(layout: &ProjectLayout, json: bool, quiet: bool) -> i32 {
    let report = match extractor::extract_project(layout) {
        Ok(report) => report,
        Err(e) => return report_error("schema", &e),
    };

    if json {
        match serde_json::to_string_pretty(&report.wrappers) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        }
    } else {
        let existing = read_overlay(&layout.config_file());
        let config = overlay::merge_overlay(existing.as_ref(), &report.wrappers);

        if let Err(e) = write_json(&layout.wrappers_file(), &report.wrappers) {
            return report_error("schema", &e);
        }
        if let Err(e) = write_json(&layout.config_file(), &config) {
            return report_error("schema", &e);
        }
        if !quiet {
            print_report(&report);
            println!("wrote {}", layout.wrappers_file().display());
        }
    }

    for failure in &report.failures {
        eprintln!("{} {}: {}", "error:".red().bold(), failure.path.display(), failure.error);
    }
    if report.is_complete() {
        0
    } else {
        1
    }
}

fn cmd_inspect(file: &Path, class: Option<String>, layout: &ProjectLayout) -> i32 {
    let class = class.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let file = if file.is_absolute() {
        file.to_path_buf()
    } else {
        layout.root.join(file)
    };
    let artifacts = BuildDirArtifacts::new(&layout.build_dir);

    match extractor::build_wrapper(&file, &class, &artifacts, layout) {
        Ok(info) => match serde_json::to_string_pretty(&info) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                2
            }
        },
        Err(e) => {
            eprintln!("{} {}: {}", "error:".red().bold(), class, e);
            exit_code_for(&e)
        }
    }
}

fn cmd_imports(files: &[PathBuf], base: &Path, exhaustive: bool, json: bool, quiet: bool) -> i32 {
    let mode = if exhaustive {
        ClosureMode::Exhaustive
    } else {
        ClosureMode::FirstResolved
    };
    let resolver = ImportResolver::new(base).with_mode(mode);

    let closure = match resolver.closure_of_list(files) {
        Ok(closure) => closure,
        Err(e) => return report_error("imports", &e),
    };

    if json {
        let paths: Vec<String> = closure.iter().map(|p| p.display().to_string()).collect();
        println!("{}", serde_json::Value::from(paths));
    } else if !quiet {
        for path in &closure {
            println!("{}", path.display());
        }
    }
    0
}
