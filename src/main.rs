//! Signing Stager CLI
//!
//! Entry point for the `signing-stager` command-line tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use signing_stager::config::StagerConfig;
use signing_stager::correlate::correlate;
use signing_stager::logging::DiagnosticLog;
use signing_stager::pipeline::Pipeline;
use signing_stager::source::{
    ArtifactManifest, IdentitySource, ManifestFileSource, ProfileSource,
};

#[derive(Parser)]
#[command(name = "signing-stager")]
#[command(about = "Stage device signing files into a CI upload package", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, correlate and package signing files
    Run {
        /// Path to the artifact manifest (JSON)
        manifest: PathBuf,

        /// Path to config file (default: .signing-stager.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Override the package file name
        #[arg(long)]
        package_name: Option<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Echo debug-level progress to stderr
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Correlate profiles and identities without staging or packaging
    Correlate {
        /// Path to the artifact manifest (JSON)
        manifest: PathBuf,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            manifest,
            config,
            package_name,
            json,
            verbose,
        } => {
            run_pipeline(manifest, config, package_name, json, verbose);
        }
        Commands::Correlate { manifest, human } => {
            run_correlate(manifest, human);
        }
    }
}

fn invocation_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn load_config(path: Option<PathBuf>) -> StagerConfig {
    let result = match path {
        Some(path) => StagerConfig::from_file(&path),
        None => StagerConfig::load(&invocation_dir()),
    };
    match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run_pipeline(
    manifest_path: PathBuf,
    config_path: Option<PathBuf>,
    package_name: Option<String>,
    json: bool,
    verbose: bool,
) {
    let mut config = load_config(config_path).with_verbose(verbose);
    if let Some(name) = package_name {
        config = config.with_package_name(name);
    }

    let log = match DiagnosticLog::open(&invocation_dir()) {
        Ok(log) => log.with_debug_echo(config.verbose),
        Err(e) => {
            eprintln!("Error: failed to open diagnostic log: {e}");
            process::exit(1);
        }
    };

    let source = ManifestFileSource::new(manifest_path);
    let mut pipeline = Pipeline::new(config, &source, &source, &log);
    let report = pipeline.run();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("Error: failed to serialize report: {e}"),
        }
    }

    // Exit status mapping belongs to this shell layer, not the pipeline
    if !report.succeeded() {
        process::exit(1);
    }
}

fn run_correlate(manifest_path: PathBuf, human: bool) {
    let manifest = match ArtifactManifest::load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let profiles = match ProfileSource::collect(&manifest) {
        Ok(profiles) => profiles,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let identities = match IdentitySource::collect(&manifest) {
        Ok(identities) => identities,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let result = correlate(&profiles, &identities);

    if human {
        println!(
            "Retained {} of {} profile(s), {} of {} identity(ies)",
            result.profiles.len(),
            profiles.len(),
            result.identities.len(),
            identities.len()
        );
        for profile in &result.profiles {
            println!("  profile  {profile}");
        }
        for identity in &result.identities {
            println!("  identity {identity}");
        }
    } else {
        match serde_json::to_string_pretty(&result) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
