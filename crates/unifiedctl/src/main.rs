//! Unified control - configuration tool for the unified runtime.
//!
//! Loads the YAML configuration, applies `--set` overrides, and shows,
//! validates, or documents the effective result. Exit codes are stable so
//! scripts can branch on the failure kind.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use unified_core::config::cli::{apply_set, exit_code_for, split_assignment, ExitCode};
use unified_core::config::schema::config_metadata;
use unified_core::{ConfigLoader, UnifiedConfig};

#[derive(Parser)]
#[command(name = "unifiedctl")]
#[command(about = "Unified runtime configuration tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file. When omitted, configuration is
    /// built from defaults and UNIFIED_* environment variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override a configuration value (key=value). Repeatable; applied
    /// after the file and environment.
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    sets: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as YAML
    Show,

    /// Validate the configuration and report every issue
    Validate,

    /// List documented configuration fields with env vars and reload rules
    Fields,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(run(cli) as i32);
}

fn run(cli: Cli) -> ExitCode {
    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load(path),
        None => ConfigLoader::load_from_env(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("unifiedctl: {}", e.message);
            return exit_code_for(&e);
        }
    };

    for assignment in &cli.sets {
        let applied =
            split_assignment(assignment).and_then(|(key, value)| apply_set(&mut config, key, value));
        if let Err(e) = applied {
            eprintln!("unifiedctl: {}", e.message);
            return exit_code_for(&e);
        }
    }

    // Overrides can break cross-field rules the loaded file satisfied, so
    // the result is validated again. `validate` reports issue-by-issue.
    if !cli.sets.is_empty() && !matches!(cli.command, Commands::Validate) {
        if let Err(e) = ConfigLoader::validate(&config) {
            eprintln!("unifiedctl: {}", e.message);
            return exit_code_for(&e);
        }
    }

    match cli.command {
        Commands::Show => show(&config),
        Commands::Validate => validate(&config),
        Commands::Fields => fields(),
    }
}

fn show(config: &UnifiedConfig) -> ExitCode {
    match serde_yaml::to_string(config) {
        Ok(yaml) => {
            print!("{yaml}");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("unifiedctl: failed to render configuration: {e}");
            ExitCode::LoadError
        }
    }
}

fn validate(config: &UnifiedConfig) -> ExitCode {
    let issues = ConfigLoader::validation_issues(config);
    if issues.is_empty() {
        println!("configuration is valid");
        return ExitCode::Success;
    }

    let mut errors = 0usize;
    for issue in &issues {
        let kind = if issue.is_warning { "warning" } else { "error" };
        println!("{kind}: {}: {}", issue.field_path, issue.message);
        if !issue.is_warning {
            errors += 1;
        }
    }
    if errors > 0 {
        println!("{errors} error(s), {} warning(s)", issues.len() - errors);
        ExitCode::ValidationError
    } else {
        println!("configuration is valid ({} warning(s))", issues.len());
        ExitCode::Success
    }
}

fn fields() -> ExitCode {
    for field in config_metadata() {
        let reload = if field.hot_reloadable {
            "hot-reloadable"
        } else {
            "restart required"
        };
        println!("{}  [{reload}]", field.path);
        println!("    {}", field.description);
        if !field.env_var.is_empty() {
            println!("    env: {}", field.env_var);
        }
        if !field.allowed_values.is_empty() {
            println!("    values: {}", field.allowed_values.join(", "));
        }
    }
    ExitCode::Success
}
