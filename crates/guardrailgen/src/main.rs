mod cli;
mod commands;
mod config;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use guardrail_testgen::{CompileOptions, TargetLanguage};

use crate::cli::{Cli, Command};
use crate::commands::DecisionSink;
use crate::config::{Config, LogFormat, LoggingConfig};

fn main() -> Result<()> {
    // 1. Parse CLI and load config.
    let cli = Cli::parse();
    let loaded = config::load(&cli.config)?;
    let config_found = loaded.is_some();
    let mut cfg = loaded.unwrap_or_default();

    // 2. Apply CLI overrides.
    if let Some(ref level) = cli.log_level {
        cfg.logging.level = level.clone();
    }

    // 3. Init tracing-subscriber. Logs go to stderr; stdout carries results.
    init_tracing(&cfg.logging);

    if !config_found {
        warn!(
            path = %cli.config.display(),
            "configuration file not found; using defaults"
        );
    }
    info!(
        command = cli.command.name(),
        config_file = %cli.config.display(),
        "guardrailgen starting"
    );

    // 4. Open the decision log, if configured.
    let mut sink = DecisionSink::open(cfg.decision_log.as_deref())?;

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Command::Validate { file } => commands::validate(&file, &mut sink, &mut stdout),
        Command::Import {
            input,
            project,
            out,
        } => {
            let project = project
                .or_else(|| cfg.project.clone())
                .unwrap_or_else(|| project_from_path(&input));
            commands::import(&input, &project, out.as_deref(), &mut stdout)
        }
        Command::Generate {
            policies,
            lang,
            out,
        } => {
            let target = match lang {
                Some(lang) => lang,
                None => target_from_config(&cfg)?,
            };
            let out_dir = out.unwrap_or_else(|| cfg.generate.out_dir.clone());
            let options = compile_options(&cfg);
            commands::generate(&policies, target, &out_dir, &options, &mut sink, &mut stdout)
                .map(|_| ())
        }
        Command::Evaluate { policies, request } => commands::evaluate_request(
            &policies,
            request.as_deref(),
            &mut sink,
            &mut stdin,
            &mut stdout,
        )
        .map(|_| ()),
        Command::Probe => commands::probe(&mut stdin, &mut stdout).map(|_| ()),
        Command::Test { policies } => commands::conformance(&policies, &mut sink, &mut stdout),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn target_from_config(cfg: &Config) -> Result<TargetLanguage> {
    cfg.generate
        .lang
        .parse::<TargetLanguage>()
        .map_err(anyhow::Error::msg)
        .context("invalid generate.lang in config")
}

fn compile_options(cfg: &Config) -> CompileOptions {
    let mut options = CompileOptions {
        cli_binary: cfg.generate.cli_binary.clone(),
        ..CompileOptions::default()
    };
    if let Some(ref dependency) = cfg.generate.engine_dependency {
        options.engine_dependency = dependency.clone();
    }
    options
}

/// Fallback project name: the input file's stem.
fn project_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "guardrails".to_string())
}
