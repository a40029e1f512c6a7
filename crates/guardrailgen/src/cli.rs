use clap::{Parser, Subcommand};
use guardrail_testgen::TargetLanguage;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "guardrailgen",
    version,
    about = "Evaluate guardrail policies and compile them into test suites"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "guardrailgen.yaml")]
    pub config: PathBuf,

    /// Log level filter (overrides config file setting; RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a canonical policy document
    Validate {
        /// Policy document (YAML or JSON)
        file: PathBuf,
    },

    /// Convert a DashClaw policy export into a canonical document
    Import {
        /// Foreign policy export (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Project name (overrides config file setting)
        #[arg(long)]
        project: Option<String>,

        /// Write canonical YAML here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Compile a policy set into a test module and build descriptor
    Generate {
        #[arg(short, long)]
        policies: PathBuf,

        /// Target language: rust, js or py (overrides config file setting)
        #[arg(short, long)]
        lang: Option<TargetLanguage>,

        /// Output directory (overrides config file setting)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Evaluate one action request against every policy in a set
    Evaluate {
        #[arg(short, long)]
        policies: PathBuf,

        /// Action request JSON (read from stdin when omitted)
        #[arg(short, long)]
        request: Option<PathBuf>,
    },

    /// Evaluate `{"policy": .., "input": ..}` from stdin against that single policy
    Probe,

    /// Run the fixtures embedded in a policy set
    Test {
        #[arg(short, long)]
        policies: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Validate { .. } => "validate",
            Command::Import { .. } => "import",
            Command::Generate { .. } => "generate",
            Command::Evaluate { .. } => "evaluate",
            Command::Probe => "probe",
            Command::Test { .. } => "test",
        }
    }
}
