//! Command-line interface built on clap.
//!
//! Subcommands: `correct`, `batch`, `health`, `init-config`; global flags
//! select the pipeline, model variants and settings file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use viet_corrector::pipeline::BackendSelectors;

/// Vietnamese text correction through chained correction models.
#[derive(Debug, Parser)]
#[command(name = "viet-corrector", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline to run (qwen_protonx, qwen_only, protonx_only,
    /// bartpho_protonx, ollama_protonx, ollama_only).
    #[arg(long, short, global = true)]
    pub pipeline: Option<String>,

    /// Local model key (e.g. qwen2.5-7b, qwen3-8b).
    #[arg(long, global = true)]
    pub local_model: Option<String>,

    /// Remote model name (e.g. qwen2.5:7b).
    #[arg(long, global = true)]
    pub remote_model: Option<String>,

    /// Settings file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

impl Cli {
    pub fn selectors(&self) -> BackendSelectors {
        BackendSelectors {
            local_model: self.local_model.clone(),
            remote_model: self.remote_model.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Correct one text.
    Correct {
        /// Text to correct; read from --file when omitted.
        text: Option<String>,

        /// Read the text from this file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Go through the job queue and poll for the result.
        #[arg(long, default_value_t = false)]
        queued: bool,
    },

    /// Correct a file paragraph by paragraph (one paragraph per line).
    Batch {
        /// Input file.
        file: PathBuf,

        /// Write the rejoined corrected text here.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show backend availability, variants and pipelines.
    Health,

    /// Write the default settings file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_correct_with_globals() {
        let cli = Cli::parse_from([
            "viet-corrector",
            "correct",
            "hom nay troi dep",
            "--pipeline",
            "ollama_only",
            "--remote-model",
            "gemma2:9b",
        ]);
        match &cli.command {
            Command::Correct { text, file, queued } => {
                assert_eq!(text.as_deref(), Some("hom nay troi dep"));
                assert!(file.is_none());
                assert!(!queued);
            }
            _ => panic!("expected Correct command"),
        }
        assert_eq!(cli.pipeline.as_deref(), Some("ollama_only"));
        assert_eq!(cli.selectors().remote_model.as_deref(), Some("gemma2:9b"));
        assert!(cli.selectors().local_model.is_none());
    }

    #[test]
    fn cli_parses_batch_and_queued() {
        let cli = Cli::parse_from(["viet-corrector", "batch", "in.txt", "-o", "out.txt"]);
        match cli.command {
            Command::Batch { file, output } => {
                assert_eq!(file, PathBuf::from("in.txt"));
                assert_eq!(output, Some(PathBuf::from("out.txt")));
            }
            _ => panic!("expected Batch command"),
        }

        let cli = Cli::parse_from(["viet-corrector", "correct", "--queued", "x"]);
        assert!(matches!(cli.command, Command::Correct { queued: true, .. }));
    }

    #[test]
    fn cli_parses_health_and_init_config() {
        let cli = Cli::parse_from(["viet-corrector", "health", "--json"]);
        assert!(matches!(cli.command, Command::Health));
        assert!(cli.json);

        let cli = Cli::parse_from(["viet-corrector", "init-config", "--force"]);
        assert!(matches!(cli.command, Command::InitConfig { force: true }));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
