//! Command line entry point: process files one by one and print each
//! outcome as JSON on stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crate::config::{AppConfig, APP_NAME, APP_VERSION};
use crate::models::{AnalysisOutcome, AnalysisType, EnhancementProfile};
use crate::pipeline::analysis::AnalysisEngine;
use crate::pipeline::extraction::ContentExtractor;
use crate::pipeline::import::MediaInput;
use crate::pipeline::processor::{DocumentProcessor, ProcessRequest};
use crate::pipeline::progress::Progress;
use crate::pipeline::retrieval::{InMemoryVectorBackend, RetrievalContext};
use crate::pipeline::router::ModelRouter;

#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(about = "Extract text from images, PDFs and videos and analyze it with an LLM")]
#[command(version)]
pub struct Cli {
    /// Model identifier, e.g. llama-3.3-70b-versatile or gemini-pro
    pub model_id: String,

    /// general, technical or educational (anything else means general)
    pub analysis_type: String,

    /// Files to process, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Image enhancement profile: default, document or handwriting
    #[arg(long, env = "DOCENT_PROFILE", default_value = "default")]
    pub profile: String,

    /// Keep successful analyses in the session store
    #[arg(long, env = "DOCENT_STORE", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub store: bool,

    /// Ground text analysis on analyses from earlier files in this run.
    /// Implies --store.
    #[arg(long, env = "DOCENT_CONTEXT", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub context: bool,
}

impl Cli {
    pub fn request(&self) -> ProcessRequest {
        ProcessRequest {
            model_id: self.model_id.clone(),
            analysis_type: AnalysisType::from_name(&self.analysis_type),
            profile: EnhancementProfile::from_name(&self.profile),
            use_context: self.context,
            persist: self.store || self.context,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    if execute(&cli, &config) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Process every file. `false` if any file could not be read or analyzed.
pub fn execute(cli: &Cli, config: &AppConfig) -> bool {
    tracing::info!(
        files = cli.files.len(),
        model = %cli.model_id,
        "{} starting v{}",
        APP_NAME,
        APP_VERSION
    );

    let retrieval = if cli.store || cli.context {
        RetrievalContext::new(Box::new(InMemoryVectorBackend::new()))
    } else {
        RetrievalContext::unavailable()
    };
    let extractor = ContentExtractor::from_tools(&config.tools);
    let mut engine = AnalysisEngine::new(ModelRouter::from_config(config), retrieval, &config.engine);
    let mut processor = DocumentProcessor::new(&extractor, &mut engine);
    let request = cli.request();

    let progress = |p: Progress| {
        tracing::debug!(completed = p.completed, total = p.total, "Progress");
    };

    let mut all_ok = true;
    for path in &cli.files {
        let input = match MediaInput::from_path(path) {
            Ok(input) => input,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Cannot read file");
                all_ok = false;
                continue;
            }
        };

        let outcome = processor.process(&input, &request, Some(&progress));
        if !matches!(outcome.analysis, Some(AnalysisOutcome::Success(_))) {
            all_ok = false;
        }

        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!(error = %e, "Cannot serialize outcome");
                all_ok = false;
            }
        }
    }

    all_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments() {
        let cli = Cli::try_parse_from(["docent", "gemini-pro", "technical", "a.pdf", "b.png"]).unwrap();
        assert_eq!(cli.files.len(), 2);

        let request = cli.request();
        assert_eq!(request.model_id, "gemini-pro");
        assert_eq!(request.analysis_type, AnalysisType::Technical);
        assert_eq!(request.profile, EnhancementProfile::Default);
        assert!(!request.persist);
        assert!(!request.use_context);
    }

    #[test]
    fn unknown_analysis_type_means_general() {
        let cli = Cli::try_parse_from(["docent", "gemini-pro", "poetic", "a.pdf"]).unwrap();
        assert_eq!(cli.request().analysis_type, AnalysisType::General);
    }

    #[test]
    fn flags_set_profile_and_store() {
        let cli = Cli::try_parse_from([
            "docent",
            "mixtral-8x7b-32768",
            "general",
            "scan.jpg",
            "--profile",
            "handwriting",
            "--store",
            "--context",
        ])
        .unwrap();
        let request = cli.request();
        assert_eq!(request.profile, EnhancementProfile::Handwriting);
        assert!(request.persist);
        assert!(request.use_context);
    }

    #[test]
    fn context_implies_store() {
        let cli = Cli::try_parse_from(["docent", "gemini-pro", "general", "a.pdf", "--context"]).unwrap();
        let request = cli.request();
        assert!(request.use_context);
        assert!(request.persist);
    }

    #[test]
    fn files_are_required() {
        assert!(Cli::try_parse_from(["docent", "gemini-pro", "general"]).is_err());
    }

    #[test]
    fn missing_file_fails_the_run() {
        let cli = Cli::try_parse_from(["docent", "gemini-pro", "general", "/nonexistent/docent-input.pdf"])
            .unwrap();
        assert!(!execute(&cli, &AppConfig::default()));
    }
}
