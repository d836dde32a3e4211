//! cognia-assess: run the risk pipeline for one assessment document
//!
//! Reads a YAML document describing the assessment (scores, health profile,
//! sample recordings), runs the full pipeline, and prints the prediction
//! plus feature bundle as JSON on stdout.
//!
//! Usage:
//!   cognia-assess [--config <config.yaml>] <assessment.yaml>

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use cognia_core::config::{load_config, Config};
use cognia_core::domain::{Assessment, UserHealthProfile};
use cognia_pipeline::PipelineManager;

/// Input document: the assessment plus the subject's health profile.
#[derive(Debug, Deserialize)]
struct AssessmentDocument {
    assessment: Assessment,
    #[serde(default)]
    profile: UserHealthProfile,
}

fn main() -> Result<()> {
    env_logger::init();

    let mut config_path: Option<PathBuf> = None;
    let mut input_path: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                eprintln!("Usage: cognia-assess [--config <config.yaml>] <assessment.yaml>");
                return Ok(());
            }
            _ if input_path.is_none() => input_path = Some(PathBuf::from(arg)),
            other => bail!("unexpected argument: {other}"),
        }
    }

    let Some(input_path) = input_path else {
        bail!("missing assessment document; usage: cognia-assess [--config <config.yaml>] <assessment.yaml>");
    };

    let config = match &config_path {
        Some(path) => load_config(path),
        None => Config::default(),
    };

    let contents = std::fs::read_to_string(&input_path)
        .with_context(|| format!("failed to read {}", input_path.display()))?;
    let document: AssessmentDocument = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse {}", input_path.display()))?;

    log::info!(
        "processing assessment with {} speech sample(s)",
        document.assessment.samples.len()
    );

    let pipeline = PipelineManager::from_config(&config);
    let outcome = pipeline
        .process(&document.assessment, &document.profile)
        .context("assessment rejected")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
