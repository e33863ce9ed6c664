//! jobpilot: scrape job postings, filter them with an LLM, apply to the matches

use clap::Parser;
use jobpilot::apply::{ApplicationDispatcher, BrowserUseDispatcher, DryRunDispatcher};
use jobpilot::cli::{self, Cli, Commands, ConfigAction};
use jobpilot::input::PreferenceStore;
use jobpilot::jobs::{JobSource, JsonFileSource, ScrapeServiceSource};
use jobpilot::llm::{Classifier, ClassifierSettings, GeminiClient};
use jobpilot::output::{formatter_for, OutputFormatter};
use jobpilot::pipeline::{Pipeline, RunOptions};
use jobpilot::server::{self, CronState};
use jobpilot::{Config, JobPilotError, Result};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Run {
            jobs_file,
            results_per_search,
            dry_run,
            no_wait,
            detailed,
            output,
        } => {
            let format = cli::parse_output_format(&output).map_err(JobPilotError::InvalidInput)?;
            let source = build_source(&config, jobs_file, results_per_search)?;
            let pipeline = build_pipeline(&config, source, dry_run).await?;

            let report = pipeline.run(RunOptions { wait: !no_wait }).await?;
            println!("{}", formatter_for(format, true, detailed).format_report(&report)?);
        }

        Commands::Classify {
            jobs_file,
            detailed,
            output,
        } => {
            let format = cli::parse_output_format(&output).map_err(JobPilotError::InvalidInput)?;
            cli::validate_file_extension(&jobs_file, &["json"]).map_err(JobPilotError::InvalidInput)?;

            let preferences = PreferenceStore::from_config(&config.preferences).load().await?;
            let jobs = JsonFileSource::new(jobs_file).fetch_jobs().await?;
            let classifier = build_classifier(&config)?;

            let outcome = classifier.classify_detailed(&jobs, &preferences).await?;
            println!(
                "{}",
                formatter_for(format, true, detailed).format_classification(&outcome, jobs.len())?
            );
        }

        Commands::Serve { bind, dry_run } => {
            let source = build_source(&config, None, None)?;
            let pipeline = build_pipeline(&config, source, dry_run).await?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());

            let secret = config.cron_secret();
            if secret.is_none() {
                info!("{} is not set; /api/cron accepts any caller", config.server.cron_secret_env);
            }
            server::serve(&bind, CronState::new(pipeline, secret)).await?;
        }

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("⚙️  Current Configuration ({})\n", config_path.display());
                let text = toml::to_string_pretty(&config)
                    .map_err(|e| JobPilotError::Configuration(format!("Failed to serialize config: {}", e)))?;
                println!("{}", text);
            }

            Some(ConfigAction::Reset) => {
                println!("🔄 Resetting configuration to defaults...");
                Config::default().save_to(config_path)?;
                println!("✅ Configuration reset successfully!");
            }

            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}

fn build_source(
    config: &Config,
    jobs_file: Option<PathBuf>,
    results_per_search: Option<usize>,
) -> Result<Arc<dyn JobSource>> {
    if let Some(path) = jobs_file {
        cli::validate_file_extension(&path, &["json"]).map_err(JobPilotError::InvalidInput)?;
        return Ok(Arc::new(JsonFileSource::new(path)));
    }
    let mut source = ScrapeServiceSource::new(config.scrape.clone())?;
    if let Some(results) = results_per_search {
        source = source.with_results_per_search(results);
    }
    Ok(Arc::new(source))
}

fn build_classifier(config: &Config) -> Result<Classifier> {
    let client = GeminiClient::from_config(&config.model)?;
    let settings = ClassifierSettings::from_config(&config.model.model, &config.classifier);
    Ok(Classifier::new(Arc::new(client), settings))
}

/// Resolves every credential up front so a misconfigured run fails before scraping.
async fn build_pipeline(config: &Config, source: Arc<dyn JobSource>, dry_run: bool) -> Result<Pipeline> {
    let preferences = PreferenceStore::from_config(&config.preferences).load().await?;
    let classifier = build_classifier(config)?;
    let dispatcher: Arc<dyn ApplicationDispatcher> = if dry_run {
        Arc::new(DryRunDispatcher)
    } else {
        Arc::new(BrowserUseDispatcher::from_config(&config.apply)?)
    };
    Pipeline::new(source, classifier, dispatcher, preferences)
}
