//! rspersona 命令行工具：对 JSON 文件执行个性化、禁忌检查与规则校验

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rspersona::{
    check_contraindications, ConfigManager, EngineConfig, FeatureVector, PersonalizationEngine, Supplement,
    UserResponses,
};

#[derive(Debug, Parser)]
#[command(name = "rspersona", version, about = "Personalization rule & scoring engine")]
struct Cli {
    /// 输出调试日志（RUST_LOG 优先）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate a feature vector against a persona and print the report
    Evaluate {
        /// Persona id or alias (e.g. traveler)
        #[arg(short, long)]
        persona: String,
        /// JSON file with the feature vector
        #[arg(short, long)]
        features: PathBuf,
        #[command(flatten)]
        rules: RuleArgs,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Run the contraindication pass over a supplement list
    Safety {
        /// JSON file with the user's medical disclosures
        #[arg(short, long)]
        responses: PathBuf,
        /// JSON file with the supplement list
        #[arg(short, long)]
        supplements: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Load and validate a rule bundle, then print a summary
    Validate {
        #[command(flatten)]
        rules: RuleArgs,
    },
}

#[derive(Debug, Args)]
struct RuleArgs {
    /// Rules directory (defaults to the embedded bundle)
    #[arg(long)]
    rules_dir: Option<PathBuf>,
    /// MessagePack snapshot path
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Pin a ruleset version, as persona=version (repeatable)
    #[arg(long = "pin", value_name = "PERSONA=VERSION")]
    pins: Vec<String>,
}

impl RuleArgs {
    fn to_config(&self, verbose: bool) -> Result<EngineConfig> {
        let mut builder = ConfigManager::custom().verbose(verbose);
        if let Some(dir) = &self.rules_dir {
            builder = builder.rules_dir(dir);
        }
        if let Some(cache) = &self.cache {
            builder = builder.cache_path(cache);
        }
        for pin in &self.pins {
            let Some((persona, version)) = pin.split_once('=') else {
                bail!("invalid --pin `{}`, expected PERSONA=VERSION", pin);
            };
            builder = builder.pin_version(persona.trim(), version.trim());
        }
        Ok(builder.build())
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "rspersona=debug" } else { "rspersona=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Evaluate { persona, features, rules, pretty } => {
            let config = rules.to_config(cli.verbose)?;
            let engine = PersonalizationEngine::new(config).await.context("failed to load rules")?;
            let features: FeatureVector = read_json(&features).await?;
            let report = engine.personalize(&persona, &features);
            if report.persona.is_none() {
                info!("persona `{}` is unknown, the report is empty", persona);
            }
            print_json(&report, pretty)?;
        }
        Command::Safety { responses, supplements, pretty } => {
            let responses: UserResponses = read_json(&responses).await?;
            let supplements: Vec<Supplement> = read_json(&supplements).await?;
            print_json(&check_contraindications(&responses, &supplements), pretty)?;
        }
        Command::Validate { rules } => {
            let config = rules.to_config(cli.verbose)?;
            let engine = PersonalizationEngine::new(config).await.context("rule bundle is invalid")?;
            let registry = engine.registry();
            println!("features: {}", engine.catalog().len());
            for persona in registry.personas() {
                let active = registry
                    .active_ruleset(persona.as_str())
                    .map(|r| format!("{} ({} rules)", r.version, r.len()))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "persona {}: versions [{}], active {}",
                    persona,
                    registry.versions(persona.as_str()).join(", "),
                    active
                );
            }
            println!("ok");
        }
    }
    Ok(())
}
