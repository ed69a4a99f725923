use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rollcall_core::{MatchOutcome, NoMatchReason, Query, Signature};
use rollcall_service::{spawn_engine, Config};
use rollcall_store::{NewRecord, RosterStore};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall face-signature identification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new identity from an extracted face signature
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Roll number or other external identifier
        #[arg(short, long)]
        roll_number: Option<String>,
        /// Thumbnail / picture reference carried as metadata
        #[arg(short, long)]
        picture: Option<String>,
        /// JSON file with the primary face signature
        #[arg(short, long)]
        signature: PathBuf,
        /// JSON file with auxiliary appearance features
        #[arg(short, long)]
        features: Option<PathBuf>,
    },
    /// Identify a face signature against the roster
    Identify {
        /// JSON file with the primary face signature
        #[arg(short, long)]
        signature: PathBuf,
        /// JSON file with auxiliary appearance features
        #[arg(short, long)]
        features: Option<PathBuf>,
    },
    /// List registered identities
    List,
    /// Show one identity (signatures redacted)
    Show {
        /// Identity id
        id: String,
    },
    /// Remove an identity by id
    Remove {
        /// Identity id
        id: String,
    },
    /// Show roster status
    Status,
}

/// Read a signature vector from a JSON file. Accepts either a bare array
/// `[0.1, ...]` or an object `{"values": [0.1, ...]}`.
fn read_signature(path: &Path) -> Result<Signature> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", path.display()))?;

    let values: Vec<f32> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(mut map) => {
            let inner = map.remove("values").with_context(|| {
                format!("{}: object form requires a \"values\" field", path.display())
            })?;
            serde_json::from_value(inner)?
        }
        _ => anyhow::bail!(
            "{}: expected a JSON array or an object with a \"values\" field",
            path.display()
        ),
    };
    Ok(Signature::new(values))
}

fn attribute(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("-")
        .to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let store = RosterStore::open(&config.db_path)
        .with_context(|| format!("opening roster at {}", config.db_path.display()))?;
    let engine = spawn_engine(store, config.match_threshold);

    match cli.command {
        Commands::Register {
            name,
            roll_number,
            picture,
            signature,
            features,
        } => {
            let primary = read_signature(&signature)?;
            let secondary = features.as_deref().map(read_signature).transpose()?;

            let mut attributes = serde_json::Map::new();
            attributes.insert("name".into(), name.into());
            if let Some(roll_number) = roll_number {
                attributes.insert("roll_number".into(), roll_number.into());
            }
            if let Some(picture) = picture {
                attributes.insert("picture".into(), picture.into());
            }

            let profile = engine
                .register(NewRecord {
                    attributes: serde_json::Value::Object(attributes),
                    primary,
                    secondary,
                })
                .await?;
            println!("registered {}", profile.id);
        }
        Commands::Identify {
            signature,
            features,
        } => {
            let mut query = Query::new(read_signature(&signature)?);
            if let Some(features) = features.as_deref() {
                query = query.with_secondary(read_signature(features)?);
            }

            match engine.identify(query).await? {
                MatchOutcome::Match { profile, score } => {
                    println!(
                        "identified: {} ({}) score {score:.4}",
                        attribute(&profile.attributes, "name"),
                        profile.id
                    );
                }
                MatchOutcome::NoMatch {
                    reason: NoMatchReason::NoCandidates,
                } => println!("no identities registered"),
                MatchOutcome::NoMatch {
                    reason: NoMatchReason::AboveThreshold { best_score },
                } => println!("no match found (best score {best_score:.4})"),
            }
        }
        Commands::List => {
            let profiles = engine.list().await?;
            if profiles.is_empty() {
                println!("no identities registered");
            }
            for profile in profiles {
                println!(
                    "{}  {}  {}",
                    profile.id,
                    attribute(&profile.attributes, "name"),
                    attribute(&profile.attributes, "roll_number"),
                );
            }
        }
        Commands::Show { id } => match engine.profile(id).await? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => {
                println!("not found");
                std::process::exit(1);
            }
        },
        Commands::Remove { id } => {
            if engine.remove(id).await? {
                println!("removed");
            } else {
                println!("not found");
                std::process::exit(1);
            }
        }
        Commands::Status => {
            println!("db: {}", config.db_path.display());
            println!("records: {}", engine.count().await?);
            println!("threshold: {}", config.match_threshold);
        }
    }

    Ok(())
}
