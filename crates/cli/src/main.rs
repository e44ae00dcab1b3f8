use clap::{Parser, Subcommand};
use fhir::BundleBuilder;
use intake_core::code_systems::CodeSystemKey;
use intake_core::config::resolve_reference_data_dir;
use intake_core::constants::REFERENCE_DATA_DIR_ENV;
use intake_core::{AnswerTree, IntakeConfig, NotificationEngine};
use intake_uuid::{RandomIdSource, SequentialIdSource};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Questionnaire notification intake CLI")]
struct Cli {
    /// Directory holding the code-system tables (overrides INTAKE_REFERENCE_DATA_DIR)
    #[arg(long, global = true)]
    reference_data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an answer tree JSON file and print the resulting bundle
    Convert {
        /// Path to the answer tree JSON file
        file: PathBuf,
        /// Number resources 1, 2, 3, ... instead of using random UUIDs
        #[arg(long)]
        sequential_ids: bool,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// List the loaded code-system tables
    Codes {
        /// Only list this table (e.g. address-use)
        table: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.reference_data_dir)?;
    let engine = NotificationEngine::new(&config)?;

    match cli.command {
        Commands::Convert {
            file,
            sequential_ids,
            compact,
        } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
            let tree = AnswerTree::from_json(&text)?;

            let mut bundle = BundleBuilder::new();
            if sequential_ids {
                engine.convert_with_ids(&tree, &mut bundle, &mut SequentialIdSource::new())?;
            } else {
                engine.convert_with_ids(&tree, &mut bundle, &mut RandomIdSource)?;
            }

            if compact {
                println!("{}", bundle.to_json()?);
            } else {
                println!("{}", bundle.to_json_pretty()?);
            }
        }
        Commands::Codes { table } => {
            let keys = match table {
                Some(name) => vec![CodeSystemKey::parse(&name)
                    .ok_or_else(|| anyhow::anyhow!("unknown code system '{name}'"))?],
                None => CodeSystemKey::ALL.to_vec(),
            };
            for key in keys {
                let table = engine.code_systems().table(key);
                println!("{} ({})", key.as_str(), table.system());
                for (code, display) in table.concepts() {
                    println!("  {code}: {display}");
                }
            }
        }
    }

    Ok(())
}

/// Resolve reference data from the command line, then the environment, then the workspace.
fn load_config(flag: Option<PathBuf>) -> anyhow::Result<IntakeConfig> {
    let override_dir =
        flag.or_else(|| std::env::var_os(REFERENCE_DATA_DIR_ENV).map(PathBuf::from));
    match resolve_reference_data_dir(override_dir)? {
        Some(dir) => {
            tracing::info!("++ Using reference data from {}", dir.display());
            Ok(IntakeConfig::with_reference_data_dir(dir)?)
        }
        None => Ok(IntakeConfig::bundled()),
    }
}
