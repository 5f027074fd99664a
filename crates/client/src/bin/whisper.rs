use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{render_table, ExtractionClient, HttpBoundary};
use extract::prompt::build_prompt;
use fields::{ExtractField, FieldRegistry, FileStore, KeyValueStore, MemoryStore, Model, SettingsStore, TieredStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "whisper")]
#[command(author, version, about = "Extract company information from websites using AI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extraction service endpoint
    #[arg(long, global = true, env = "WHISPER_ENDPOINT", default_value = "http://localhost:3000/extract-info")]
    endpoint: String,

    /// Directory holding custom fields and preferences
    #[arg(long, global = true, env = "WHISPER_DATA_DIR", default_value = ".whisper")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the active fields for one or more websites
    Extract {
        #[arg(value_name = "WEBSITE", required = true)]
        websites: Vec<String>,

        /// Use this prompt instead of the saved one or the generated template
        #[arg(long)]
        prompt: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage extraction fields
    Fields {
        #[command(subcommand)]
        action: FieldsAction,
    },

    /// Show or change the saved prompt
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },

    /// Show or change the model preference
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum FieldsAction {
    List,
    Add { name: String },
    Remove { id: String },
}

#[derive(Subcommand)]
enum PromptAction {
    Show {
        /// Render the template for this website
        #[arg(long, default_value = "example.com")]
        website: String,
    },
    Set { text: String },
    Reset,
}

#[derive(Subcommand)]
enum ModelAction {
    Show,
    Set { model: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store: Arc<dyn KeyValueStore> = Arc::new(TieredStore::new(
        Arc::new(FileStore::new(&cli.data_dir)),
        Arc::new(MemoryStore::new()),
    ));
    let registry = FieldRegistry::new(store.clone());
    let settings = SettingsStore::new(store);

    match cli.command {
        Commands::Extract { websites, prompt, json } => {
            let preferences = settings.load().await.context("Failed to load settings")?;
            let fields = registry.list_fields().await;
            let custom_prompt = prompt.or(preferences.custom_prompt);

            let client = ExtractionClient::new(Arc::new(HttpBoundary::new(cli.endpoint)))
                .with_model(preferences.model);
            let outcome = client
                .extract_bulk(&websites, &fields, custom_prompt.as_deref())
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            } else {
                for data in &outcome.results {
                    println!("{}", render_table(data, &fields));
                }
            }

            if let Some(error) = outcome.aggregate_error() {
                eprintln!("Failed to extract information: {}", error);
                if outcome.results.is_empty() {
                    std::process::exit(1);
                }
            }
        }
        Commands::Fields { action } => match action {
            FieldsAction::List => {
                for field in registry.list_fields().await {
                    let marker = if field.is_default() { "default" } else { "custom" };
                    println!("{:<40} {:<8} {}", field.id, marker, field.name);
                }
            }
            FieldsAction::Add { name } => {
                let field = ExtractField::custom(&name)?;
                println!("Added field: {} ({})", field.name, field.id);
                registry.add_field(field).await;
            }
            FieldsAction::Remove { id } => {
                registry.remove_field(&id).await;
                println!("Removed field: {}", id);
            }
        },
        Commands::Prompt { action } => match action {
            PromptAction::Show { website } => {
                let preferences = settings.load().await?;
                match preferences.custom_prompt {
                    Some(prompt) => println!("{}", prompt),
                    None => {
                        let fields = registry.list_fields().await;
                        println!("{}", build_prompt(&website, &fields));
                    }
                }
            }
            PromptAction::Set { text } => {
                settings.save_custom_prompt(&text).await?;
                println!("Custom prompt saved");
            }
            PromptAction::Reset => {
                settings.reset_custom_prompt().await?;
                println!("Prompt reset to default");
            }
        },
        Commands::Model { action } => match action {
            ModelAction::Show => {
                println!("{}", settings.load().await?.model);
            }
            ModelAction::Set { model } => {
                let model: Model = model.parse()?;
                settings.set_model(model).await?;
                println!("Model changed to {}", model);
            }
        },
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("whisper=debug,client=debug,fields=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
