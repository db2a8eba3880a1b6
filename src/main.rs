use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use fal_studio::history::History;
use fal_studio::models::{Config, GenerateInputs, DEFAULT_REFERENCE_STRENGTH};
use fal_studio::store::ImageStore;
use fal_studio::studio::Studio;
use std::num::NonZeroU16;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fal-studio")]
#[command(about = "Generate images with the fal FLUX models")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the local web form.
    Serve {
        /// Listen address. Env: FAL_STUDIO_LISTEN_ADDRESS
        #[arg(
            long,
            short,
            default_value = "127.0.0.1",
            env = "FAL_STUDIO_LISTEN_ADDRESS"
        )]
        listen_address: String,
        /// Listen port. Env: FAL_STUDIO_PORT
        #[arg(long, short, default_value = "7860", env = "FAL_STUDIO_PORT")]
        port: NonZeroU16,
    },
    /// Generate one image and print where it was saved.
    Generate {
        #[arg(long, short)]
        prompt: String,
        #[arg(long, short, default_value = "4:3")]
        aspect_ratio: String,
        /// Reference image to condition on.
        #[arg(long, short)]
        reference: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_REFERENCE_STRENGTH)]
        strength: f64,
        #[arg(long)]
        raw: bool,
        #[arg(long, allow_hyphen_values = true)]
        seed: Option<String>,
    },
    /// List stored images, newest first.
    History {
        /// Include every month, not just the current one.
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fal_studio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match args.command {
        Command::Serve {
            listen_address,
            port,
        } => {
            let studio = init_studio(&config);
            fal_studio::web::setup_server(&listen_address, port, studio).await?;
        }
        Command::Generate {
            prompt,
            aspect_ratio,
            reference,
            strength,
            raw,
            seed,
        } => {
            let studio = init_studio(&config);

            let mut inputs = GenerateInputs::new(prompt)
                .with_aspect_ratio(aspect_ratio)
                .with_raw(raw);
            if let Some(seed) = seed {
                inputs = inputs.with_seed(seed);
            }
            if let Some(path) = reference {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                inputs = inputs.with_reference(bytes, strength);
            }

            match studio.invoke(&inputs, &History::default()).await {
                Ok(history) => {
                    info!("Generation completed successfully");
                    for path in history.paths() {
                        println!("{}", path);
                    }
                }
                Err(e) => {
                    error!("Generation failed: {}", e);
                    eprintln!("{}", e.user_message());
                    std::process::exit(1);
                }
            }
        }
        Command::History { all } => {
            let store = ImageStore::new(&config.output_dir);
            let paths = if all {
                store.list_all()?
            } else {
                let partition = store
                    .root()
                    .join(ImageStore::partition_key(Local::now().date_naive()));
                store.list_existing(&partition)?
            };
            for path in paths {
                println!("{}", path);
            }
        }
    }

    Ok(())
}

fn init_studio(config: &Config) -> Studio {
    match Studio::from_config(config) {
        Ok(studio) => studio,
        Err(e) => {
            error!("Failed to initialize studio: {}", e);
            std::process::exit(1);
        }
    }
}
