//! ollamactl - command-line entry point
//!
//! Thin adapter over the client library: argument parsing, config loading,
//! and a stdout render sink. All operation logic lives in the library.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ollamactl::types::{
    ChatRequest, CreateModelRequest, EmbeddingsRequest, FormatSpec, GenerateRequest, Message,
    ModelOptions, encode_image,
};
use ollamactl::{Client, ClientConfig};

#[derive(Parser, Debug)]
#[command(name = "ollamactl")]
#[command(about = "Ollama API client", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the server base URL
    #[arg(long)]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show server version
    Version,

    /// Generate a completion
    Generate {
        /// Prompt text
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,

        /// System prompt override
        #[arg(long)]
        system: Option<String>,

        /// Prompt template override
        #[arg(long)]
        template: Option<String>,

        /// Constrain output to JSON
        #[arg(long)]
        json: bool,

        /// Constrain output to a JSON schema read from a file
        #[arg(long, conflicts_with = "json")]
        schema: Option<PathBuf>,

        /// Bypass prompt templating
        #[arg(long)]
        raw: bool,

        /// Attach an image file (repeatable)
        #[arg(long)]
        image: Vec<PathBuf>,

        #[arg(long)]
        temperature: Option<f64>,

        #[arg(long)]
        top_p: Option<f64>,

        #[arg(long)]
        top_k: Option<u32>,

        #[arg(long)]
        seed: Option<i64>,

        #[arg(long)]
        num_predict: Option<i64>,

        /// Model residency after the request (e.g. "5m", "0")
        #[arg(long)]
        keep_alive: Option<String>,

        /// Wait for the full response instead of streaming
        #[arg(long)]
        no_stream: bool,
    },

    /// Chat with a model
    Chat {
        /// User message
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,

        /// System message prepended to the conversation
        #[arg(long)]
        system: Option<String>,

        /// Constrain output to JSON
        #[arg(long)]
        json: bool,

        #[arg(long)]
        temperature: Option<f64>,

        /// Wait for the full response instead of streaming
        #[arg(long)]
        no_stream: bool,
    },

    /// Generate embeddings for a prompt
    Embed {
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,
    },

    /// List models
    Models {
        /// List running models instead of installed ones
        #[arg(long)]
        running: bool,
    },

    /// Show model information
    Show {
        name: String,

        #[arg(long)]
        verbose: bool,
    },

    /// Create a model
    Create {
        name: String,

        /// Base model to build from
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        system: Option<String>,

        #[arg(long)]
        template: Option<String>,

        /// Quantization hint (e.g. "q4_K_M")
        #[arg(long)]
        quantize: Option<String>,

        /// Attach a local file as NAME=PATH (repeatable); uploaded as a
        /// content-addressed blob before the create request is sent
        #[arg(long = "file", value_parser = parse_file_arg)]
        files: Vec<(String, PathBuf)>,
    },

    /// Copy a model
    Copy { source: String, destination: String },

    /// Delete a model
    Delete { name: String },

    /// Pull a model from a registry
    Pull {
        name: String,

        #[arg(long)]
        no_stream: bool,
    },

    /// Push a model to a registry
    Push {
        name: String,

        #[arg(long)]
        no_stream: bool,
    },
}

fn parse_file_arg(raw: &str) -> std::result::Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err("expected NAME=PATH".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
    }

    // Load configuration
    let mut config = ClientConfig::load(cli.config)?;

    // CLI overrides
    if let Some(host) = cli.host {
        config.base_url = host;
    }

    config.validate()?;

    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    let client = Client::from_config(&config)?;
    run(cli.command, &client, &config).await
}

/// Render sink: fragments go to stdout in arrival order, flushed per
/// record so partial lines appear as they stream in.
fn stdout_sink() -> impl FnMut(&str) {
    |fragment: &str| {
        print!("{fragment}");
        let _ = std::io::stdout().flush();
    }
}

fn resolve_model(explicit: Option<String>, config: &ClientConfig) -> Result<String> {
    explicit
        .or_else(|| config.default_model.clone())
        .context("no model given and no default_model configured")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Command, client: &Client, config: &ClientConfig) -> Result<()> {
    match command {
        Command::Version => {
            let version = client.version().await?;
            println!("{}", version.version);
        }

        Command::Generate {
            prompt,
            model,
            system,
            template,
            json,
            schema,
            raw,
            image,
            temperature,
            top_p,
            top_k,
            seed,
            num_predict,
            keep_alive,
            no_stream,
        } => {
            let model = resolve_model(model, config)?;

            let format = if json {
                Some(FormatSpec::Name("json".to_string()))
            } else if let Some(path) = schema {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read schema file: {:?}", path))?;
                Some(FormatSpec::Schema(
                    serde_json::from_str(&content).context("Failed to parse schema JSON")?,
                ))
            } else {
                None
            };

            let mut images = Vec::new();
            for path in &image {
                images.push(
                    encode_image(path)
                        .await
                        .with_context(|| format!("Failed to read image: {:?}", path))?,
                );
            }

            let options = ModelOptions {
                temperature,
                top_p,
                top_k,
                seed,
                num_predict,
                keep_alive,
            };

            let request = GenerateRequest {
                model,
                prompt,
                system,
                template,
                format,
                context: None,
                raw,
                images: (!images.is_empty()).then_some(images),
                stream: !no_stream,
                options: (!options.is_empty()).then_some(options),
            };

            if no_stream {
                let response = client.generate(&request).await?;
                print_json(&response)?;
            } else {
                let summary = client.generate_stream(&request, stdout_sink()).await?;
                println!();
                tracing::debug!(records = summary.records, "generate stream finished");
            }
        }

        Command::Chat {
            prompt,
            model,
            system,
            json,
            temperature,
            no_stream,
        } => {
            let model = resolve_model(model, config)?;

            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));

            let options = ModelOptions {
                temperature,
                ..Default::default()
            };

            let request = ChatRequest {
                model,
                messages,
                stream: !no_stream,
                format: json.then(|| FormatSpec::Name("json".to_string())),
                options: (!options.is_empty()).then_some(options),
            };

            if no_stream {
                let response = client.chat(&request).await?;
                print_json(&response)?;
            } else {
                let summary = client.chat_stream(&request, stdout_sink()).await?;
                println!();
                tracing::debug!(records = summary.records, "chat stream finished");
            }
        }

        Command::Embed { prompt, model } => {
            let model = resolve_model(model, config)?;
            let response = client.embeddings(&EmbeddingsRequest { model, prompt }).await?;
            print_json(&response)?;
        }

        Command::Models { running } => {
            let list = if running {
                client.list_running().await?
            } else {
                client.list_models().await?
            };
            print_json(&list)?;
        }

        Command::Show { name, verbose } => {
            let info = client.show_model(&name, verbose).await?;
            print_json(&info)?;
        }

        Command::Create {
            name,
            from,
            system,
            template,
            quantize,
            files,
        } => {
            let request = CreateModelRequest {
                model: name,
                from_model: from,
                system,
                template,
                quantize,
                files: None,
                stream: true,
            };
            let summary = client.create_model(&request, &files, stdout_sink()).await?;
            tracing::debug!(records = summary.records, "model creation finished");
        }

        Command::Copy {
            source,
            destination,
        } => {
            let result = client.copy_model(&source, &destination).await?;
            print_json(&result)?;
        }

        Command::Delete { name } => {
            let result = client.delete_model(&name).await?;
            print_json(&result)?;
        }

        Command::Pull { name, no_stream } => {
            if no_stream {
                let result = client.pull_model(&name).await?;
                print_json(&result)?;
            } else {
                client.pull_model_stream(&name, stdout_sink()).await?;
            }
        }

        Command::Push { name, no_stream } => {
            if no_stream {
                let result = client.push_model(&name).await?;
                print_json(&result)?;
            } else {
                client.push_model_stream(&name, stdout_sink()).await?;
            }
        }
    }

    Ok(())
}
