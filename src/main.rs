//! Ark Bridge CLI
//!
//! A command-line host for the bridge with REPL support.

use anyhow::Result;
use ark_bridge::{
    drive, make_media_input, ArkBridge, BridgeConfig, ChatEvent, ChatRequest, ChatView,
    FunctionRegistry, History, ModelParams, Telemetry,
};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build configuration from CLI args
/// Priority: CLI flags > environment > config file > auth.json
fn build_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::load(cli.config.as_deref())?;

    if let Some(ref api_key) = cli.api_key {
        config = config.with_api_key(api_key);
    }
    if let Some(ref base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(ref model) = cli.default_model {
        config = config.with_default_model(model);
    }

    Ok(config)
}

#[derive(Parser)]
#[command(name = "ark-bridge")]
#[command(about = "Ark Bridge - chat with a Volcengine Ark model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model id per request ("volcengine" uses the default model)
    #[arg(short, long, default_value = ark_bridge::MODEL_SENTINEL)]
    model: String,

    /// Default model (endpoint) id - overrides ARK_API_ID
    #[arg(long)]
    default_model: Option<String>,

    /// Base URL for the API - overrides ARK_API_URL
    #[arg(long)]
    base_url: Option<String>,

    /// API key - overrides ARK_API_KEY and auth.json
    #[arg(long)]
    api_key: Option<String>,

    /// System prompt
    #[arg(short, long, default_value = "")]
    system: String,

    /// Sampling temperature
    #[arg(long, default_value_t = ark_bridge::config::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Maximum output tokens
    #[arg(long, default_value_t = ark_bridge::config::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Extra additional functions (YAML list)
    #[arg(long)]
    functions: Option<PathBuf>,

    /// Data directory (default: the platform data dir, e.g. ~/.local/share/ark-bridge)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive REPL session
    Repl,

    /// Send a single prompt
    Prompt {
        /// The prompt to send
        message: String,

        /// Use the blocking call instead of streaming
        #[arg(long)]
        no_stream: bool,

        /// Additional function to apply to the prompt
        #[arg(short, long)]
        function: Option<String>,

        /// Images to attach to the prompt
        #[arg(long)]
        image: Vec<PathBuf>,
    },

    /// Show recent chat log entries
    Log {
        /// Maximum number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List additional functions
    Functions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(ark_bridge::config::data_dir);
    let telemetry = Telemetry::init(data_dir.clone(), cli.verbose)?;

    let config = build_config(&cli)?;

    let mut functions = FunctionRegistry::builtin();
    if let Some(ref path) = cli.functions {
        let count = functions.load_yaml(path)?;
        tracing::info!(path = %path.display(), count, "Loaded additional functions");
    }

    let params = ModelParams::default()
        .with_model(cli.model.clone())
        .with_temperature(cli.temperature)
        .with_max_tokens(cli.max_tokens);

    match cli.command {
        Some(Commands::Functions) => {
            for name in functions.names() {
                println!("{}", name);
            }
        }
        Some(Commands::Log { limit, json }) => {
            show_log(&telemetry, limit, json)?;
        }
        command => {
            let bridge = Arc::new(
                ArkBridge::new(config)?
                    .with_chat_log(telemetry.chat_log())
                    .with_preprocessor(Arc::new(functions)),
            );

            match command {
                Some(Commands::Prompt {
                    message,
                    no_stream,
                    function,
                    image,
                }) => {
                    let mut request = ChatRequest::new(make_media_input(&message, &image))
                        .with_params(params)
                        .with_system_prompt(cli.system.clone());
                    if let Some(function) = function {
                        request = request.with_additional_fn(function);
                    }
                    run_single_prompt(bridge, request, no_stream).await;
                }
                _ => {
                    run_repl(bridge, params, &cli.system, &data_dir).await?;
                }
            }
        }
    }

    Ok(())
}

fn show_log(telemetry: &Telemetry, limit: usize, json: bool) -> Result<()> {
    let chat_log = telemetry.chat_log();
    let entries = chat_log.recent(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Chat log: {}\n", chat_log.path().display());
    if entries.is_empty() {
        println!("  No entries found.");
    }
    for entry in entries {
        println!(
            "{} | {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.model
        );
        println!("  > {}", entry.input);
        println!("  < {}", entry.output);
    }
    Ok(())
}

/// Print streamed output as it arrives
fn render(event: &ChatEvent) {
    match event {
        ChatEvent::Delta { delta, .. } => {
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        }
        ChatEvent::InputRewritten { input } => println!("[rewritten] {}\n", input),
        ChatEvent::Notice { message } | ChatEvent::Error { message } => {
            println!("{}", message)
        }
        ChatEvent::TurnComplete { .. } => println!(),
        ChatEvent::TurnStart { .. } => {}
    }
}

async fn run_single_prompt(bridge: Arc<ArkBridge>, request: ChatRequest, no_stream: bool) {
    if no_stream {
        let reply = bridge.complete(request, None, false).await;
        println!("{}", reply);
        return;
    }

    let mut view = ChatView::new();
    drive(bridge, request, &mut view, |_, event| render(event)).await;
}

async fn run_repl(
    bridge: Arc<ArkBridge>,
    params: ModelParams,
    system_prompt: &str,
    data_dir: &Path,
) -> Result<()> {
    println!("Ark Bridge REPL");
    println!("Base URL: {}", bridge.config().base_url);
    if !bridge.validate_key() {
        println!("Warning: ARK_API_KEY is not configured");
    }
    println!();
    print_help();

    let mut rl = DefaultEditor::new()?;
    let history_path = data_dir.join("history.txt");

    let _ = rl.load_history(&history_path);

    let mut view = ChatView::new();
    let mut history = History::new();
    let mut pending_function: Option<String> = None;

    loop {
        let prompt = if history.is_empty() {
            "ark> "
        } else {
            "ark>> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                if line.starts_with('/') {
                    let parts: Vec<&str> = line.splitn(2, ' ').collect();
                    let cmd = parts[0];
                    let arg = parts.get(1).map(|s| s.trim());

                    match cmd {
                        "/quit" | "/exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        "/clear" => {
                            history.clear();
                            view = ChatView::new();
                            println!("Chat history cleared.");
                        }
                        "/fn" => match arg {
                            Some(name) => {
                                pending_function = Some(name.to_string());
                                println!("Next message uses '{}'.", name);
                            }
                            None => println!("Usage: /fn <name>"),
                        },
                        "/help" => print_help(),
                        _ => println!("Unknown command: {}", cmd),
                    }
                    continue;
                }

                println!();
                let mut request = ChatRequest::new(line)
                    .with_params(params.clone())
                    .with_history(history.clone())
                    .with_system_prompt(system_prompt);
                if let Some(function) = pending_function.take() {
                    request = request.with_additional_fn(function);
                }

                let outcome = drive(bridge.clone(), request, &mut view, |_, event| {
                    render(event)
                })
                .await;
                history = outcome.history;
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /quit, /exit  - Exit the REPL");
    println!("  /clear        - Clear chat history");
    println!("  /fn <name>    - Apply an additional function to the next message");
    println!("  /help         - Show this help");
    println!();
}
