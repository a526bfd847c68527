use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use banana_contracts::catalog::{AspectRatio, StyleCatalog};
use banana_contracts::chat::{parse_intent, Role, CHAT_HELP_COMMANDS};
use banana_contracts::history::{FileSnapshotStorage, HistoryEntry, HistoryStore, SourceFlow};
use banana_contracts::locale::{
    CONVERSATION_FAILURE_MESSAGE, EMPTY_HISTORY_MESSAGE, IMAGE_FAILURE_MESSAGE,
};
use banana_engine::attachment::read_attachment;
use banana_engine::{
    ConversationOutcome, GenerationClient, ImageOutcome, ImageRequestController, Studio,
    StudioConfig, SubmitRejected,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "banana", version, about = "Nano Banana prompt architect and wallpaper studio")]
struct Cli {
    /// Log at debug level regardless of BANANA_LOG.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive prompt-refinement chat.
    Chat(ChatArgs),
    /// Generate one wallpaper and save it.
    Image(ImageArgs),
    #[command(subcommand)]
    History(HistoryCommand),
    /// List the style presets.
    Styles,
    /// List the selectable aspect ratios.
    Ratios,
}

#[derive(Debug, Args)]
struct ModelArgs {
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    image_model: Option<String>,
}

#[derive(Debug, Args)]
struct ChatArgs {
    #[command(flatten)]
    models: ModelArgs,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    ratio: Option<AspectRatio>,
}

#[derive(Debug, Args)]
struct ImageArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value = "9:16")]
    ratio: AspectRatio,
    /// Directory to write the image into; defaults to BANANA_EXPORT_DIR.
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    models: ModelArgs,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// Print saved entries, newest first.
    List {
        #[arg(long)]
        json: bool,
    },
    Show {
        id: String,
    },
    Clear,
}

const LOG_ENV: &str = "BANANA_LOG";
const PREVIEW_MAX_CHARS: usize = 80;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("banana error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = StudioConfig::from_env()?;
    match cli.command {
        Command::Chat(args) => {
            run_chat(config, args)?;
            Ok(0)
        }
        Command::Image(args) => run_image(config, args),
        Command::History(command) => run_history(config, command),
        Command::Styles => {
            print_styles(&StyleCatalog::default());
            Ok(0)
        }
        Command::Ratios => {
            print_ratios();
            Ok(0)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn apply_models(config: &mut StudioConfig, models: ModelArgs) {
    if let Some(model) = models.text_model {
        config.text_model = model;
    }
    if let Some(model) = models.image_model {
        config.image_model = model;
    }
}

fn run_chat(mut config: StudioConfig, args: ChatArgs) -> Result<()> {
    apply_models(&mut config, args.models);
    let mut studio = Studio::open(config);
    if let Some(style) = args.style.as_deref() {
        let selection = studio.conversation_mut().select_style(style);
        if let Some(reason) = selection.fallback_reason {
            println!("{reason}");
        }
    }
    if let Some(ratio) = args.ratio {
        studio.conversation_mut().select_aspect_ratio(ratio);
        studio.image_mut().select_aspect_ratio(ratio);
    }

    if let Some(welcome) = studio.conversation().transcript().last() {
        println!("{}", welcome.text);
    }
    println!("Type /help for commands.");

    let stdin = io::stdin();
    let mut line = String::new();
    let mut rng = rand::thread_rng();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);

        match intent.action.as_str() {
            "noop" => {
                // Enter on an empty line sends a pending /surprise idea.
                if !studio.conversation().input().trim().is_empty() {
                    submit_conversation(&mut studio);
                }
            }
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
            }
            "submit" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                studio.conversation_mut().set_input(prompt);
                submit_conversation(&mut studio);
            }
            "set_style" => {
                let Some(id) = intent.arg_str("style") else {
                    println!("/style requires an id (see /styles)");
                    continue;
                };
                let selection = studio.conversation_mut().select_style(id);
                if let Some(reason) = selection.fallback_reason {
                    println!("{reason}");
                }
                println!("Style set to {}", selection.style.label);
            }
            "set_ratio" => {
                let Some(raw) = intent.arg_str("ratio") else {
                    println!("/ratio requires a value (see /ratios)");
                    continue;
                };
                match raw.parse::<AspectRatio>() {
                    Ok(ratio) => {
                        studio.conversation_mut().select_aspect_ratio(ratio);
                        studio.image_mut().select_aspect_ratio(ratio);
                        println!("Aspect ratio set to {}", ratio.label());
                    }
                    Err(err) => println!("{err}"),
                }
            }
            "attach" => {
                let Some(path) = intent.arg_str("path") else {
                    println!("/attach requires a path");
                    continue;
                };
                match read_attachment(Path::new(path)) {
                    Ok(attachment) => {
                        println!(
                            "Attached {} ({}, {} bytes)",
                            attachment.file_name,
                            attachment.mime_type,
                            attachment.bytes.len()
                        );
                        studio.conversation_mut().attach(attachment);
                    }
                    Err(err) => println!("Attach failed: {err:#}"),
                }
            }
            "detach" => {
                studio.conversation_mut().clear_attachment();
                println!("Attachment removed");
            }
            "surprise" => {
                let idea = studio.conversation_mut().surprise_me(&mut rng).to_string();
                println!("{idea}");
                println!("(press Enter to send, or type something else)");
            }
            "generate_image" => {
                let prompt = match intent.arg_str("prompt") {
                    Some(prompt) => Some(prompt.to_string()),
                    None => last_refined_prompt(&studio),
                };
                let Some(prompt) = prompt else {
                    println!("/image requires a prompt (or a refined prompt from this chat)");
                    continue;
                };
                studio.image_mut().set_prompt(prompt);
                generate_image(&mut studio);
            }
            "export_image" => {
                let result = match intent.arg_str("path") {
                    Some(dir) => studio.image().export(Path::new(dir)),
                    None => studio.export_image(),
                };
                match result {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(err) => println!("Export failed: {err:#}"),
                }
            }
            "show_history" => {
                if studio.shell_mut().toggle_history() {
                    print_history(studio.history().entries());
                    println!("(/open <id> to revisit an entry, /history to close)");
                } else {
                    println!("History closed");
                }
            }
            "open_history_entry" => {
                let Some(id) = intent.arg_str("id") else {
                    println!("/open requires a history id (see /history)");
                    continue;
                };
                let Some(view) = studio.select_history_entry(id) else {
                    println!("No history entry with id {id}");
                    continue;
                };
                println!("== {} ==", view.title());
                if let Some(entry) = studio.history().get(id) {
                    print_entry(entry);
                }
            }
            "clear_history" => match studio.clear_history() {
                Ok(()) => {
                    studio.shell_mut().close_history();
                    println!("History cleared");
                }
                Err(err) => println!("Clear failed: {err:#}"),
            },
            "copy_last" => match studio.conversation().last_assistant_text() {
                Some(text) => println!("{text}"),
                None => println!("Nothing to copy yet"),
            },
            "list_styles" => print_styles(studio.conversation().styles()),
            "list_ratios" => print_ratios(),
            "quit" => break,
            "unknown" => {
                let command = intent.arg_str("command").unwrap_or_default();
                println!("Unknown command: /{command}. Type /help for commands.");
            }
            other => {
                tracing::debug!(action = other, "unhandled chat action");
            }
        }
    }

    Ok(())
}

fn submit_conversation(studio: &mut Studio) {
    match studio.submit_conversation() {
        Ok(ConversationOutcome::Replied(text)) => println!("{text}"),
        Ok(ConversationOutcome::Failed(err)) => {
            if let Some(text) = studio.conversation().last_assistant_text() {
                println!("{text}");
            }
            println!("({err})");
        }
        Err(SubmitRejected::Empty) => println!("Type a description or /attach an image first"),
        Err(SubmitRejected::Busy) => println!("Still waiting for the previous answer"),
    }
}

/// The latest assistant reply, unless it is the welcome or a failure notice.
fn last_refined_prompt(studio: &Studio) -> Option<String> {
    let transcript = studio.conversation().transcript();
    if transcript.count_by_role(Role::User) == 0 {
        return None;
    }
    studio
        .conversation()
        .last_assistant_text()
        .filter(|text| *text != CONVERSATION_FAILURE_MESSAGE)
        .map(str::to_string)
}

fn generate_image(studio: &mut Studio) {
    println!(
        "Generating {} wallpaper...",
        studio.image().aspect_ratio().label()
    );
    match studio.generate_image() {
        Ok(ImageOutcome::Generated) => {
            if let Some(image) = studio.image().result() {
                println!(
                    "Image ready ({}, {} bytes). Use /export to save it.",
                    image.mime_type,
                    image.bytes.len()
                );
            }
        }
        Ok(ImageOutcome::Failed(err)) => {
            println!("{}", studio.image().error().unwrap_or(IMAGE_FAILURE_MESSAGE));
            println!("({err})");
        }
        Err(SubmitRejected::Empty) => println!("/image requires a prompt"),
        Err(SubmitRejected::Busy) => println!("An image is already being generated"),
    }
}

fn run_image(mut config: StudioConfig, args: ImageArgs) -> Result<i32> {
    apply_models(&mut config, args.models);
    let out_dir = args.out.unwrap_or_else(|| config.export_dir.clone());
    let client = GenerationClient::from_config(&config);
    let mut history = HistoryStore::load(FileSnapshotStorage::new(config.history_path.clone()));

    let mut controller = ImageRequestController::new();
    controller.set_prompt(args.prompt);
    controller.select_aspect_ratio(args.ratio);
    match controller.submit(&client, &mut history) {
        Ok(ImageOutcome::Generated) => {
            let path = controller.export(&out_dir)?;
            println!("{}", path.display());
            Ok(0)
        }
        Ok(ImageOutcome::Failed(err)) => {
            eprintln!("{IMAGE_FAILURE_MESSAGE}");
            eprintln!("{err}");
            Ok(1)
        }
        Err(rejected) => bail!("image request rejected: {rejected}"),
    }
}

fn run_history(config: StudioConfig, command: HistoryCommand) -> Result<i32> {
    let mut history = HistoryStore::load(FileSnapshotStorage::new(config.history_path.clone()));
    match command {
        HistoryCommand::List { json } => {
            if json {
                let text = serde_json::to_string_pretty(history.entries())
                    .context("failed to serialize history")?;
                println!("{text}");
            } else {
                print_history(history.entries());
            }
            Ok(0)
        }
        HistoryCommand::Show { id } => {
            let Some(entry) = history.get(&id) else {
                eprintln!("No history entry with id {id}");
                return Ok(1);
            };
            print_entry(entry);
            Ok(0)
        }
        HistoryCommand::Clear => {
            history.clear()?;
            println!("History cleared");
            Ok(0)
        }
    }
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("{EMPTY_HISTORY_MESSAGE}");
        return;
    }
    for entry in entries {
        println!(
            "{}  {}  {:<10}  {}",
            entry.id,
            format_timestamp(entry),
            flow_label(entry.source_flow),
            entry.title
        );
        println!("    {}", preview_line(&entry.preview));
    }
}

fn print_entry(entry: &HistoryEntry) {
    println!("{}", entry.title);
    println!("{} | {}", format_timestamp(entry), flow_label(entry.source_flow));
    println!();
    println!("{}", entry.preview);
}

fn print_styles(catalog: &StyleCatalog) {
    for style in catalog.list() {
        println!("{:<12} {}", style.id, style.label);
    }
}

fn print_ratios() {
    for ratio in AspectRatio::PICKER {
        println!("{:<6} {}", ratio.as_str(), ratio.label());
    }
}

fn flow_label(flow: SourceFlow) -> &'static str {
    match flow {
        SourceFlow::Conversation => "prompt",
        SourceFlow::ImageRequest => "wallpaper",
    }
}

fn format_timestamp(entry: &HistoryEntry) -> String {
    entry
        .created_at_utc()
        .map(|stamp| stamp.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One-line preview; image data URLs are summarized instead of printed.
fn preview_line(preview: &str) -> String {
    if let Some(rest) = preview.strip_prefix("data:") {
        let mime = rest.split(';').next().unwrap_or_default();
        return format!("[{mime} image, {} chars]", preview.len());
    }
    let flat = preview.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_MAX_CHARS {
        return flat;
    }
    flat.chars().take(PREVIEW_MAX_CHARS).collect::<String>() + "…"
}
