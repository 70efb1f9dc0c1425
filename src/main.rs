use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use clonevoice::backend::protocol::{AiProfile, UploadKind};
use clonevoice::backend::{ChatBackend, CloneBackend, HttpBackend};
use clonevoice::cli::{
    Cli, ClonesAction, Commands, ConfigAction, HistoryAction, ProfileAction, UploadKindArg,
};
use clonevoice::clone::profile::CloneRecord;
use clonevoice::clone::wizard::WizardStep;
use clonevoice::clone::{CloneWizard, FaceFeatures, Frame, analyze_frame};
use clonevoice::config::Config;
use clonevoice::error::CloneVoiceError;
use clonevoice::output::{TerminalSink, format_exchange};
use clonevoice::speech::{AlwaysGranted, ConsoleSpeech, LineCapture};
use clonevoice::turn::{ControllerConfig, SessionEvent, TurnController, VoiceSession};
use owo_colors::OwoColorize;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    clonevoice::logging::init(cli.quiet, cli.verbose);
    debug!(version = %clonevoice::version_string(), "starting");

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref(), cli.url.as_deref())?;
            run_voice(config, None, None, cli.quiet).await?;
        }
        Some(Commands::Voice { clone, pace }) => {
            let config = load_config(cli.config.as_deref(), cli.url.as_deref())?;
            run_voice(config, clone, pace, cli.quiet).await?;
        }
        Some(Commands::Chat { message }) => {
            let backend = connect(cli.config.as_deref(), cli.url.as_deref())?;
            let exchange = backend.text_chat(&message.join(" ")).await?;
            println!("{}", exchange.ai_response);
        }
        Some(Commands::History { action }) => {
            let backend = connect(cli.config.as_deref(), cli.url.as_deref())?;
            handle_history_command(&backend, action).await?;
        }
        Some(Commands::Profile { action }) => {
            let backend = connect(cli.config.as_deref(), cli.url.as_deref())?;
            handle_profile_command(&backend, action).await?;
        }
        Some(Commands::Clones { action }) => {
            let config = load_config(cli.config.as_deref(), cli.url.as_deref())?;
            handle_clones_command(&config, action).await?;
        }
        Some(Commands::Upload { file, query, kind }) => {
            let backend = connect(cli.config.as_deref(), cli.url.as_deref())?;
            handle_upload(&backend, &file, query.as_deref(), kind).await?;
        }
        Some(Commands::Health) => {
            let backend = connect(cli.config.as_deref(), cli.url.as_deref())?;
            let health = backend.health().await?;
            if health.is_ok() {
                println!("{} {}", "✓".green(), backend.base_url());
            } else {
                println!("{} {} ({})", "✗".red(), backend.base_url(), health.status);
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "clonevoice",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from custom path or default location.
fn load_config(custom_path: Option<&Path>, url: Option<&str>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    let mut config = config.with_env_overrides();
    if let Some(url) = url {
        config.backend.url = url.to_string();
    }
    Ok(config)
}

fn connect(custom_path: Option<&Path>, url: Option<&str>) -> Result<HttpBackend> {
    let config = load_config(custom_path, url)?;
    Ok(HttpBackend::new(&config.backend)?)
}

/// Run a voice session on the terminal until `:quit` or end of input.
async fn run_voice(
    config: Config,
    clone: Option<String>,
    pace: Option<Duration>,
    quiet: bool,
) -> Result<()> {
    let http = HttpBackend::new(&config.backend)?;
    let (backend, assistant): (Arc<dyn ChatBackend>, String) = match clone {
        Some(key) => {
            let record = find_clone(&http, &key).await?;
            let name = record.name.clone();
            let backend: Arc<dyn ChatBackend> = Arc::new(
                CloneBackend::new(http, record).with_history_len(config.session.persona_history),
            );
            (backend, name)
        }
        None => {
            let name = match http.ai_profile().await {
                Ok(profile) => profile.name,
                Err(e) => {
                    warn!(error = %e, "could not load assistant profile");
                    AiProfile::default().name
                }
            };
            let backend: Arc<dyn ChatBackend> = Arc::new(http);
            (backend, name)
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let capture = LineCapture::new(tx.clone());
    let reader = capture.spawn_reader(BufReader::new(tokio::io::stdin()));
    let mut speech = ConsoleSpeech::new(tx.clone());
    if let Some(pace) = pace {
        speech = speech.with_pace(pace);
    }

    let controller = TurnController::new(
        ControllerConfig::from(&config),
        Box::new(capture),
        Box::new(speech),
    );
    let sink = TerminalSink::new(assistant, std::io::stdout().is_terminal(), quiet);
    let session = VoiceSession::new(
        controller,
        backend,
        Arc::new(AlwaysGranted),
        Box::new(sink),
    );

    if tx.send(SessionEvent::Activate).is_err() {
        bail!("voice session closed before it started");
    }
    drop(tx);

    let messages = session.run(rx).await;
    reader.abort();
    info!(messages = messages.len(), "voice session ended");
    Ok(())
}

/// Look a clone up by id, then by name.
async fn find_clone(backend: &HttpBackend, key: &str) -> Result<CloneRecord> {
    match backend.clone_by_id(key).await {
        Ok(record) => Ok(record),
        Err(CloneVoiceError::BackendStatus { status: 404, .. }) => backend
            .clone_by_name(key)
            .await
            .with_context(|| format!("no clone with id or name '{key}'")),
        Err(e) => Err(e.into()),
    }
}

async fn handle_history_command(
    backend: &HttpBackend,
    action: Option<HistoryAction>,
) -> Result<()> {
    match action.unwrap_or(HistoryAction::Show { limit: None }) {
        HistoryAction::Show { limit } => {
            let assistant = match backend.ai_profile().await {
                Ok(profile) => profile.name,
                Err(_) => AiProfile::default().name,
            };
            let history = backend.history(limit).await?;
            if history.messages.is_empty() {
                println!("No conversation history");
                return Ok(());
            }
            let colored = std::io::stdout().is_terminal();
            for exchange in &history.messages {
                println!("{}\n", format_exchange(exchange, &assistant, colored));
            }
        }
        HistoryAction::Clear => {
            let message = backend.clear_history().await?;
            println!("{}", message.green());
        }
    }
    Ok(())
}

fn print_profile(profile: &AiProfile) {
    println!("{} {}", profile.avatar, profile.name.bold());
    println!("  {}       {}", "Status:".dimmed(), profile.status);
    println!("  {}  {}", "Description:".dimmed(), profile.description);
    println!("  {}  {}", "Personality:".dimmed(), profile.personality);
    println!("  {}        {}", "Color:".dimmed(), profile.color);
}

async fn handle_profile_command(
    backend: &HttpBackend,
    action: Option<ProfileAction>,
) -> Result<()> {
    match action.unwrap_or(ProfileAction::Show) {
        ProfileAction::Show => print_profile(&backend.ai_profile().await?),
        ProfileAction::Set { field, value } => {
            let mut profile = backend.ai_profile().await?;
            match field.as_str() {
                "name" => profile.name = value,
                "avatar" => profile.avatar = value,
                "status" => profile.status = value,
                "description" => profile.description = value,
                "personality" => profile.personality = value,
                "color" => profile.color = value,
                other => bail!(
                    "unknown profile field '{other}' (name, avatar, status, description, personality, color)"
                ),
            }
            let updated = backend.update_ai_profile(&profile).await?;
            print_profile(&updated);
        }
    }
    Ok(())
}

fn print_clone(record: &CloneRecord) {
    println!("{} {}", record.name.bold(), format!("({})", record.id).dimmed());
    if !record.speaking_style.is_empty() {
        println!("  {}  {}", "Speaking style:".dimmed(), record.speaking_style);
    }
    for answer in &record.personality {
        println!("  {:<12} {}", format!("{}:", answer.category).dimmed(), answer.response);
    }
    println!("  {}        {}", "Memories:".dimmed(), record.memories.len());
}

async fn handle_clones_command(config: &Config, action: ClonesAction) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    match action {
        ClonesAction::List => {
            let clones = backend.list_clones().await?;
            if clones.is_empty() {
                println!("No clones yet. Create one with: clonevoice clones create");
                return Ok(());
            }
            for clone in clones {
                println!(
                    "{}  {}  {}",
                    clone.id.dimmed(),
                    clone.name.bold(),
                    format!(
                        "{} answers, {} memories",
                        clone.personality_count, clone.memories_count
                    )
                    .dimmed()
                );
            }
        }
        ClonesAction::Show { id } => print_clone(&backend.clone_by_id(&id).await?),
        ClonesAction::Find { name } => print_clone(&backend.clone_by_name(&name).await?),
        ClonesAction::Create {
            face,
            width,
            height,
        } => {
            let features = match (face, width, height) {
                (Some(path), Some(width), Some(height)) => {
                    Some(read_face(&path, width, height)?)
                }
                _ => None,
            };
            let new_clone = run_wizard(features)?;
            let record = backend.create_clone(&new_clone).await?;
            println!("{} created clone {}", "✓".green(), record.name.bold());
            println!("  id: {}", record.id);
        }
        ClonesAction::Delete { id } => {
            let message = backend.delete_clone(&id).await?;
            println!("{}", message.green());
        }
        ClonesAction::Stats { id } => {
            let stats = backend.clone_stats(&id).await?;
            println!("{}", stats.name.bold());
            println!("  {}  {}", "Personality answers:".dimmed(), stats.personality_answers);
            println!("  {}             {}", "Memories:".dimmed(), stats.total_memories);
            println!("  {}                 {}", "Face:".dimmed(), stats.has_face);
            if let Some(created) = &stats.created_at {
                println!("  {}              {}", "Created:".dimmed(), created);
            }
        }
        ClonesAction::Analyze {
            file,
            width,
            height,
        } => {
            let features = read_face(&file, width, height)?;
            println!("{}", serde_json::to_string_pretty(&features)?);
        }
    }
    Ok(())
}

fn read_face(path: &Path, width: u32, height: u32) -> Result<FaceFeatures> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let frame = Frame::new(width, height, &bytes)?;
    Ok(analyze_frame(&frame))
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{label} ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("input closed");
    }
    Ok(line.trim().to_string())
}

/// Walk the creation wizard on the terminal, re-asking on invalid input.
fn run_wizard(features: Option<FaceFeatures>) -> Result<clonevoice::clone::NewClone> {
    let mut wizard = CloneWizard::new();
    loop {
        let result = match wizard.step() {
            WizardStep::Name => wizard.set_name(&prompt_line("Clone name:")?),
            WizardStep::Personality { index } => {
                let total = wizard.questions().len();
                let question = match wizard.current_question() {
                    Some(q) => q.prompt.clone(),
                    None => bail!("question {index} is missing"),
                };
                wizard.answer(&prompt_line(&format!("[{}/{}] {}", index + 1, total, question))?)
            }
            WizardStep::SpeakingStyle => {
                wizard.set_speaking_style(&prompt_line("Speaking style (optional):")?)
            }
            WizardStep::Face => match features.clone() {
                Some(features) => wizard.set_face(None, features),
                None => wizard.skip_face(),
            },
            WizardStep::Done => break,
        };
        if let Err(e) = result {
            eprintln!("{}", e.to_string().yellow());
        }
    }
    Ok(wizard.finish()?)
}

async fn handle_upload(
    backend: &HttpBackend,
    file: &Path,
    query: Option<&str>,
    kind: Option<UploadKindArg>,
) -> Result<()> {
    let kind = match kind {
        Some(UploadKindArg::Image) => UploadKind::Image,
        Some(UploadKindArg::Document) => UploadKind::Document,
        None => UploadKind::from_extension(
            &file
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
    };
    let result = backend.upload(kind, file, query).await?;
    if let Some(reply) = result.ai_response.or(result.message) {
        println!("{reply}");
    }
    if let Some(url) = result.url.or(result.file_path) {
        println!("{}", url.dimmed());
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            match config.get_value_by_path(&key) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            Config::set_value_by_path(&config_path, &key, &value)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::List => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            print!("{}", config.to_display_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
