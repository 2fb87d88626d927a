//! Command-line front end for Super Characters.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Parse the command line.
//! 3. Open the settings store (defaults on first run or unreadable file).
//! 4. Dispatch to the subcommand, building API clients from the current
//!    settings at call time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super_characters::{
    config::{OnboardingStore, SettingsStore},
    connect::ConnectClient,
    conversation::ConversationSession,
    hotkey::{Hotkey, HotkeyEvent, HotkeyListener, HotkeyMode},
    llm::{ChatClient, GeminiClient},
    permissions::{PermissionGate, PermissionKind},
    tts::{ElevenLabsClient, SpeechSynthesizer},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "super-characters", version, about = "Voice-driven virtual character assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show onboarding, permission and service configuration state.
    Status,

    /// Inspect or change persisted settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Talk to the character: one line of stdin per turn.
    Chat {
        /// Write spoken replies as numbered .mp3 files into this directory.
        #[arg(long)]
        audio_dir: Option<PathBuf>,
    },

    /// Synthesize `text` to an MP3 file.
    Speak {
        text: String,
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Query or request OS permissions.
    Permissions {
        #[command(subcommand)]
        action: PermissionsAction,
    },

    /// Inspect or change the onboarding-complete flag.
    Onboarding {
        #[command(subcommand)]
        action: OnboardingAction,
    },

    /// Pipedream Connect: tokens, apps and connected accounts.
    Connect {
        #[command(subcommand)]
        action: ConnectAction,
    },

    /// Listen for the press-and-talk hotkey and print start/stop events.
    Listen {
        /// Press once to start, again to stop (default: hold to talk).
        #[arg(long, default_value_t = false)]
        toggle: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print current settings with secrets masked.
    Show,
    /// Set one field.
    Set { field: SettingField, value: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SettingField {
    GeminiApiKey,
    ElevenlabsApiKey,
    ElevenlabsVoiceId,
    Hotkey,
    SilenceDurationMs,
    PipedreamClientId,
    PipedreamClientSecret,
    PipedreamProjectId,
    PipedreamEnvironment,
}

#[derive(Subcommand, Debug)]
enum PermissionsAction {
    Status,
    /// Trigger the OS permission request (re-run `status` to see the result).
    Request { kind: PermissionKind },
    /// Open the system settings pane for a permission.
    Open { kind: PermissionKind },
}

#[derive(Subcommand, Debug)]
enum OnboardingAction {
    Status,
    Complete,
    Reset,
}

#[derive(Subcommand, Debug)]
enum ConnectAction {
    /// Create a short-lived connect token.
    Token {
        #[arg(long, default_value = "default")]
        user: String,
    },
    /// Print a connect link for an app.
    Link {
        app: String,
        #[arg(long, default_value = "default")]
        user: String,
    },
    /// Search the app catalogue.
    Apps {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List a user's connected accounts.
    Accounts {
        #[arg(long, default_value = "default")]
        user: String,
    },
    /// Remove a connected account.
    Delete { account_id: String },
    /// Print the MCP server configuration.
    Mcp {
        /// Also fetch and print an access token.
        #[arg(long, default_value_t = false)]
        with_token: bool,
    },
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = SettingsStore::open().context("open settings store failed")?;
    log::debug!("Settings file: {}", settings.path().display());

    match cli.command {
        Commands::Status => status(&settings)?,
        Commands::Settings { action } => settings_command(&settings, action)?,
        Commands::Chat { audio_dir } => chat(&settings, audio_dir.as_deref()).await?,
        Commands::Speak { text, out } => speak(&settings, &text, &out).await?,
        Commands::Permissions { action } => permissions_command(action)?,
        Commands::Onboarding { action } => onboarding_command(action)?,
        Commands::Connect { action } => connect_command(&settings, action).await?,
        Commands::Listen { toggle } => listen(&settings, toggle).await?,
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn permission_gate() -> Result<PermissionGate> {
    let onboarding = OnboardingStore::open().context("open onboarding store failed")?;
    Ok(PermissionGate::for_platform(onboarding))
}

fn status(settings: &SettingsStore) -> Result<()> {
    let gate = permission_gate()?;
    let state = gate.state();
    let s = settings.settings();

    println!("onboarding needed:  {}", yes_no(gate.needs_onboarding()));
    println!("accessibility:      {}", state.accessibility);
    println!("microphone:         {}", state.microphone);
    println!("gemini configured:  {}", yes_no(!s.gemini_api_key.is_empty()));
    println!("elevenlabs configured: {}", yes_no(!s.eleven_labs_api_key.is_empty()));
    println!("pipedream configured:  {}", yes_no(settings.is_pipedream_configured()));
    println!("press-and-talk hotkey: {}", settings.press_and_talk_hotkey());
    Ok(())
}

fn settings_command(settings: &SettingsStore, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let s = settings.settings();
            println!("file:                    {}", settings.path().display());
            println!("geminiApiKey:            {}", mask(&s.gemini_api_key));
            println!("elevenLabsApiKey:        {}", mask(&s.eleven_labs_api_key));
            println!("elevenLabsVoiceId:       {}", or_unset(&s.eleven_labs_voice_id));
            println!("pressAndTalkHotkey:      {}", settings.press_and_talk_hotkey());
            println!("silenceDurationMs:       {}", settings.silence_duration_ms());
            println!("pipedreamClientId:       {}", or_unset(&s.pipedream_client_id));
            println!("pipedreamClientSecret:   {}", mask(&s.pipedream_client_secret));
            println!("pipedreamProjectId:      {}", or_unset(&s.pipedream_project_id));
            println!("pipedreamEnvironment:    {}", settings.pipedream_environment());
        }
        SettingsAction::Set { field, value } => {
            let saved = match field {
                SettingField::GeminiApiKey => settings.set_gemini_api_key(&value),
                SettingField::ElevenlabsApiKey => settings.set_elevenlabs_api_key(&value),
                SettingField::ElevenlabsVoiceId => settings.set_elevenlabs_voice_id(&value),
                SettingField::Hotkey => {
                    let hotkey = Hotkey::parse(&value)
                        .with_context(|| format!("invalid hotkey '{value}'"))?;
                    settings.set_press_and_talk_hotkey(&hotkey.to_string())
                }
                SettingField::SilenceDurationMs => {
                    let ms: i64 = value
                        .trim()
                        .parse()
                        .with_context(|| format!("'{value}' is not a number of milliseconds"))?;
                    settings.set_silence_duration_ms(ms)
                }
                SettingField::PipedreamClientId => settings.set_pipedream_client_id(&value),
                SettingField::PipedreamClientSecret => settings.set_pipedream_client_secret(&value),
                SettingField::PipedreamProjectId => settings.set_pipedream_project_id(&value),
                SettingField::PipedreamEnvironment => settings.set_pipedream_environment(&value),
            };
            saved.context("save settings failed")?;
            println!("Saved {field:?}");
        }
    }
    Ok(())
}

fn clients(settings: &SettingsStore) -> (GeminiClient, Option<ElevenLabsClient>) {
    let s = settings.settings();
    let chat = GeminiClient::new(s.gemini_api_key);
    let tts = (!s.eleven_labs_api_key.is_empty())
        .then(|| ElevenLabsClient::new(s.eleven_labs_api_key).with_voice_id(&s.eleven_labs_voice_id));
    (chat, tts)
}

async fn chat(settings: &SettingsStore, audio_dir: Option<&Path>) -> Result<()> {
    let (chat, tts) = clients(settings);
    if !chat.is_configured() {
        bail!("Gemini API key not configured; run: super-characters settings set gemini-api-key <KEY>");
    }
    if let Some(dir) = audio_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create audio directory {} failed", dir.display()))?;
    }

    let tts = tts.map(|t| Arc::new(t) as Arc<dyn SpeechSynthesizer>);
    let mut session = ConversationSession::new(Arc::new(chat), tts);
    session.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reply_index = 0usize;
    while let Some(line) = lines.next_line().await.context("read stdin failed")? {
        match session.process_input(&line).await {
            Ok(None) => continue,
            Ok(Some(reply)) => {
                println!("{}", reply.text);
                if let (Some(dir), Some(audio)) = (audio_dir, reply.audio.as_ref()) {
                    reply_index += 1;
                    let path = dir.join(format!("reply-{reply_index:03}.mp3"));
                    std::fs::write(&path, audio)
                        .with_context(|| format!("write {} failed", path.display()))?;
                    log::info!("Wrote {}", path.display());
                }
            }
            Err(e) => log::error!("{e}"),
        }
    }

    session.stop();
    Ok(())
}

async fn speak(settings: &SettingsStore, text: &str, out: &Path) -> Result<()> {
    let (_, tts) = clients(settings);
    let Some(tts) = tts else {
        bail!("ElevenLabs API key not configured; run: super-characters settings set elevenlabs-api-key <KEY>");
    };

    let audio = tts.synthesize(text).await.context("speech synthesis failed")?;
    std::fs::write(out, &audio).with_context(|| format!("write {} failed", out.display()))?;
    println!("Wrote {} bytes to {}", audio.len(), out.display());
    Ok(())
}

fn permissions_command(action: PermissionsAction) -> Result<()> {
    let gate = permission_gate()?;
    match action {
        PermissionsAction::Status => {
            let state = gate.state();
            println!("{}", serde_json::to_string_pretty(&state)?);
            println!("all granted: {}", yes_no(state.all_granted()));
        }
        PermissionsAction::Request { kind } => gate.request(kind),
        PermissionsAction::Open { kind } => gate.open_settings(kind),
    }
    Ok(())
}

fn onboarding_command(action: OnboardingAction) -> Result<()> {
    let gate = permission_gate()?;
    match action {
        OnboardingAction::Status => {
            println!("onboarding complete: {}", yes_no(!gate.needs_onboarding()));
        }
        OnboardingAction::Complete => {
            gate.complete_onboarding().context("save onboarding state failed")?;
            println!("Onboarding marked complete");
        }
        OnboardingAction::Reset => {
            gate.reset_onboarding().context("save onboarding state failed")?;
            println!("Onboarding reset");
        }
    }
    Ok(())
}

async fn connect_command(settings: &SettingsStore, action: ConnectAction) -> Result<()> {
    let client = ConnectClient::new(settings.connect_config());
    if !client.is_configured() {
        bail!("Pipedream not configured; set pipedream-client-id, pipedream-client-secret and pipedream-project-id");
    }

    match action {
        ConnectAction::Token { user } => {
            let token = client.create_connect_token(&user).await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
        }
        ConnectAction::Link { app, user } => {
            println!("{}", client.connect_link_url(&user, &app).await?);
        }
        ConnectAction::Apps { query, limit } => {
            for app in client.list_apps(&query, limit).await? {
                println!("{:<32} {}", app.name_slug, app.name);
            }
        }
        ConnectAction::Accounts { user } => {
            let accounts = client.list_connected_accounts(&user).await?;
            if accounts.is_empty() {
                println!("No connected accounts for '{user}'");
            }
            for account in accounts {
                let health = if account.healthy { "healthy" } else { "unhealthy" };
                println!(
                    "{:<24} {:<20} {} ({health})",
                    account.id,
                    account.app_slug(),
                    account.name
                );
            }
        }
        ConnectAction::Delete { account_id } => {
            client.delete_connected_account(&account_id).await?;
            println!("Deleted {account_id}");
        }
        ConnectAction::Mcp { with_token } => {
            let mut config = serde_json::to_value(client.mcp_config())?;
            if with_token {
                config["accessToken"] = client.mcp_access_token().await?.into();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

async fn listen(settings: &SettingsStore, toggle: bool) -> Result<()> {
    let raw = settings.press_and_talk_hotkey();
    let hotkey = Hotkey::parse(&raw).with_context(|| format!("invalid hotkey '{raw}' in settings"))?;
    let mode = if toggle {
        HotkeyMode::Toggle
    } else {
        HotkeyMode::HoldToTalk
    };

    let (tx, mut rx) = mpsc::channel(16);
    let _listener = HotkeyListener::start(hotkey, mode, tx).context("start hotkey listener failed")?;
    println!("Listening for {hotkey}; Ctrl+C to quit");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(HotkeyEvent::Start) => println!("start"),
                Some(HotkeyEvent::Stop) => println!("stop"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// First four characters followed by `****`.
fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    if visible.len() == secret.len() {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_hides_all_but_prefix() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("AIzaSyD-secret"), "AIza****");
    }

    #[test]
    fn cli_parses_settings_set() {
        let cli = Cli::try_parse_from([
            "super-characters",
            "settings",
            "set",
            "silence-duration-ms",
            "450",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Settings {
                action: SettingsAction::Set {
                    field: SettingField::SilenceDurationMs,
                    ..
                }
            }
        ));
    }

    #[test]
    fn cli_parses_permission_kind() {
        let cli =
            Cli::try_parse_from(["super-characters", "permissions", "request", "microphone"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Permissions {
                action: PermissionsAction::Request {
                    kind: PermissionKind::Microphone
                }
            }
        ));
    }
}
