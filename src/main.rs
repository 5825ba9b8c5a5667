use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agrivoice::voice::{html_audio_tag, AudioRecorder};
use agrivoice::{
    AudioBuffer, ChatCompletions, Config, ConversationStore, DedupPolicy, DevicePlayback,
    NullPlayback, PassOutcome, Playback, Speaker, SpeechToText, TextToSpeech, TurnPipeline,
};

/// Agrivoice - voice-driven farming assistant
#[derive(Parser)]
#[command(name = "agrivoice", version, about)]
struct Cli {
    /// Path to config file (defaults to the platform config dir)
    #[arg(short, long, env = "AGRIVOICE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable audio playback (for hosts without audio hardware)
    #[arg(long, env = "AGRIVOICE_MUTE")]
    mute: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one pass over a recorded WAV file and print the exchange
    Ask {
        /// Path to the recording
        file: PathBuf,
    },
    /// Synthesize text and play it, or write it out
    Speak {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,

        /// Write the MP3 to a file instead of playing it
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write an autoplaying HTML audio snippet to a file
        #[arg(long)]
        html: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,agrivoice=info",
        1 => "info,agrivoice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Ask { file }) => ask(&config, &file).await,
        Some(Command::Speak { text, out, html }) => {
            speak(&config, &text, out.as_deref(), html.as_deref()).await
        }
        None => session(&config, cli.mute).await,
    }
}

/// Build the turn pipeline from configuration
fn build_pipeline(config: &Config, playback: Arc<dyn Playback>) -> anyhow::Result<TurnPipeline> {
    let key = config.openai_api_key.clone();

    let transcriber = Arc::new(SpeechToText::new(key.clone(), config.stt.model.clone())?);
    let responder = Arc::new(ChatCompletions::new(
        key.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
    )?);
    let synthesizer = Arc::new(TextToSpeech::new(
        key,
        config.tts.model.clone(),
        config.tts.voice.clone(),
        config.tts.speed,
    )?);

    let mut pipeline = TurnPipeline::new(transcriber, responder, synthesizer, playback)?;
    if config.dedup_reset_on_idle {
        pipeline = pipeline.with_dedup_policy(DedupPolicy::ResetOnIdle);
    }

    Ok(pipeline)
}

/// Interactive push-to-talk session
#[allow(clippy::future_not_send)]
async fn session(config: &Config, mute: bool) -> anyhow::Result<()> {
    let playback: Arc<dyn Playback> = if mute {
        Arc::new(NullPlayback)
    } else {
        Arc::new(DevicePlayback::new()?)
    };

    let mut pipeline = build_pipeline(config, playback)?;
    let mut store = ConversationStore::with_system_prompt(&config.system_prompt);
    let mut recorder = AudioRecorder::new()?;

    println!("{}", config.greeting);
    println!("Press Enter to start recording, Enter again to stop, Ctrl-C to quit.\n");

    loop {
        // A failed answer from an earlier turn resumes here, without
        // re-recording anything.
        if store.needs_answer() {
            prompt("(answer pending - press Enter to retry) ")?;
            match pipeline.process(None, &mut store).await {
                Ok(_) => print_tail(&store, 1),
                Err(e) if e.is_adapter_unavailable() => {
                    println!("Assistant unavailable: {e}");
                }
                Err(e) => return Err(e.into()),
            }
            continue;
        }

        prompt("[Enter to record] ")?;
        recorder.start()?;
        prompt("Recording... [Enter to stop] ")?;
        let audio = recorder.stop()?;

        match pipeline.process(Some(audio), &mut store).await {
            Ok(PassOutcome::NoSpeech) => println!("(no speech detected, try again)\n"),
            Ok(PassOutcome::Idle) => println!("(same recording as before, skipped)\n"),
            Ok(_) => print_tail(&store, 2),
            Err(e) if e.is_adapter_unavailable() => {
                println!("Assistant unavailable: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// One-shot pass over a recorded file; prints the text exchange only
#[allow(clippy::future_not_send)]
async fn ask(config: &Config, file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)?;
    let audio = AudioBuffer::new(bytes);

    let mut pipeline = build_pipeline(config, Arc::new(NullPlayback))?;
    let mut store = ConversationStore::with_system_prompt(&config.system_prompt);

    match pipeline.process(Some(audio), &mut store).await? {
        PassOutcome::NoSpeech => println!("No speech detected in {}", file.display()),
        _ => print_tail(&store, 2),
    }

    Ok(())
}

/// Synthesis check: speak the text, or write the audio out
async fn speak(
    config: &Config,
    text: &str,
    out: Option<&Path>,
    html: Option<&Path>,
) -> anyhow::Result<()> {
    use agrivoice::Synthesizer;

    let synthesizer = TextToSpeech::new(
        config.openai_api_key.clone(),
        config.tts.model.clone(),
        config.tts.voice.clone(),
        config.tts.speed,
    )?;

    println!("Synthesizing: \"{text}\"");
    let audio = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio", audio.len());

    if let Some(path) = out {
        std::fs::write(path, &audio)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = html {
        std::fs::write(path, html_audio_tag(&audio))?;
        println!("Wrote {}", path.display());
    }

    if out.is_none() && html.is_none() {
        println!("Playing...");
        let playback = DevicePlayback::new()?;
        playback.play_blocking(&audio)?;
    }

    Ok(())
}

/// Print a prompt and wait for the user to press Enter
fn prompt(message: &str) -> anyhow::Result<()> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}

/// Print the last `n` non-system turns
fn print_tail(store: &ConversationStore, n: usize) {
    let turns = store.snapshot();
    let start = turns.len().saturating_sub(n);
    for turn in &turns[start..] {
        match turn.role {
            Speaker::System => {}
            Speaker::User => println!("You: {}", turn.content),
            Speaker::Assistant => println!("Assistant: {}\n", turn.content),
        }
    }
}
