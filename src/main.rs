use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gerald::audio::{
    write_wav, AudioSource, FrameSource, FrameSourceConfig, FrameSourceFactory, MicrophoneSource,
    ToneCue, UtteranceArchive,
};
use gerald::providers::{
    create_responder, create_stt, create_tts, Responder, SpeechToText, TextToSpeech,
};
use gerald::session::{SessionProviders, VoiceSession};
use gerald::wake::{create_gate, WakeGate};
use gerald::{Config, Error};

/// Gerald - wake word voice assistant
#[derive(Parser)]
#[command(name = "gerald", version, about)]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, env = "GERALD_CONFIG", default_value = "config/gerald")]
    config: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for the wake word and hold a conversation (default)
    Run {
        /// Replay a mono 16-bit WAV file instead of using the microphone
        #[arg(long)]
        input: Option<PathBuf>,

        /// Save every captured utterance as a WAV file in this directory
        #[arg(long)]
        save_utterances: Option<PathBuf>,
    },
    /// Record from the microphone and save the result
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Output WAV file
        #[arg(short, long, default_value = "mic_test.wav")]
        output: PathBuf,
    },
    /// Speak text through the configured TTS
    TestTts {
        /// Text to speak
        #[arg(default_value = "Howdy. This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,gerald=info",
        1 => "info,gerald=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    match cli.command.unwrap_or(Command::Run {
        input: None,
        save_utterances: None,
    }) {
        Command::Run {
            input,
            save_utterances,
        } => run_session(&config, input, save_utterances).await,
        Command::TestMic { duration, output } => test_mic(duration, &output).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

async fn run_session(
    config: &Config,
    input: Option<PathBuf>,
    save_utterances: Option<PathBuf>,
) -> anyhow::Result<()> {
    let replaying = input.is_some();
    let mut wake = create_gate(&config.wake).context("failed to initialize wake word engine")?;

    let providers = match build_providers(config, input, wake.as_ref()) {
        Ok(parts) => parts,
        Err(e) => {
            wake.cleanup();
            return Err(e);
        }
    };
    let (source, stt, responder, tts) = providers;

    let session_config = config.session_config(wake.sample_rate(), wake.frame_length());
    let mut session = VoiceSession::new(
        session_config,
        SessionProviders {
            source,
            wake,
            stt,
            responder,
            tts,
        },
    )?
    .with_cue(Box::new(ToneCue::new(
        config.cue.frequency_hz,
        config.cue.duration_secs,
        config.cue.amplitude,
        config.tts.sample_rate,
    )));

    if let Some(dir) = save_utterances {
        session = session.with_archive(UtteranceArchive::new(dir)?);
    }

    info!("Gerald v{}", env!("CARGO_PKG_VERSION"));

    match session.run().await {
        Ok(stats) => {
            info!(exchanges = stats.exchanges, "Goodbye");
            Ok(())
        }
        Err(Error::StreamClosed(reason)) if replaying => {
            info!(%reason, "Replay finished");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

type BuiltProviders = (
    Box<dyn FrameSource>,
    Box<dyn SpeechToText>,
    Box<dyn Responder>,
    Box<dyn TextToSpeech>,
);

fn build_providers(
    config: &Config,
    input: Option<PathBuf>,
    wake: &dyn WakeGate,
) -> anyhow::Result<BuiltProviders> {
    let stt = create_stt(&config.stt).context("failed to create speech-to-text client")?;
    let responder = create_responder(&config.llm).context("failed to create language model client")?;
    let tts = create_tts(&config.tts).context("failed to create text-to-speech client")?;

    let source_config = FrameSourceConfig::new(wake.sample_rate(), wake.frame_length());
    let source = match input {
        Some(path) => FrameSourceFactory::create(AudioSource::File(path), source_config),
        None => FrameSourceFactory::create(AudioSource::Microphone, source_config),
    }
    .context("failed to open audio input")?;

    Ok((source, stt, responder, tts))
}

async fn test_mic(duration: u64, output: &Path) -> anyhow::Result<()> {
    println!("Recording for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let source_config = FrameSourceConfig::default();
    let sample_rate = source_config.sample_rate;
    let frames_per_second = (sample_rate as usize).div_ceil(source_config.frame_length);
    let mut mic = MicrophoneSource::open(source_config)?;
    println!("Device: {}", mic.device_name());
    println!("---");

    let mut samples: Vec<i16> = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration);

    let mut second = 0;
    let mut peak: u16 = 0;
    let mut frames_this_second = 0;
    while tokio::time::Instant::now() < deadline {
        let frame = mic.read_frame().await?;
        peak = peak.max(frame.peak_amplitude());
        samples.extend_from_slice(frame.samples());

        frames_this_second += 1;
        if frames_this_second == frames_per_second {
            second += 1;
            let meter_len = (usize::from(peak) * 50 / 32768).min(50);
            let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);
            println!("[{second:2}s] Peak: {peak:5} | [{meter}]");
            peak = 0;
            frames_this_second = 0;
        }
    }

    mic.stop().await?;
    write_wav(output, &samples, sample_rate)?;

    println!("\n---");
    println!(
        "Saved {:.1}s of audio to {}",
        samples.len() as f64 / f64::from(sample_rate),
        output.display()
    );
    Ok(())
}

async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let tts = create_tts(&config.tts)?;
    println!("Speaking: {text}");
    tts.speak(text).await?;
    println!("Done.");
    Ok(())
}
