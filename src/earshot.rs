//! Transcribe a WAV file with the configured speech-to-text module.
//!
//! Usage: earshot <audio.wav> [language] [module]

use std::env;
use std::time::Instant;

use anyhow::{Context, Result};
use earshot::{AudioSource, ConfigManager, DEFAULT_LOG_LEVEL, PcmAudio, SttFactory, VERSION};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("EARSHOT_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <audio.wav> [language] [module]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} command.wav en-GB kaldi", args[0]);
        std::process::exit(1);
    }

    let audio_file = &args[1];
    let language = args.get(2).map(String::as_str);
    let module = args.get(3).map(String::as_str);

    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    info!(
        version = VERSION,
        config = %config_manager.config_path().display(),
        "Starting earshot"
    );

    let audio = PcmAudio::from_wav_file(audio_file)
        .with_context(|| format!("Failed to read audio file {}", audio_file))?;
    info!(
        sample_rate = audio.sample_rate(),
        seconds = audio.duration().as_secs_f64(),
        "Loaded audio"
    );

    let factory = SttFactory::from_config(&config);
    let stt = match module {
        Some(module) => factory.create_named(&config, module)?,
        None => factory.create(&config)?,
    };

    let start = Instant::now();
    let text = stt
        .execute(&audio, language)
        .await
        .with_context(|| format!("{} failed to transcribe {}", stt.name(), audio_file))?;
    info!(
        provider = stt.name(),
        elapsed = start.elapsed().as_secs_f64(),
        "Transcription finished"
    );

    match text {
        Some(text) => println!("{}", text),
        None => eprintln!("No transcript returned"),
    }

    Ok(())
}
