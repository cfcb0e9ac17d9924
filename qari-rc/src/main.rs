//! qari-rc (Recitation Capture) client
//!
//! Records a recitation from the microphone or imports an existing audio
//! file, validates it locally, and submits it to the transcription
//! service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::warn;
use uuid::Uuid;

use qari_common::config::{default_config_path, load_or_create_toml_config};
use qari_common::media;
use qari_rc::capture::{device, CaptureSession};
use qari_rc::config::{ClientConfig, ConfigOverrides, TomlConfig};
use qari_rc::upload::Uploader;
use qari_rc::{encode, validate};

/// Recitation capture and submission client
#[derive(Parser, Debug)]
#[command(name = "qari-rc", version, about)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "QARI_RC_CONFIG")]
    config: Option<PathBuf>,

    /// Transcription service base URL override
    #[arg(long, env = "QARI_SERVICE_URL")]
    service_url: Option<String>,

    /// Input device name override
    #[arg(long, env = "QARI_INPUT_DEVICE")]
    device: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a recitation from the microphone and submit it
    Record {
        /// Assignment being recited
        #[arg(long)]
        assignment: Uuid,

        /// Student submitting the recitation
        #[arg(long)]
        student: Uuid,
    },
    /// Validate an existing audio file and submit it
    Import {
        /// Audio file to submit (wav, mp3, m4a, ogg, flac, webm)
        file: PathBuf,

        /// Assignment being recited
        #[arg(long)]
        assignment: Uuid,

        /// Student submitting the recitation
        #[arg(long)]
        student: Uuid,
    },
    /// List available input devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path("qari-rc"));
    let toml_config: TomlConfig = load_or_create_toml_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let overrides = ConfigOverrides {
        service_url: args.service_url.clone(),
        input_device: args.device.clone(),
    };
    let config = ClientConfig::resolve(toml_config, overrides);

    // RUST_LOG takes precedence over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    match args.command {
        Command::Devices => list_devices(),
        Command::Record {
            assignment,
            student,
        } => record_and_submit(&config, assignment, student).await,
        Command::Import {
            file,
            assignment,
            student,
        } => submit_file(&config, &file, assignment, student, false).await,
    }
}

fn list_devices() -> Result<()> {
    let devices = device::list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
        return Ok(());
    }

    println!("Available input devices:");
    for name in devices {
        println!("  {}", name);
    }
    Ok(())
}

/// Record from the microphone, stage the WAV locally, then submit it.
///
/// The capture stream is not Send, so the session lives entirely on this
/// thread; only the upload is async.
async fn record_and_submit(
    config: &ClientConfig,
    assignment_id: Uuid,
    student_id: Uuid,
) -> Result<()> {
    let session = CaptureSession::start(config.input_device.as_deref())?;
    println!(
        "Recording... press Enter to stop (auto-stops at {:.0}s)",
        media::MAX_DURATION_SECS
    );

    wait_for_stop(&session).await?;

    let wav = session.stop()?;
    let staging = staging_path()?;
    tokio::fs::write(&staging, &wav)
        .await
        .with_context(|| format!("Failed to write recording to {}", staging.display()))?;
    println!("Recording saved to {}", staging.display());

    submit_file(config, &staging, assignment_id, student_id, true).await
}

/// Block until the user presses Enter or the recording ceiling is hit.
///
/// The elapsed time shown here is wall-clock progress only; acceptance
/// is decided later from the decoded audio's intrinsic duration.
async fn wait_for_stop(session: &CaptureSession) -> Result<()> {
    use std::io::Write;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                line.context("Failed to read stdin")?;
                println!();
                return Ok(());
            }
            _ = ticker.tick() => {
                if session.ceiling_reached() {
                    println!("\nRecording ceiling reached, stopping");
                    return Ok(());
                }
                print!("\r{} {:>6.1}s", session.state(), session.elapsed().as_secs_f64());
                std::io::stdout().flush().ok();
            }
        }
    }
}

/// Fresh staging file path under the user's data directory.
fn staging_path() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("qari")
        .join("recordings");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    Ok(dir.join(format!(
        "recitation-{}.wav",
        chrono::Utc::now().timestamp_millis()
    )))
}

/// Validate, re-encode, and upload one audio file.
///
/// A failed re-encode falls back to uploading the original bytes; a
/// failed upload leaves the local file in place so the student can try
/// again without re-recording.
async fn submit_file(
    config: &ClientConfig,
    path: &Path,
    assignment_id: Uuid,
    student_id: Uuid,
    remove_after_upload: bool,
) -> Result<()> {
    let validated = validate::validate_file(path)?;
    println!(
        "Validated {} ({:.1}s, {})",
        path.display(),
        validated.duration_secs,
        validated.content_type
    );

    let (bytes, content_type) = match encode::to_wav_16k_mono(&validated.decoded) {
        Ok(wav) => (wav, "audio/wav"),
        Err(e) => {
            warn!("Re-encode failed, uploading the original audio: {}", e);
            (validated.bytes, validated.content_type)
        }
    };

    let uploader = Uploader::new(config.service_url.clone(), config.retry.clone())?;
    match uploader
        .upload(assignment_id, student_id, bytes, content_type)
        .await
    {
        Ok(receipt) => {
            println!("Submission accepted: {}", receipt.submission_id);
            println!(
                "Stored at: {}{}",
                config.service_url.trim_end_matches('/'),
                receipt.audio_url
            );
            if remove_after_upload {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    warn!("Failed to remove staging file {}: {}", path.display(), e);
                }
            }
            Ok(())
        }
        Err(e) => {
            println!("Upload did not complete: {}", e);
            println!(
                "Your recording is kept at {} for resubmission",
                path.display()
            );
            Err(e.into())
        }
    }
}
