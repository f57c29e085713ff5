use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use voicegate::config::VadConfig;
use voicegate::model::{ModelSource, ModelVariant};
use voicegate::streaming::{VadEngine, VadEvent};

#[derive(Parser, Debug)]
#[command(
    name = "voicegate",
    version,
    about = "Streaming voice activity detection over raw PCM"
)]
struct Cli {
    /// Raw s16le mono 16 kHz PCM file, or "-" for stdin.
    input: String,

    /// Path to a Silero VAD ONNX model file.
    #[arg(long, conflicts_with = "model_url")]
    model_path: Option<PathBuf>,

    /// URL to fetch the model from instead of a local path.
    #[arg(long)]
    model_url: Option<String>,

    /// Model architecture: v4 or v5.
    #[arg(long, default_value = "v5")]
    model: String,

    /// TOML configuration file (detector tuning).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit in-flight speech chunks of this many frames (0 disables).
    #[arg(long, default_value_t = 0)]
    emit_frames: usize,

    /// Also print one line per processed frame.
    #[arg(long)]
    print_frames: bool,
}

/// Initialize logging, filtered by `VOICEGATE_LOG` (default: warn).
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::builder()
        .with_env_var("VOICEGATE_LOG")
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_variant(name: &str) -> anyhow::Result<ModelVariant> {
    match name {
        "v4" => Ok(ModelVariant::V4),
        "v5" => Ok(ModelVariant::V5),
        other => anyhow::bail!("unknown model variant '{}' (expected v4 or v5)", other),
    }
}

fn print_event(event: &VadEvent, print_frames: bool) {
    match event {
        VadEvent::FrameProcessed { time, probabilities, .. } => {
            if print_frames {
                println!("{:9.3}s  frame       p={:.3}", time, probabilities.is_speech);
            }
        }
        VadEvent::SpeechStart { time } => println!("{:9.3}s  start", time),
        VadEvent::SpeechRealStart { time } => println!("{:9.3}s  real-start", time),
        VadEvent::Chunk {
            time,
            audio,
            is_final,
        } => {
            let label = if *is_final { "final-chunk" } else { "chunk" };
            println!("{:9.3}s  {:11} {} samples", time, label, audio.len());
        }
        VadEvent::SpeechEnd { time, audio } => {
            println!("{:9.3}s  end         {} samples", time, audio.len());
        }
        VadEvent::Misfire { time } => println!("{:9.3}s  misfire", time),
        VadEvent::Error { time, message } => {
            println!("{:9.3}s  error       {}", time, message);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let variant = parse_variant(&cli.model)?;
    // A config file carries its own model selection; --model applies
    // otherwise.
    let mut config = match &cli.config {
        Some(path) => VadConfig::load(path)?,
        None => VadConfig::for_model(variant),
    };
    if cli.emit_frames > 0 {
        config.num_frames_to_emit = cli.emit_frames;
    }

    let source = if let Some(path) = cli.model_path {
        ModelSource::Path(path)
    } else if let Some(url) = cli.model_url {
        ModelSource::Url(url)
    } else {
        anyhow::bail!("either --model-path or --model-url is required");
    };

    let mut engine = VadEngine::new(config, source).await?;

    let mut reader: Box<dyn Read> = if cli.input == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(std::fs::File::open(&cli.input)?)
    };

    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        for event in engine.process_audio_data(&buf[..n])? {
            print_event(&event, cli.print_frames);
        }
    }

    // Deliver any validated speech still open at end of input.
    for event in engine.force_end_speech() {
        print_event(&event, cli.print_frames);
    }

    eprintln!("{} frames processed", engine.total_frames_processed());
    Ok(())
}
