use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lookout_gateway::capture::sim::SimFrameSource;
use lookout_gateway::session::COMMAND_WHO_IS_IN_MY_ROOM;
use lookout_gateway::{
    AnalysisClient, Config, ConsoleHost, EncodedImage, FaceDetector, ImageFormat, PixelFormat,
    SessionController, StdioHost, VoiceCommand, compose_message,
};

/// Lookout - Voice-triggered camera capture and face analysis gateway
#[derive(Parser)]
#[command(name = "lookout", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one voice session over the stdio host protocol (default)
    Serve,
    /// Run a session against the console host with the synthetic camera
    Simulate {
        /// Location label for the session
        #[arg(short, long, default_value = "the room")]
        location: String,

        /// Command name to invoke
        #[arg(short, long, default_value = COMMAND_WHO_IS_IN_MY_ROOM)]
        command: String,

        /// Source pixel format the synthetic camera emits
        /// (bgra8, rgba8, gray8, nv12, yuy2)
        #[arg(short, long, default_value = "nv12")]
        format: String,
    },
    /// Enumerate capture device groups and print them
    Devices,
    /// Upload an existing image file and print the composed message
    Detect {
        /// Path to an encoded image
        file: PathBuf,

        /// Location label for the composed message
        #[arg(short, long, default_value = "the room")]
        location: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,lookout_gateway=info",
        1 => "info,lookout_gateway=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None | Some(Command::Serve) => serve().await,
        Some(Command::Simulate {
            location,
            command,
            format,
        }) => simulate(&location, command, &format).await,
        Some(Command::Devices) => devices().await,
        Some(Command::Detect { file, location }) => detect(&file, &location).await,
    }
}

/// Run one voice session over the stdio host protocol
async fn serve() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    // The synthetic backend is the in-tree frame source; platform capture
    // backends plug in behind the FrameSource trait.
    let source = Arc::new(SimFrameSource::new());
    let detector: Arc<dyn FaceDetector> = Arc::new(AnalysisClient::new(&config.analysis)?);

    let controller = SessionController::new(config, source, detector);
    let host = Arc::new(StdioHost::new());

    tracing::info!("lookout gateway ready, waiting for an invocation");
    controller.handle_invocation(host).await?;
    Ok(())
}

/// Run a session against the console host with the synthetic camera
async fn simulate(location: &str, command: String, format: &str) -> anyhow::Result<()> {
    let config = Config::load()?;

    let source = Arc::new(SimFrameSource::new().with_format(format.parse::<PixelFormat>()?));
    let detector: Arc<dyn FaceDetector> = Arc::new(AnalysisClient::new(&config.analysis)?);

    let controller = SessionController::new(config, source, detector);
    let host = Arc::new(ConsoleHost::new(VoiceCommand::with_slot(
        &command, "location", location,
    )));

    controller.handle_invocation(host).await?;
    Ok(())
}

/// Enumerate capture device groups and print them
async fn devices() -> anyhow::Result<()> {
    use lookout_gateway::FrameSource;

    let source = SimFrameSource::new();
    let groups = source.enumerate().await?;

    if groups.is_empty() {
        println!("No capture devices found");
        return Ok(());
    }

    for group in groups {
        println!("{} ({})", group.display_name, group.id);
        for kind in group.source_kinds {
            println!("  - {kind:?}");
        }
    }
    Ok(())
}

/// Upload an existing image file and print the composed message
async fn detect(file: &std::path::Path, location: &str) -> anyhow::Result<()> {
    let config = Config::load()?;

    let format = file
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|e| e.parse::<ImageFormat>().ok())
        .unwrap_or(ImageFormat::Png);

    let bytes = std::fs::read(file)?;
    let image = EncodedImage { format, bytes };

    let client = AnalysisClient::new(&config.analysis)?;
    let faces = client.detect_faces(&image, Duration::from_secs(20)).await;

    println!("{}", compose_message(&faces, location));
    Ok(())
}
