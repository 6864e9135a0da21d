use anyhow::{Context, Result};
use capture_fx::activity::{ActivityTracker, InputEvent};
use capture_fx::capture::{list_cameras, SyntheticProvider, WebcamProvider};
use capture_fx::config::Config;
use capture_fx::dialog::ConsolePresenter;
use capture_fx::{
    CaptureOptions, CaptureSession, FacingMode, ImageDataUri, MediaDeviceProvider, SessionState,
};
use clap::Parser;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List attached cameras and exit
    #[arg(long)]
    list_devices: bool,

    /// Use a generated test feed instead of a real camera
    #[arg(long)]
    synthetic: bool,

    /// Camera to start with: environment (back) or user (front)
    #[arg(long)]
    facing: Option<FacingMode>,

    /// Directory submitted images are written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Close the dialog after this many seconds without input
    #[arg(long)]
    idle_timeout: Option<u64>,

    /// Do not show an alert when the camera cannot be opened
    #[arg(long)]
    no_alerts: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.list_devices {
        for camera in list_cameras().context("Failed to enumerate cameras")? {
            println!("{camera}");
        }
        return Ok(());
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    let mut options = config.capture_options();
    if args.no_alerts {
        options.error = false;
    }
    let facing = args.facing.unwrap_or(config.camera.facing_mode);
    let out_dir = args
        .out_dir
        .or_else(|| config.output.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let idle_timeout = args
        .idle_timeout
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .or_else(|| config.idle_timeout());

    tracing::info!("capture-fx starting");
    tracing::info!("Initial camera: {}", facing);
    tracing::info!("Output directory: {}", out_dir.display());

    let images = if args.synthetic {
        tracing::info!("Using synthetic camera feed");
        run_session(SyntheticProvider::new(), options, facing, idle_timeout).await?
    } else {
        run_session(WebcamProvider::new(config.camera_map()), options, facing, idle_timeout).await?
    };

    match images {
        Some(images) => write_images(&out_dir, &images)?,
        None => tracing::info!("Dialog closed without submitting"),
    }

    Ok(())
}

async fn run_session<P>(
    provider: P,
    options: CaptureOptions,
    facing: FacingMode,
    idle_timeout: Option<Duration>,
) -> Result<Option<Vec<ImageDataUri>>>
where
    P: MediaDeviceProvider,
{
    let presenter = ConsolePresenter::new();
    let submitted: Rc<RefCell<Option<Vec<ImageDataUri>>>> = Rc::default();

    let mut session =
        CaptureSession::new(provider, presenter.clone(), options).with_facing_mode(facing);
    let sink = Rc::clone(&submitted);
    session.on_submit(move |images| {
        *sink.borrow_mut() = Some(images);
    });

    session.show().await.context("Failed to open camera")?;

    let tracker = idle_timeout.map(ActivityTracker::spawn);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while session.state() != SessionState::Idle {
        presenter.render();

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = wait_idle(tracker.as_ref()) => {
                tracing::info!("Closing idle capture dialog");
                session.hide();
                break;
            }
        };

        let Some(line) = line else {
            session.hide();
            break;
        };
        if let Some(tracker) = &tracker {
            tracker.record(InputEvent::Key);
        }

        match presenter.resolve(&line) {
            Some(action) => {
                if let Err(e) = session.dispatch(action).await {
                    tracing::warn!("{} failed: {}", action, e);
                }
            }
            None => println!("Unknown choice '{}'", line.trim()),
        }
    }

    if let Some(tracker) = tracker {
        tracker.shutdown().await;
    }

    let images = submitted.borrow_mut().take();
    Ok(images)
}

async fn wait_idle(tracker: Option<&ActivityTracker>) {
    match tracker {
        Some(tracker) => tracker.idle().await,
        None => std::future::pending().await,
    }
}

fn write_images(out_dir: &Path, images: &[ImageDataUri]) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    for (n, image) in images.iter().enumerate() {
        let path = out_dir.join(format!("capture-{:03}.png", n + 1));
        let bytes = image.to_bytes().context("Failed to decode captured image")?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
    }

    Ok(())
}
