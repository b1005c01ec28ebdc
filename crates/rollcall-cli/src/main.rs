use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod capture;
mod config;
mod kiosk;
mod notify;
mod screen;
#[cfg(test)]
mod testing;
mod viewer;

use capture::{CaptureController, TRAINING_LABEL, TRAIN_PROMPT};
use config::Config;
use notify::Notifier;
use rollcall_client::HttpClient;
use rollcall_hw::{Camera, CaptureRequest, V4lProvider};
use viewer::AttendanceViewer;

#[derive(Parser)]
#[command(name = "rollcall", about = "Classroom face-recognition attendance kiosk")]
struct Cli {
    /// Recognition server base URL (overrides ROLLCALL_SERVER_URL)
    #[arg(long, global = true)]
    server: Option<String>,

    /// V4L2 camera device (overrides ROLLCALL_CAMERA_DEVICE)
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered students
    Students,
    /// Recognize faces in an image file
    Recognize {
        /// Image to submit
        file: PathBuf,
    },
    /// Capture one photo from the camera and recognize faces
    Capture,
    /// Retrain the recognition model
    Train {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show today's attendance
    Today,
    /// Show all attendance records
    History,
    /// Interactive kiosk session
    Kiosk,
    /// List V4L2 capture devices
    Devices,
}

type Controller = CaptureController<V4lProvider, HttpClient>;

fn build(config: &Config) -> (Controller, AttendanceViewer<HttpClient>) {
    let api = HttpClient::new(&config.server_url, config.http_timeout());
    let notifier = Notifier::new(config.notification_delay()).with_echo();
    let request = CaptureRequest {
        device_path: config.camera_device.clone(),
        ideal_width: config.capture_width,
        ideal_height: config.capture_height,
    };

    let capture = CaptureController::new(V4lProvider, api.clone(), notifier.clone(), request, config.jpeg_quality)
        .with_busy_echo();
    let viewer = AttendanceViewer::new(api, notifier).with_busy_echo();
    (capture, viewer)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(device) = cli.device {
        config.camera_device = device;
    }
    tracing::debug!(?config, "configuration loaded");

    let (mut capture, mut viewer) = build(&config);

    match cli.command {
        Commands::Students => {
            let loaded = capture.load_students().await;
            print!("{}", screen::render(capture.roster()));
            loaded?;
        }
        Commands::Recognize { file } => {
            let outcome = capture.upload_file(&file).await;
            print!("{}", screen::render(capture.results()));
            outcome?;
        }
        Commands::Capture => {
            capture.start_camera()?;
            let outcome = capture.capture_photo().await;
            capture.stop_camera();
            print!("{}", screen::render(capture.results()));
            outcome?;
        }
        Commands::Train { yes } => {
            let confirmed = if yes {
                true
            } else {
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                let mut lines = tokio::io::AsyncBufReadExt::lines(stdin);
                kiosk::confirm(&mut lines, &mut std::io::stdout(), TRAIN_PROMPT).await?
            };
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
            println!("⏳ {TRAINING_LABEL}");
            capture.train_model(true).await?;
        }
        Commands::Today => {
            viewer.load_today().await?;
            print!("{}", screen::render(viewer.results()));
        }
        Commands::History => {
            viewer.load_all().await?;
            print!("{}", screen::render(viewer.results()));
        }
        Commands::Kiosk => {
            tracing::info!(server = %config.server_url, device = %config.camera_device, "kiosk starting");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            kiosk::run(&mut capture, &mut viewer, stdin, &mut std::io::stdout()).await?;
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                bail!("no V4L2 capture devices found");
            }
            for d in devices {
                println!("{}  {}  ({}, {})", d.path, d.card, d.driver, d.bus);
            }
        }
    }

    Ok(())
}
