//! Capture/recognition screen: camera lifecycle, uploads, recognition
//! results, model retraining and the student roster.

use crate::notify::Notifier;
use crate::screen::BusyIndicator;
use rollcall_client::{ApiError, AttendanceApi};
use rollcall_core::view::{self, Node};
use rollcall_core::{EncodeError, StillImage};
use rollcall_hw::{CameraError, CameraProvider, CaptureRequest, VideoStream};
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub const TRAIN_LABEL: &str = "Train/Retrain Model";
pub const TRAINING_LABEL: &str = "Training...";
pub const TRAIN_PROMPT: &str = "This will retrain the model with all student photos. Continue?";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no active camera")]
    NoActiveCamera,
    #[error("camera already active")]
    AlreadyActive,
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("image: {0}")]
    Encode(#[from] EncodeError),
    #[error("server: {0}")]
    Api(#[from] ApiError),
    #[error("server rejected request: {0}")]
    Rejected(String),
    #[error("cancelled")]
    Declined,
}

/// Camera lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Inactive,
    Active,
}

/// Enabled state of the camera buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraControls {
    pub start: bool,
    pub capture: bool,
    pub stop: bool,
}

impl fmt::Display for CameraControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool| if on { "on" } else { "off" };
        write!(
            f,
            "start={} capture={} stop={}",
            flag(self.start),
            flag(self.capture),
            flag(self.stop)
        )
    }
}

/// The train button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainControl {
    pub enabled: bool,
    pub label: &'static str,
}

impl Default for TrainControl {
    fn default() -> Self {
        Self {
            enabled: true,
            label: TRAIN_LABEL,
        }
    }
}

/// Disables the train control for its lifetime and restores it on drop,
/// whichever way the request ends.
struct TrainInFlight<'a>(&'a mut TrainControl);

impl<'a> TrainInFlight<'a> {
    fn begin(control: &'a mut TrainControl) -> Self {
        control.enabled = false;
        control.label = TRAINING_LABEL;
        Self(control)
    }
}

impl Drop for TrainInFlight<'_> {
    fn drop(&mut self) {
        *self.0 = TrainControl::default();
    }
}

/// What the preview is bound to while the camera is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub source: String,
    pub width: u32,
    pub height: u32,
}

/// Controller for the capture/recognition screen.
///
/// Owns the single capture session; only [`start_camera`](Self::start_camera)
/// and [`stop_camera`](Self::stop_camera) touch it.
pub struct CaptureController<P: CameraProvider, A> {
    provider: P,
    api: A,
    notifier: Notifier,
    request: CaptureRequest,
    jpeg_quality: u8,
    session: Option<P::Stream>,
    preview: Option<Preview>,
    busy: BusyIndicator,
    train: TrainControl,
    results: Vec<Node>,
    roster: Vec<Node>,
}

impl<P: CameraProvider, A: AttendanceApi> CaptureController<P, A> {
    pub fn new(provider: P, api: A, notifier: Notifier, request: CaptureRequest, jpeg_quality: u8) -> Self {
        Self {
            provider,
            api,
            notifier,
            request,
            jpeg_quality,
            session: None,
            preview: None,
            busy: BusyIndicator::new("Processing image..."),
            train: TrainControl::default(),
            results: Vec::new(),
            roster: Vec::new(),
        }
    }

    pub fn with_busy_echo(mut self) -> Self {
        self.busy = BusyIndicator::new("Processing image...").with_echo();
        self
    }

    pub fn state(&self) -> CameraState {
        if self.session.is_some() {
            CameraState::Active
        } else {
            CameraState::Inactive
        }
    }

    pub fn controls(&self) -> CameraControls {
        let active = self.state() == CameraState::Active;
        CameraControls {
            start: !active,
            capture: active,
            stop: active,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn train_control(&self) -> &TrainControl {
        &self.train
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_visible()
    }

    pub fn results(&self) -> &[Node] {
        &self.results
    }

    pub fn roster(&self) -> &[Node] {
        &self.roster
    }

    /// Open the camera at the configured ideal resolution.
    pub fn start_camera(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            self.notifier.error("Camera is already running");
            return Err(CaptureError::AlreadyActive);
        }

        match self.provider.start(&self.request) {
            Ok(stream) => {
                let (width, height) = stream.resolution();
                self.preview = Some(Preview {
                    source: stream.label().to_string(),
                    width,
                    height,
                });
                self.session = Some(stream);
                tracing::info!(width, height, "camera active");
                self.notifier.success("Camera started successfully");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera start failed");
                self.notifier.error(format!("Error accessing camera: {e}"));
                Err(e.into())
            }
        }
    }

    /// Release the camera. Does nothing when no camera is active.
    pub fn stop_camera(&mut self) {
        let Some(stream) = self.session.take() else {
            return;
        };
        stream.stop();
        self.preview = None;
        self.notifier.info("Camera stopped");
    }

    /// Snapshot the live frame and submit it.
    pub async fn capture_photo(&mut self) -> Result<(), CaptureError> {
        let Some(stream) = self.session.as_mut() else {
            self.notifier.error("Please start the camera first");
            return Err(CaptureError::NoActiveCamera);
        };

        let still = stream
            .snapshot()
            .map_err(CaptureError::from)
            .and_then(|frame| {
                StillImage::from_rgb(&frame.data, frame.width, frame.height, self.jpeg_quality)
                    .map_err(CaptureError::from)
            });

        match still {
            Ok(still) => self.submit_for_recognition(still.to_data_url()).await,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot failed");
                self.notifier.error(format!("Error capturing photo: {e}"));
                Err(e)
            }
        }
    }

    /// Validate, re-encode and submit an image file.
    pub async fn upload_file(&mut self, path: &Path) -> Result<(), CaptureError> {
        match StillImage::from_file(path, self.jpeg_quality) {
            Ok(still) => {
                tracing::info!(path = %path.display(), "uploading image");
                self.submit_for_recognition(still.to_data_url()).await
            }
            Err(e @ EncodeError::NotAnImage(_)) => {
                self.notifier.error("Please select a valid image file");
                Err(e.into())
            }
            Err(e) => {
                self.notifier.error(format!("Error reading image: {e}"));
                Err(e.into())
            }
        }
    }

    /// Send a data-URL still to the server and render the outcome.
    pub async fn submit_for_recognition(&mut self, image_data: String) -> Result<(), CaptureError> {
        self.busy.show();
        self.results.clear();

        let outcome = self.api.recognize(image_data).await;
        self.busy.hide();

        let (rendered, result) = match outcome {
            Ok(response) if response.success => {
                tracing::info!(
                    recognized = response.recognized_students.len(),
                    unknown = response.unknown_persons.len(),
                    "recognition complete"
                );
                (view::recognition(&response), Ok(()))
            }
            Ok(response) => (
                view::recognition_rejected(&response.message),
                Err(CaptureError::Rejected(response.message)),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "recognition request failed");
                (view::recognition_failed(&e.to_string()), Err(e.into()))
            }
        };

        self.results = rendered.nodes;
        self.notifier.show(rendered.notice);
        result
    }

    /// Retrain the server model. Nothing is sent unless `confirmed`.
    pub async fn train_model(&mut self, confirmed: bool) -> Result<(), CaptureError> {
        if !confirmed {
            tracing::info!("retrain declined");
            return Err(CaptureError::Declined);
        }

        let _in_flight = TrainInFlight::begin(&mut self.train);
        match self.api.train().await {
            Ok(resp) if resp.success => {
                self.notifier.success(resp.message);
                Ok(())
            }
            Ok(resp) => {
                self.notifier.error(format!("Error: {}", resp.message));
                Err(CaptureError::Rejected(resp.message))
            }
            Err(e) => {
                self.notifier.error(format!("Error training model: {e}"));
                Err(e.into())
            }
        }
    }

    /// Fetch the roster into the roster panel.
    pub async fn load_students(&mut self) -> Result<(), CaptureError> {
        match self.api.students().await {
            Ok(resp) => {
                let students = if resp.success { resp.students } else { Vec::new() };
                tracing::info!(count = students.len(), "roster loaded");
                self.roster = view::roster(&students);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "roster request failed");
                self.roster = view::roster_unavailable();
                Err(e.into())
            }
        }
    }
}
