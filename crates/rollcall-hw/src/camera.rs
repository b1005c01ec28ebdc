//! Webcam access over V4L2.

use crate::frame::{self, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Raw captures attempted per snapshot before settling for a dark frame.
const SNAPSHOT_ATTEMPTS: usize = 4;

/// Buffers queued for one snapshot stream.
const STREAM_BUFFERS: u32 = 4;

/// Linux errno for a device held open elsewhere.
const EBUSY: i32 = 16;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("no camera at {0}")]
    NotFound(String),
    #[error("{0} is in use by another application")]
    Busy(String),
    #[error("{0} is not a video capture device")]
    NotCapture(String),
    #[error("could not agree on a video format: {0}")]
    Negotiation(String),
    #[error("snapshot failed: {0}")]
    Snapshot(String),
}

/// A capture device found by [`Camera::list_devices`].
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub card: String,
    pub driver: String,
    pub bus: String,
}

/// What to ask the driver for. The resolution is a preference; the driver
/// may negotiate something else.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub device_path: String,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl CaptureRequest {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// A live capture stream. Dropping it releases the device.
pub trait VideoStream {
    /// Negotiated (width, height).
    fn resolution(&self) -> (u32, u32);

    /// Device path or other human-readable source label.
    fn label(&self) -> &str;

    /// Grab the current frame as RGB.
    fn snapshot(&mut self) -> Result<Frame, CameraError>;

    /// Release the device.
    fn stop(self)
    where
        Self: Sized,
    {
    }
}

/// Something that can open a [`VideoStream`].
pub trait CameraProvider {
    type Stream: VideoStream;

    fn start(&self, request: &CaptureRequest) -> Result<Self::Stream, CameraError>;
}

/// Pixel layouts the kiosk can turn into RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One JPEG per buffer. UVC webcams usually only reach 720p this way.
    Mjpeg,
    /// YUYV 4:2:2, 2 bytes/pixel.
    Yuyv,
    /// 8-bit luma only.
    Grey,
}

impl PixelFormat {
    pub fn fourcc(self) -> FourCC {
        FourCC::new(match self {
            PixelFormat::Mjpeg => b"MJPG",
            PixelFormat::Yuyv => b"YUYV",
            PixelFormat::Grey => b"GREY",
        })
    }

    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        [PixelFormat::Mjpeg, PixelFormat::Yuyv, PixelFormat::Grey]
            .into_iter()
            .find(|format| format.fourcc() == fourcc)
    }
}

/// An open webcam with a negotiated format.
pub struct Camera {
    device: Device,
    path: String,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Camera {
    /// Open `request.device_path` and ask for MJPEG at the ideal size.
    pub fn open(request: &CaptureRequest) -> Result<Self, CameraError> {
        let path = request.device_path.as_str();
        let device = open_capture_device(path)?;

        let mut wanted = device
            .format()
            .map_err(|e| CameraError::Negotiation(format!("reading current format: {e}")))?;
        wanted.fourcc = PixelFormat::Mjpeg.fourcc();
        wanted.width = request.ideal_width;
        wanted.height = request.ideal_height;

        let granted = device
            .set_format(&wanted)
            .map_err(|e| CameraError::Negotiation(format!("applying format: {e}")))?;

        // Drivers without MJPEG hand back their native format instead.
        let format = PixelFormat::from_fourcc(granted.fourcc).ok_or_else(|| {
            CameraError::Negotiation(format!("driver offers {}, need MJPG, YUYV or GREY", granted.fourcc))
        })?;

        if (granted.width, granted.height) != (request.ideal_width, request.ideal_height) {
            tracing::info!(
                wanted_width = request.ideal_width,
                wanted_height = request.ideal_height,
                width = granted.width,
                height = granted.height,
                "driver picked a different resolution"
            );
        }
        tracing::info!(device = path, ?format, width = granted.width, height = granted.height, "camera ready");

        Ok(Self {
            device,
            path: path.to_string(),
            width: granted.width,
            height: granted.height,
            format,
        })
    }

    /// Grab one RGB frame. Dark frames from a sensor that is still settling
    /// are skipped; if every attempt is dark the last one is returned.
    pub fn grab(&self) -> Result<Frame, CameraError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::Snapshot(format!("mapping buffers: {e}")))?;

        let mut fallback = None;
        for attempt in 1..=SNAPSHOT_ATTEMPTS {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CameraError::Snapshot(format!("dequeuing buffer: {e}")))?;
            let used = (meta.bytesused as usize).min(buf.len());

            let frame = self.decode(&buf[..used], meta.sequence)?;
            if !frame.is_dark {
                return Ok(frame);
            }
            tracing::debug!(
                attempt,
                seq = meta.sequence,
                brightness = frame.avg_brightness(),
                "dark frame"
            );
            fallback = Some(frame);
        }

        fallback.ok_or_else(|| CameraError::Snapshot("stream produced no frames".into()))
    }

    fn decode(&self, raw: &[u8], sequence: u32) -> Result<Frame, CameraError> {
        let converted = match self.format {
            PixelFormat::Mjpeg => frame::mjpeg_to_rgb(raw),
            PixelFormat::Yuyv => frame::yuyv_to_rgb(raw, self.width, self.height).map(|rgb| (rgb, self.width, self.height)),
            PixelFormat::Grey => frame::grey_to_rgb(raw, self.width, self.height).map(|rgb| (rgb, self.width, self.height)),
        };
        let (data, width, height) =
            converted.map_err(|e| CameraError::Snapshot(format!("{:?} frame: {e}", self.format)))?;

        Ok(Frame {
            is_dark: frame::is_dark_frame(&data, 0.95),
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence,
        })
    }

    /// Video capture devices known to the system, by path.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = v4l::context::enum_devices()
            .into_iter()
            .filter_map(|node| {
                let caps = Device::with_path(node.path()).and_then(|d| d.query_caps()).ok()?;
                caps.capabilities.contains(Flags::VIDEO_CAPTURE).then(|| DeviceInfo {
                    path: node.path().display().to_string(),
                    card: caps.card,
                    driver: caps.driver,
                    bus: caps.bus,
                })
            })
            .collect();
        devices.sort_by(|a, b| a.path.cmp(&b.path));
        devices
    }
}

fn open_capture_device(path: &str) -> Result<Device, CameraError> {
    if !Path::new(path).exists() {
        return Err(CameraError::NotFound(path.to_string()));
    }

    let device = Device::with_path(path).map_err(|e| match e.raw_os_error() {
        Some(EBUSY) => CameraError::Busy(path.to_string()),
        _ => CameraError::NotFound(format!("{path}: {e}")),
    })?;

    let caps = device
        .query_caps()
        .map_err(|e| CameraError::NotFound(format!("{path}: querying capabilities: {e}")))?;
    tracing::debug!(device = path, driver = %caps.driver, card = %caps.card, "opened device");

    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Err(CameraError::NotCapture(path.to_string()));
    }
    Ok(device)
}

impl VideoStream for Camera {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn label(&self) -> &str {
        &self.path
    }

    fn snapshot(&mut self) -> Result<Frame, CameraError> {
        self.grab()
    }

    fn stop(self) {
        tracing::info!(device = %self.path, "camera released");
    }
}

/// Opens V4L2 devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct V4lProvider;

impl CameraProvider for V4lProvider {
    type Stream = Camera;

    fn start(&self, request: &CaptureRequest) -> Result<Camera, CameraError> {
        Camera::open(request)
    }
}
