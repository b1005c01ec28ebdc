//! rollcall-hw: Camera capture for the attendance kiosk.
//!
//! Provides V4L2-based camera access behind the [`CameraProvider`] /
//! [`VideoStream`] traits, with frames delivered as packed RGB.

pub mod camera;
pub mod frame;

pub use camera::{
    Camera, CameraError, CameraProvider, CaptureRequest, DeviceInfo, PixelFormat, V4lProvider,
    VideoStream,
};
pub use frame::Frame;
