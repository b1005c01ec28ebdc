//! rollcall-client: HTTP client for the attendance recognition server.
//!
//! [`AttendanceApi`] is the seam the kiosk controllers are written
//! against; [`HttpClient`] implements it with ureq on tokio's blocking pool.

pub mod api;

pub use api::{ApiError, AttendanceApi, HttpClient};
