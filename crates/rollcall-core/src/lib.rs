//! rollcall-core: Attendance kiosk data model and views.
//!
//! Wire types for the recognition server's JSON contract, JPEG data-URL
//! encoding for submitted stills, and pure render functions that turn
//! server payloads into display nodes.

pub mod format;
pub mod still;
pub mod types;
pub mod view;

pub use still::{EncodeError, StillImage, DEFAULT_JPEG_QUALITY};
pub use types::{
    AttendanceEntry, AttendanceRecord, HistoryResponse, RecognitionResult, RecognizeRequest,
    RecognizedStudent, StudentRecords, StudentsResponse, TodayResponse, TrainResponse,
    UnknownPerson,
};
pub use view::{Node, Notice, Severity};
