//! Declarative views: pure functions from server payloads to display nodes.
//!
//! Nothing here keeps state between calls: every render starts from the
//! latest payload alone, so stale results can never bleed into new ones.

use crate::format;
use crate::types::{AttendanceRecord, RecognitionResult};
use std::fmt;

/// Guidance shown when a recognition pass finds no faces at all.
pub const NO_FACES_GUIDANCE: &[&str] = &[
    "No faces recognized in the image. Please ensure:",
    "• The image is clear and well-lit",
    "• Faces are visible and not obscured",
    "• The model has been trained with student photos",
];

pub const NO_STUDENTS_PLACEHOLDER: &[&str] = &[
    "No students registered yet.",
    "Add student photos to the 'student_photos' folder.",
];

/// Banner severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
        })
    }
}

/// A message destined for the notification banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Success }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Error }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), severity: Severity::Info }
    }
}

/// One display element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Muted explanatory text standing in for absent content.
    Placeholder(Vec<String>),
    /// Section summary, e.g. "2 Student(s) Recognized".
    Summary {
        title: String,
        detail: String,
        severity: Severity,
    },
    StudentCard {
        student_id: String,
        /// Percentage with one decimal, without the `%` sign.
        confidence: String,
    },
    UnknownCard {
        /// 1-based position in the server's list.
        ordinal: usize,
    },
    /// Roster entry.
    Tag(String),
    DateSection {
        title: String,
        body: Vec<Node>,
    },
    AttendanceCard {
        student_id: String,
        status: String,
        timestamp: String,
    },
    TotalPresent(usize),
}

impl Node {
    fn placeholder<S: AsRef<str>>(lines: &[S]) -> Self {
        Node::Placeholder(lines.iter().map(|l| l.as_ref().to_string()).collect())
    }
}

/// Output of rendering a recognition response.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionView {
    pub nodes: Vec<Node>,
    /// Banner message raised alongside the nodes.
    pub notice: Notice,
}

/// Render a successful `/recognize` response.
pub fn recognition(result: &RecognitionResult) -> RecognitionView {
    let recognized = &result.recognized_students;
    let unknown = &result.unknown_persons;

    if recognized.is_empty() && unknown.is_empty() {
        return RecognitionView {
            nodes: vec![Node::placeholder(NO_FACES_GUIDANCE)],
            notice: Notice::info(result.message.clone()),
        };
    }

    let mut nodes = Vec::with_capacity(recognized.len() + unknown.len() + 2);

    if !recognized.is_empty() {
        nodes.push(Node::Summary {
            title: format!("{} Student(s) Recognized", recognized.len()),
            detail: "Attendance marked successfully".to_string(),
            severity: Severity::Success,
        });
        nodes.extend(recognized.iter().map(|s| Node::StudentCard {
            student_id: s.student_id.clone(),
            confidence: format::confidence_percent(s.confidence),
        }));
    }

    // The alert overrides the success banner when both sections render.
    let notice = if unknown.is_empty() {
        Notice::success(format!("{} student(s) marked present", recognized.len()))
    } else {
        nodes.push(Node::Summary {
            title: "Security Alert".to_string(),
            detail: format!("{} Unknown Person(s) Detected!", unknown.len()),
            severity: Severity::Error,
        });
        nodes.extend((1..=unknown.len()).map(|ordinal| Node::UnknownCard { ordinal }));
        Notice::error(format!(
            "SECURITY ALERT: {} unknown person(s) detected in classroom!",
            unknown.len()
        ))
    };

    RecognitionView { nodes, notice }
}

/// Render a `/recognize` response with `success: false`.
pub fn recognition_rejected(message: &str) -> RecognitionView {
    let text = format!("Error: {message}");
    RecognitionView {
        nodes: vec![Node::placeholder(&[text.as_str()])],
        notice: Notice::error(text),
    }
}

/// Render a recognition attempt that never produced a usable response.
pub fn recognition_failed(reason: &str) -> RecognitionView {
    RecognitionView {
        nodes: vec![Node::placeholder(&["Error processing image"])],
        notice: Notice::error(format!("Error processing image: {reason}")),
    }
}

/// Roster panel: one tag per student in fetch order, or registration help.
pub fn roster(students: &[String]) -> Vec<Node> {
    if students.is_empty() {
        return vec![Node::placeholder(NO_STUDENTS_PLACEHOLDER)];
    }
    students.iter().cloned().map(Node::Tag).collect()
}

pub fn roster_unavailable() -> Vec<Node> {
    vec![Node::placeholder(&["Error loading students"])]
}

/// One date section: header, then cards and a total, or `empty_text`.
pub fn date_section(record: &AttendanceRecord, empty_text: &str) -> Node {
    let body = if record.records.is_empty() {
        vec![Node::placeholder(&[empty_text])]
    } else {
        let mut body: Vec<Node> = record
            .records
            .iter()
            .map(|(id, entry)| Node::AttendanceCard {
                student_id: id.to_string(),
                status: entry.status.clone(),
                timestamp: entry.timestamp.clone(),
            })
            .collect();
        body.push(Node::TotalPresent(record.records.len()));
        body
    };

    Node::DateSection {
        title: format::long_date(&record.date),
        body,
    }
}

/// Today's attendance.
pub fn today(record: &AttendanceRecord) -> Vec<Node> {
    vec![date_section(record, "No attendance records for today")]
}

/// Full history, one section per date in server order.
pub fn history(records: &[AttendanceRecord]) -> Vec<Node> {
    if records.is_empty() {
        return vec![Node::placeholder(&["No attendance records found"])];
    }
    records
        .iter()
        .map(|r| date_section(r, "No records for this date"))
        .collect()
}
