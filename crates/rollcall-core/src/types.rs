use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Pixel box of a detected face in the submitted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// A face the server matched to a registered student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedStudent {
    pub student_id: String,
    /// Match confidence in [0, 1].
    pub confidence: f64,
    /// Cosine distance to the best gallery entry, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<FaceLocation>,
}

/// A detected face with no match in the roster.
///
/// Markers are opaque: only their count matters. Decoding never fails on a
/// marker; fields that are missing or have an unexpected shape are left
/// empty, and a marker that is not an object at all becomes the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "UnknownMarker")]
pub struct UnknownPerson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<FaceLocation>,
    /// Distance to the closest (rejected) gallery entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Wire shape of an unknown-person marker, as lenient as the server is.
#[derive(Deserialize)]
#[serde(untagged)]
enum UnknownMarker {
    Fields {
        #[serde(default)]
        location: Option<Lenient<FaceLocation>>,
        #[serde(default)]
        confidence: Option<Lenient<f64>>,
    },
    Opaque(IgnoredAny),
}

/// A value that is kept when it has the expected shape and dropped otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Ignored(IgnoredAny),
}

impl<T> Lenient<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Ignored(_) => None,
        }
    }
}

impl From<UnknownMarker> for UnknownPerson {
    fn from(marker: UnknownMarker) -> Self {
        match marker {
            UnknownMarker::Fields { location, confidence } => Self {
                location: location.and_then(Lenient::into_option),
                confidence: confidence.and_then(Lenient::into_option),
            },
            UnknownMarker::Opaque(_) => Self::default(),
        }
    }
}

/// Body of `POST /recognize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeRequest {
    /// Data-URL encoded still (`data:image/jpeg;base64,...`).
    pub image: String,
}

/// Response of `POST /recognize`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recognized_students: Vec<RecognizedStudent>,
    #[serde(default)]
    pub unknown_persons: Vec<UnknownPerson>,
    /// Today's attendance after the server marked the recognized students.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceRecord>,
    /// Set by the server whenever unknown persons were detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<bool>,
}

/// Response of `POST /train`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /students`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentsResponse {
    pub success: bool,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Presence entry for one student on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub status: String,
    pub timestamp: String,
}

/// Student id → entry, in the order the server sent them.
///
/// JSON objects carry no ordering guarantee in serde_json's default map, so
/// entries are collected into a vector while deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentRecords(Vec<(String, AttendanceEntry)>);

impl StudentRecords {
    pub fn new(entries: Vec<(String, AttendanceEntry)>) -> Self {
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttendanceEntry)> {
        self.0.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn get(&self, student_id: &str) -> Option<&AttendanceEntry> {
        self.0
            .iter()
            .find(|(id, _)| id == student_id)
            .map(|(_, entry)| entry)
    }
}

impl Serialize for StudentRecords {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(id, entry)| (id, entry)))
    }
}

impl<'de> Deserialize<'de> for StudentRecords {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordsVisitor;

        impl<'de> Visitor<'de> for RecordsVisitor {
            type Value = StudentRecords;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of student id to attendance entry")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, AttendanceEntry)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((id, entry)) = map.next_entry::<String, AttendanceEntry>()? {
                    // Later duplicates win, matching JSON object semantics.
                    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == id) {
                        slot.1 = entry;
                    } else {
                        entries.push((id, entry));
                    }
                }
                Ok(StudentRecords(entries))
            }
        }

        deserializer.deserialize_map(RecordsVisitor)
    }
}

/// Attendance for a single calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Calendar date as sent by the server (`YYYY-MM-DD`).
    pub date: String,
    #[serde(default)]
    pub records: StudentRecords,
}

/// Response of `GET /attendance/today`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AttendanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of `GET /attendance/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<AttendanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
