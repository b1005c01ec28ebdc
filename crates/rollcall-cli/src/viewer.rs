//! Attendance history screen. Read-only.

use crate::notify::Notifier;
use crate::screen::BusyIndicator;
use rollcall_client::{ApiError, AttendanceApi};
use rollcall_core::view::{self, Node};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("server: {0}")]
    Api(#[from] ApiError),
    #[error("server rejected request: {0}")]
    Rejected(String),
    #[error("response is missing attendance data")]
    MissingData,
}

/// Controller for the attendance screen.
pub struct AttendanceViewer<A> {
    api: A,
    notifier: Notifier,
    busy: BusyIndicator,
    results: Vec<Node>,
}

impl<A: AttendanceApi> AttendanceViewer<A> {
    pub fn new(api: A, notifier: Notifier) -> Self {
        Self {
            api,
            notifier,
            busy: BusyIndicator::new("Loading attendance..."),
            results: Vec::new(),
        }
    }

    pub fn with_busy_echo(mut self) -> Self {
        self.busy = BusyIndicator::new("Loading attendance...").with_echo();
        self
    }

    pub fn results(&self) -> &[Node] {
        &self.results
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_visible()
    }

    /// Today's attendance as a single date section.
    pub async fn load_today(&mut self) -> Result<(), ViewerError> {
        self.busy.show();
        self.results.clear();

        let outcome = match self.api.attendance_today().await {
            Ok(resp) if resp.success => resp.data.ok_or(ViewerError::MissingData),
            Ok(resp) => Err(ViewerError::Rejected(resp.message.unwrap_or_default())),
            Err(e) => Err(e.into()),
        };
        self.busy.hide();

        match outcome {
            Ok(record) => {
                tracing::info!(date = %record.date, present = record.records.len(), "loaded today's attendance");
                self.results = view::today(&record);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Every recorded date, in the order the server returns them.
    pub async fn load_all(&mut self) -> Result<(), ViewerError> {
        self.busy.show();
        self.results.clear();

        let outcome = match self.api.attendance_all().await {
            Ok(resp) if resp.success => Ok(resp.data),
            Ok(resp) => Err(ViewerError::Rejected(resp.message.unwrap_or_default())),
            Err(e) => Err(e.into()),
        };
        self.busy.hide();

        match outcome {
            Ok(records) => {
                tracing::info!(dates = records.len(), "loaded attendance history");
                self.results = view::history(&records);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    fn report(&self, e: ViewerError) -> ViewerError {
        tracing::warn!(error = %e, "attendance request failed");
        match &e {
            ViewerError::Rejected(message) => {
                self.notifier.error(format!("Error loading attendance: {message}"))
            }
            other => self.notifier.error(format!("Error: {other}")),
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DEFAULT_DISMISS_AFTER;
    use crate::testing::FakeApi;
    use rollcall_core::Severity;

    fn viewer(api: FakeApi) -> AttendanceViewer<FakeApi> {
        AttendanceViewer::new(api, Notifier::new(DEFAULT_DISMISS_AFTER))
    }

    fn section(node: &Node) -> (&str, &[Node]) {
        match node {
            Node::DateSection { title, body } => (title.as_str(), body.as_slice()),
            other => panic!("expected a date section, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_today_with_records() {
        let api = FakeApi::default().today_with(
            r#"{"success":true,"data":{"date":"2024-01-01","records":{
                "S2": {"status":"Present","timestamp":"2024-01-01 09:01:00"},
                "S1": {"status":"Present","timestamp":"2024-01-01 09:00:00"},
                "S3": {"status":"Present","timestamp":"2024-01-01 09:05:00"}
            }}}"#,
        );
        let mut v = viewer(api);
        v.load_today().await.unwrap();

        assert_eq!(v.results().len(), 1);
        let (title, body) = section(&v.results()[0]);
        assert_eq!(title, "Monday, January 1, 2024");
        assert_eq!(body.last(), Some(&Node::TotalPresent(3)));
        assert_eq!(
            body[0],
            Node::AttendanceCard {
                student_id: "S2".into(),
                status: "Present".into(),
                timestamp: "2024-01-01 09:01:00".into(),
            }
        );
        assert!(!v.is_busy());
    }

    #[tokio::test]
    async fn test_load_today_empty() {
        let mut v = viewer(FakeApi::default());
        v.load_today().await.unwrap();
        let (_, body) = section(&v.results()[0]);
        assert_eq!(body, &[Node::Placeholder(vec!["No attendance records for today".into()])]);
    }

    #[tokio::test]
    async fn test_load_all_sections_in_server_order() {
        let api = FakeApi::default().all_with(
            r#"{"success":true,"data":[
                {"date":"2024-01-02","records":{"a":{"status":"Present","timestamp":"t"}}},
                {"date":"2024-01-03","records":{}},
                {"date":"2024-01-01","records":{"a":{"status":"Present","timestamp":"t"},"b":{"status":"Present","timestamp":"t"}}}
            ]}"#,
        );
        let mut v = viewer(api);
        v.load_all().await.unwrap();

        let titles: Vec<&str> = v.results().iter().map(|n| section(n).0).collect();
        assert_eq!(
            titles,
            vec![
                "Tuesday, January 2, 2024",
                "Wednesday, January 3, 2024",
                "Monday, January 1, 2024"
            ]
        );
        assert_eq!(
            section(&v.results()[1]).1,
            &[Node::Placeholder(vec!["No records for this date".into()])]
        );
        assert_eq!(section(&v.results()[2]).1.last(), Some(&Node::TotalPresent(2)));
    }

    #[tokio::test]
    async fn test_load_all_empty() {
        let mut v = viewer(FakeApi::default());
        v.load_all().await.unwrap();
        assert_eq!(
            v.results(),
            &[Node::Placeholder(vec!["No attendance records found".into()])]
        );
    }

    #[tokio::test]
    async fn test_failure_renders_nothing_and_hides_busy() {
        let api = FakeApi::default()
            .all_with(r#"{"success":true,"data":[{"date":"2024-01-01","records":{}}]}"#)
            .today_fails();
        let mut v = viewer(api);
        v.load_all().await.unwrap();
        assert!(!v.results().is_empty());

        assert!(matches!(v.load_today().await, Err(ViewerError::Api(_))));
        assert!(v.results().is_empty());
        assert!(!v.is_busy());
        let banner = v.notifier.banner();
        assert_eq!(banner.severity, Severity::Error);
        assert!(banner.text.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_server_rejection() {
        let api = FakeApi::default().all_with(r#"{"success":false,"message":"disk full"}"#);
        let mut v = viewer(api);
        assert!(matches!(v.load_all().await, Err(ViewerError::Rejected(_))));
        assert!(v.results().is_empty());
        assert_eq!(v.notifier.banner().text, "Error loading attendance: disk full");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_not_partially_rendered() {
        let api = FakeApi::default()
            .all_with(r#"{"success":true,"data":[{"date":"2024-01-01","records":{"a":{"status":"Present"}}}]}"#)
            .all_fails();
        let mut v = viewer(api);
        assert!(matches!(v.load_all().await, Err(ViewerError::Api(ApiError::Decode { .. }))));
        assert!(v.results().is_empty());
        assert!(v.load_all().await.is_err());
        assert!(v.results().is_empty());
    }

    #[tokio::test]
    async fn test_today_missing_data() {
        let api = FakeApi::default().today_with(r#"{"success":true}"#);
        let mut v = viewer(api);
        assert!(matches!(v.load_today().await, Err(ViewerError::MissingData)));
        assert_eq!(v.notifier.banner().text, "Error: response is missing attendance data");
    }
}
