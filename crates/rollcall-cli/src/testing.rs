//! In-memory camera and server doubles for controller tests.

use rollcall_client::{ApiError, AttendanceApi};
use rollcall_core::{HistoryResponse, RecognitionResult, StudentsResponse, TodayResponse, TrainResponse};
use rollcall_hw::{CameraError, CameraProvider, CaptureRequest, Frame, VideoStream};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct FakeCamera {
    available: bool,
    opened: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn working() -> Self {
        Self {
            available: true,
            opened: Arc::default(),
            stopped: Arc::default(),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            ..Self::working()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct FakeStream {
    label: String,
    width: u32,
    height: u32,
    stopped: Arc<AtomicUsize>,
}

impl VideoStream for FakeStream {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn snapshot(&mut self) -> Result<Frame, CameraError> {
        // small frame keeps JPEG encoding fast
        let (w, h) = (32u32, 18u32);
        Ok(Frame {
            data: vec![140u8; (w * h * 3) as usize],
            width: w,
            height: h,
            timestamp: std::time::Instant::now(),
            sequence: 0,
            is_dark: false,
        })
    }

    fn stop(self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

impl CameraProvider for FakeCamera {
    type Stream = FakeStream;

    fn start(&self, request: &CaptureRequest) -> Result<FakeStream, CameraError> {
        if !self.available {
            return Err(CameraError::NotFound(request.device_path.clone()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeStream {
            label: request.device_path.clone(),
            width: request.ideal_width,
            height: request.ideal_height,
            stopped: Arc::clone(&self.stopped),
        })
    }
}

/// `Ok(json)` replies are decoded on use; `Err(())` becomes a transport error.
type Reply = Result<&'static str, ()>;

#[derive(Default)]
struct Inner {
    recognize: VecDeque<Reply>,
    train: VecDeque<Reply>,
    students: VecDeque<Reply>,
    today: VecDeque<Reply>,
    all: VecDeque<Reply>,
    images: Vec<String>,
    train_calls: usize,
}

/// Scripted server. Each endpoint replays its queue, then falls back to an
/// empty successful response.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    fn push(self, pick: impl FnOnce(&mut Inner) -> &mut VecDeque<Reply>, reply: Reply) -> Self {
        pick(&mut self.inner.lock().unwrap()).push_back(reply);
        self
    }

    pub fn recognize_with(self, json: &'static str) -> Self {
        self.push(|i| &mut i.recognize, Ok(json))
    }

    pub fn recognize_fails(self) -> Self {
        self.push(|i| &mut i.recognize, Err(()))
    }

    pub fn train_with(self, json: &'static str) -> Self {
        self.push(|i| &mut i.train, Ok(json))
    }

    pub fn train_fails(self) -> Self {
        self.push(|i| &mut i.train, Err(()))
    }

    pub fn students_with(self, json: &'static str) -> Self {
        self.push(|i| &mut i.students, Ok(json))
    }

    pub fn students_fails(self) -> Self {
        self.push(|i| &mut i.students, Err(()))
    }

    pub fn today_with(self, json: &'static str) -> Self {
        self.push(|i| &mut i.today, Ok(json))
    }

    pub fn today_fails(self) -> Self {
        self.push(|i| &mut i.today, Err(()))
    }

    pub fn all_with(self, json: &'static str) -> Self {
        self.push(|i| &mut i.all, Ok(json))
    }

    pub fn all_fails(self) -> Self {
        self.push(|i| &mut i.all, Err(()))
    }

    pub fn recognize_calls(&self) -> usize {
        self.inner.lock().unwrap().images.len()
    }

    pub fn train_calls(&self) -> usize {
        self.inner.lock().unwrap().train_calls
    }

    pub fn last_image(&self) -> Option<String> {
        self.inner.lock().unwrap().images.last().cloned()
    }

    fn reply<T: DeserializeOwned>(
        &self,
        path: &str,
        pick: impl FnOnce(&mut Inner) -> &mut VecDeque<Reply>,
        fallback: &'static str,
    ) -> Result<T, ApiError> {
        let next = pick(&mut self.inner.lock().unwrap()).pop_front();
        let url = format!("http://fake{path}");
        match next.unwrap_or(Ok(fallback)) {
            Ok(json) => serde_json::from_str(json).map_err(|e| ApiError::Decode {
                url,
                reason: e.to_string(),
            }),
            Err(()) => Err(ApiError::Transport {
                url,
                reason: "Connection refused".into(),
            }),
        }
    }
}

impl AttendanceApi for FakeApi {
    async fn recognize(&self, image_data_url: String) -> Result<RecognitionResult, ApiError> {
        self.inner.lock().unwrap().images.push(image_data_url);
        self.reply(
            "/recognize",
            |i| &mut i.recognize,
            r#"{"success":true,"message":"Found 0 student(s)","recognized_students":[],"unknown_persons":[]}"#,
        )
    }

    async fn train(&self) -> Result<TrainResponse, ApiError> {
        self.inner.lock().unwrap().train_calls += 1;
        self.reply("/train", |i| &mut i.train, r#"{"success":true,"message":"ok"}"#)
    }

    async fn students(&self) -> Result<StudentsResponse, ApiError> {
        self.reply("/students", |i| &mut i.students, r#"{"success":true,"students":[]}"#)
    }

    async fn attendance_today(&self) -> Result<TodayResponse, ApiError> {
        self.reply(
            "/attendance/today",
            |i| &mut i.today,
            r#"{"success":true,"data":{"date":"2024-01-01","records":{}}}"#,
        )
    }

    async fn attendance_all(&self) -> Result<HistoryResponse, ApiError> {
        self.reply("/attendance/all", |i| &mut i.all, r#"{"success":true,"data":[]}"#)
    }
}
