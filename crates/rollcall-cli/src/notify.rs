//! Notification banner with timed dismissal.
//!
//! One shared banner. Each message replaces the previous one and restarts
//! the dismissal timer; the pending dismissal task of the replaced message
//! is aborted so it can never hide the newer text early.

use rollcall_core::{Notice, Severity};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long a message stays visible.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(4000);

/// Snapshot of the banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub severity: Severity,
    pub visible: bool,
}

impl Default for Banner {
    fn default() -> Self {
        Self {
            text: String::new(),
            severity: Severity::Info,
            visible: false,
        }
    }
}

struct State {
    banner: Banner,
    /// Bumped on every show; a dismissal only applies to its own generation.
    generation: u64,
    dismissal: Option<JoinHandle<()>>,
}

/// Clone-safe handle to the shared banner.
#[derive(Clone)]
pub struct Notifier {
    state: Arc<Mutex<State>>,
    dismiss_after: Duration,
    echo: bool,
}

impl Notifier {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                banner: Banner::default(),
                generation: 0,
                dismissal: None,
            })),
            dismiss_after,
            echo: false,
        }
    }

    /// Also print each message to stdout as it is shown.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show `notice` now and schedule its dismissal. Must run inside a tokio runtime.
    pub fn show(&self, notice: Notice) {
        tracing::info!(severity = %notice.severity, text = %notice.text, "notification");
        if self.echo {
            println!("{}", render_line(&notice.text, notice.severity));
        }

        let mut state = self.lock();
        if let Some(pending) = state.dismissal.take() {
            pending.abort();
        }

        state.generation += 1;
        state.banner = Banner {
            text: notice.text,
            severity: notice.severity,
            visible: true,
        };

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let delay = self.dismiss_after;
        state.dismissal = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation == generation {
                state.banner.visible = false;
                state.dismissal = None;
                tracing::debug!(generation, "notification dismissed");
            }
        }));
    }

    pub fn success(&self, text: impl Into<String>) {
        self.show(Notice::success(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.show(Notice::error(text));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.show(Notice::info(text));
    }

    pub fn banner(&self) -> Banner {
        self.lock().banner.clone()
    }
}

/// One-line terminal form of a banner message.
pub fn render_line(text: &str, severity: Severity) -> String {
    let marker = match severity {
        Severity::Success => "✓",
        Severity::Error => "✗",
        Severity::Info => "ℹ",
    };
    format!("{marker} [{severity}] {text}")
}
