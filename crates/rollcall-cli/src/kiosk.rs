//! Interactive kiosk: one command per line, both screens in one session.

use crate::capture::{CameraState, CaptureController, TRAINING_LABEL, TRAIN_PROMPT};
use crate::notify;
use crate::screen;
use crate::viewer::AttendanceViewer;
use anyhow::Result;
use rollcall_client::AttendanceApi;
use rollcall_hw::CameraProvider;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

pub const HELP: &str = "\
Commands:
  start            start the camera
  capture          capture a photo and recognize faces
  stop             stop the camera
  upload <path>    recognize faces in an image file
  train            retrain the model (asks for confirmation)
  students         reload the registered student list
  today            show today's attendance
  all              show all attendance records
  status           show camera, controls and banner state
  help             show this help
  quit             stop the camera and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Capture,
    Stop,
    Upload(PathBuf),
    Train,
    Students,
    Today,
    All,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "capture" | "snap" => Command::Capture,
            "stop" => Command::Stop,
            "upload" if !rest.is_empty() => Command::Upload(PathBuf::from(rest)),
            "upload" => return Err("usage: upload <path>".to_string()),
            "train" => Command::Train,
            "students" => Command::Students,
            "today" => Command::Today,
            "all" | "history" => Command::All,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {other} (try 'help')")),
        };
        Ok(command)
    }
}

/// Read a yes/no answer. Anything but `y`/`yes` declines.
pub async fn confirm<R, W>(lines: &mut Lines<R>, out: &mut W, prompt: &str) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "{prompt} [y/N]")?;
    out.flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Run the kiosk until `quit` or end of input, writing the screen to `out`.
///
/// Every handler runs to completion before the next line is read; an
/// operation failure is reported on the banner and the loop carries on.
pub async fn run<P, A, R, W>(
    capture: &mut CaptureController<P, A>,
    viewer: &mut AttendanceViewer<A>,
    input: R,
    out: &mut W,
) -> Result<()>
where
    P: CameraProvider,
    A: AttendanceApi,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    // initial load, like opening the page
    let _ = capture.load_students().await;
    print_roster(out, capture)?;
    writeln!(out, "{HELP}")?;

    loop {
        write!(out, "rollcall> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };
        tracing::debug!(?command, "kiosk command");

        match command {
            Command::Start => {
                if capture.start_camera().is_ok() {
                    if let Some(preview) = capture.preview() {
                        writeln!(out, "Preview: {} at {}x{}", preview.source, preview.width, preview.height)?;
                    }
                    writeln!(out, "Controls: {}", capture.controls())?;
                }
            }
            Command::Capture => {
                let _ = capture.capture_photo().await;
                write!(out, "{}", screen::render(capture.results()))?;
            }
            Command::Stop => {
                capture.stop_camera();
                writeln!(out, "Controls: {}", capture.controls())?;
            }
            Command::Upload(path) => {
                let _ = capture.upload_file(&path).await;
                write!(out, "{}", screen::render(capture.results()))?;
            }
            Command::Train => {
                let confirmed = confirm(&mut lines, out, TRAIN_PROMPT).await?;
                if confirmed {
                    writeln!(out, "⏳ {TRAINING_LABEL}")?;
                    out.flush()?;
                }
                let _ = capture.train_model(confirmed).await;
            }
            Command::Students => {
                let _ = capture.load_students().await;
                print_roster(out, capture)?;
            }
            Command::Today => {
                let _ = viewer.load_today().await;
                write!(out, "{}", screen::render(viewer.results()))?;
            }
            Command::All => {
                let _ = viewer.load_all().await;
                write!(out, "{}", screen::render(viewer.results()))?;
            }
            Command::Status => print_status(out, capture, viewer)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => break,
        }
    }

    if capture.state() == CameraState::Active {
        capture.stop_camera();
    }
    tracing::info!("kiosk session ended");
    Ok(())
}

fn print_status<W: Write, P: CameraProvider, A: AttendanceApi>(
    out: &mut W,
    capture: &CaptureController<P, A>,
    viewer: &AttendanceViewer<A>,
) -> std::io::Result<()> {
    writeln!(out, "Camera: {:?}", capture.state())?;
    writeln!(out, "Controls: {}", capture.controls())?;
    let train = capture.train_control();
    writeln!(
        out,
        "Train: {} ({})",
        train.label,
        if train.enabled { "enabled" } else { "disabled" }
    )?;
    writeln!(out, "Busy: {}", capture.is_busy() || viewer.is_busy())?;
    let banner = capture.notifier().banner();
    if banner.visible {
        writeln!(out, "Banner: {}", notify::render_line(&banner.text, banner.severity))
    } else {
        writeln!(out, "Banner: (hidden)")
    }
}

fn print_roster<W: Write, P: CameraProvider, A: AttendanceApi>(
    out: &mut W,
    capture: &CaptureController<P, A>,
) -> std::io::Result<()> {
    writeln!(out, "Registered students:")?;
    write!(out, "{}", screen::render(capture.roster()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Notifier, DEFAULT_DISMISS_AFTER};
    use crate::testing::{FakeApi, FakeCamera};
    use rollcall_core::Node;
    use rollcall_hw::CaptureRequest;

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("  CAPTURE ".parse::<Command>(), Ok(Command::Capture));
        assert_eq!("history".parse::<Command>(), Ok(Command::All));
        assert_eq!("status".parse::<Command>(), Ok(Command::Status));
        assert_eq!(
            "upload /tmp/my class.jpg".parse::<Command>(),
            Ok(Command::Upload(PathBuf::from("/tmp/my class.jpg")))
        );
        assert!("upload".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().unwrap_err().contains("unknown command"));
    }

    fn session(api: FakeApi, camera: FakeCamera) -> (CaptureController<FakeCamera, FakeApi>, AttendanceViewer<FakeApi>) {
        let notifier = Notifier::new(DEFAULT_DISMISS_AFTER);
        (
            CaptureController::new(camera, api.clone(), notifier.clone(), CaptureRequest::new("/dev/video0"), 95),
            AttendanceViewer::new(api, notifier),
        )
    }

    #[tokio::test]
    async fn test_scripted_session() {
        let api = FakeApi::default()
            .students_with(r#"{"success":true,"students":["S1"]}"#)
            .recognize_with(r#"{"success":true,"recognized_students":[{"student_id":"S1","confidence":0.873}],"unknown_persons":[]}"#);
        let camera = FakeCamera::working();
        let (mut capture, mut viewer) = session(api.clone(), camera.clone());

        let script: &[u8] = b"capture\nstart\ncapture\nbogus\ntoday\n";
        let mut screen = Vec::new();
        run(&mut capture, &mut viewer, script, &mut screen).await.unwrap();
        let screen = String::from_utf8(screen).unwrap();

        // the first capture happened before start and sent nothing
        assert_eq!(api.recognize_calls(), 1);
        assert_eq!(capture.roster(), &[Node::Tag("S1".into())]);
        assert!(capture.results().contains(&Node::StudentCard {
            student_id: "S1".into(),
            confidence: "87.3".into(),
        }));
        assert_eq!(viewer.results().len(), 1);
        // end of input releases the camera
        assert_eq!(capture.state(), CameraState::Inactive);
        assert_eq!(camera.stopped(), 1);

        assert!(screen.contains("Registered students:"));
        assert!(screen.contains("Confidence: 87.3%"));
        assert!(screen.contains("unknown command: bogus"));
        assert!(screen.contains("Controls: start=off capture=on stop=on"));
    }

    #[tokio::test]
    async fn test_train_declined_then_confirmed() {
        let api = FakeApi::default();
        let (mut capture, mut viewer) = session(api.clone(), FakeCamera::working());

        let script: &[u8] = b"train\nno\ntrain\nyes\nquit\ntrain\ny\n";
        let mut screen = Vec::new();
        run(&mut capture, &mut viewer, script, &mut screen).await.unwrap();
        let screen = String::from_utf8(screen).unwrap();

        // one declined, one sent; nothing read after quit
        assert_eq!(api.train_calls(), 1);
        assert!(capture.train_control().enabled);
        assert_eq!(screen.matches(TRAIN_PROMPT).count(), 2);
        assert_eq!(screen.matches(TRAINING_LABEL).count(), 1);
    }

    #[tokio::test]
    async fn test_declined_train_shows_no_busy_label() {
        let api = FakeApi::default();
        let (mut capture, mut viewer) = session(api.clone(), FakeCamera::working());

        let script: &[u8] = b"train\nno\n";
        let mut screen = Vec::new();
        run(&mut capture, &mut viewer, script, &mut screen).await.unwrap();
        let screen = String::from_utf8(screen).unwrap();

        assert_eq!(api.train_calls(), 0);
        assert!(screen.contains(TRAIN_PROMPT));
        assert!(!screen.contains(TRAINING_LABEL));
        assert!(!screen.contains(crate::capture::TRAIN_LABEL));
    }
}
