//! Animated spinner shown while a request is in flight.

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    ExecutableCommand,
};
use std::io::{stdout, Write};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Spinner animation frames.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// A running spinner. Stops when dropped.
pub struct SpinnerHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SpinnerHandle {
    /// Stop the spinner and clear its line.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        clear_line();
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        let _ = stdout().execute(Show);
    }
}

fn clear_line() {
    let mut stdout = stdout();
    let _ = stdout.execute(MoveToColumn(0));
    let _ = stdout.execute(Clear(ClearType::CurrentLine));
    let _ = stdout.execute(Show);
}

/// Spinner for showing activity.
#[derive(Debug, Default)]
pub struct Spinner;

impl Spinner {
    pub fn new() -> Self {
        Self
    }

    /// Start the spinner with a message.
    pub fn start(&self, message: impl Into<String>) -> SpinnerHandle {
        let message = message.into();
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut frame_idx = 0;
            let mut stdout = stdout();

            let _ = stdout.execute(Hide);

            loop {
                if *stop_rx.borrow() {
                    break;
                }

                let _ = stdout.execute(MoveToColumn(0));
                let _ = stdout.execute(Clear(ClearType::CurrentLine));
                let _ = stdout.execute(SetForegroundColor(Color::Cyan));
                let _ = stdout.execute(Print(frame_line(frame_idx, &message, started.elapsed())));
                let _ = stdout.execute(ResetColor);
                let _ = stdout.flush();

                frame_idx += 1;

                tokio::select! {
                    _ = tokio::time::sleep(FRAME_INTERVAL) => {}
                    _ = stop_rx.changed() => { break; }
                }
            }

            let _ = stdout.execute(Show);
        });

        SpinnerHandle {
            stop_tx,
            task: Some(task),
        }
    }
}

/// One frame of the spinner line, e.g. `⠙ Thinking... (3s)`.
fn frame_line(frame_idx: usize, message: &str, elapsed: Duration) -> String {
    let frame = SPINNER_FRAMES[frame_idx % SPINNER_FRAMES.len()];
    format!("{} {} ({})", frame, message, format_elapsed(elapsed))
}

/// Elapsed time as `12s` or `1m 05s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
