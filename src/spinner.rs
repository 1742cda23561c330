//! Activity indicator shown while the model call is outstanding
//!
//! A spawned tokio task redraws one terminal line every [`FRAME_INTERVAL`].
//! [`Spinner::stop`] cancels the task and blanks the line; it is safe to call
//! any number of times and is also run on drop, so every exit path of a flow
//! tears the indicator down.

use crate::ui::theme::Theme;
use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    queue,
    style::{Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spinner animation frames - braille pattern spinner
pub const SPINNER_BRAILLE: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// Where the indicator draws. Shared between the caller and the tick task.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

pub fn stderr_writer() -> SharedWriter {
    Arc::new(Mutex::new(io::stderr()))
}

/// Discards everything; used when stderr is not a terminal.
pub fn null_writer() -> SharedWriter {
    Arc::new(Mutex::new(io::sink()))
}

fn lock(sink: &SharedWriter) -> MutexGuard<'_, dyn Write + Send + 'static> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A running indicator. Dropping it stops it.
pub struct Spinner {
    task: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    sink: SharedWriter,
}

impl Spinner {
    /// Hide the cursor and start animating `label`. Must be called from
    /// within a tokio runtime.
    pub fn start(label: impl Into<String>, sink: SharedWriter) -> Self {
        let label = label.into();
        let running = Arc::new(AtomicBool::new(true));

        {
            let mut out = lock(&sink);
            let _ = write_bytes(&mut *out, &hide_sequence());
        }

        let task = tokio::spawn({
            let sink = Arc::clone(&sink);
            let running = Arc::clone(&running);
            async move {
                let mut ticker = tokio::time::interval(FRAME_INTERVAL);
                let mut frame = 0usize;
                loop {
                    ticker.tick().await;
                    let mut out = lock(&sink);
                    // Checked under the lock so no frame lands after stop()
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Ok(bytes) = frame_sequence(SPINNER_BRAILLE[frame % SPINNER_BRAILLE.len()], &label) {
                        let _ = write_bytes(&mut *out, &bytes);
                    }
                    frame = frame.wrapping_add(1);
                }
            }
        });

        Self {
            task: Some(task),
            running,
            sink,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Cancel the tick and leave a blank line with the cursor visible.
    /// A second call does nothing.
    pub fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        let mut out = lock(&self.sink);
        self.running.store(false, Ordering::SeqCst);
        task.abort();
        if let Ok(bytes) = clear_sequence() {
            let _ = write_bytes(&mut *out, &bytes);
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn write_bytes(out: &mut (dyn Write + Send), bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    out.flush()
}

fn hide_sequence() -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = queue!(buf, Hide);
    buf
}

fn frame_sequence(glyph: char, label: &str) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    queue!(
        buf,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        SetForegroundColor(Theme::ACCENT),
        Print(glyph),
        ResetColor,
        Print(' '),
        Print(label)
    )?;
    Ok(buf)
}

/// Bytes that blank the current line and restore the cursor.
pub fn clear_sequence() -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    queue!(buf, MoveToColumn(0), Clear(ClearType::CurrentLine), Show)?;
    Ok(buf)
}
