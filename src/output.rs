// ABOUTME: Output formatting for CLI feedback, injected into actions.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes, and captures lines for tests.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::walker::RunSummary;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

#[derive(Debug, Clone)]
enum Sink {
    Console,
    Capture(Arc<Mutex<Vec<String>>>),
}

/// Lines written to a capturing [`Output`].
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<String>>>);

impl Captured {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

/// Handles CLI output based on the configured mode.
///
/// Cheap to clone; clones share the same sink.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
    sink: Sink,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
            sink: Sink::Console,
        }
    }

    /// An output that records every line instead of printing it.
    pub fn capture(mode: OutputMode) -> (Self, Captured) {
        let captured = Captured::default();
        let output = Self {
            mode,
            start_time: None,
            sink: Sink::Capture(Arc::clone(&captured.0)),
        };
        (output, captured)
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn stdout(&self, line: &str) {
        match &self.sink {
            Sink::Console => println!("{line}"),
            Sink::Capture(lines) => lines.lock().push(line.to_string()),
        }
    }

    fn stderr(&self, line: &str) {
        match &self.sink {
            Sink::Console => eprintln!("{line}"),
            Sink::Capture(lines) => lines.lock().push(line.to_string()),
        }
    }

    fn event(&self, event: &str, message: &str, stack: Option<&str>) -> Option<String> {
        let event = JsonEvent {
            event,
            message,
            stack,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        };
        serde_json::to_string(&event).ok()
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            self.stdout(message);
        }
    }

    /// Print a block of report text, such as a diff or stack outputs.
    ///
    /// Shown in normal and quiet mode; a `report` event in JSON mode.
    pub fn report(&self, stack: &str, text: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                for line in text.lines() {
                    self.stdout(line);
                }
            }
            OutputMode::Json => {
                if let Some(json) = self.event("report", text, Some(stack)) {
                    self.stdout(&json);
                }
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    self.stdout(&format!("{message} ({:.1}s)", elapsed));
                } else {
                    self.stdout(message);
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                self.stdout(message);
            }
            OutputMode::Json => {
                if let Some(json) = self.event("success", message, None) {
                    self.stdout(&json);
                }
            }
        }
    }

    /// Print a warning (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => self.stderr(&format!("Warning: {message}")),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                if let Some(json) = self.event("warning", message, None) {
                    self.stderr(&json);
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                self.stderr(&format!("Error: {message}"));
            }
            OutputMode::Json => {
                if let Some(json) = self.event("error", message, None) {
                    self.stderr(&json);
                }
            }
        }
    }

    /// Print the final status of every stack.
    pub fn summary(&self, summary: &RunSummary) {
        match self.mode {
            OutputMode::Normal => {
                for entry in summary.entries() {
                    self.stdout(&format!("  {}: {}", entry.fqn, entry.status));
                }
            }
            OutputMode::Quiet => {
                for entry in summary.entries() {
                    if !entry.status.is_success() {
                        self.stdout(&format!("{}: {}", entry.fqn, entry.status));
                    }
                }
            }
            OutputMode::Json => {
                for entry in summary.entries() {
                    let message = entry.status.to_string();
                    if let Some(json) = self.event(entry.status.code(), &message, Some(&entry.fqn))
                    {
                        self.stdout(&json);
                    }
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
