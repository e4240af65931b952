//! Two-button confirmation dialogs
//!
//! Provides trait-based dialog handling that hosts can customize to match
//! their UI technology. The flow only ever needs "present a message with an
//! accept and a decline button, tell me which one" — dismissing the dialog
//! counts as declining.

use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Error type for dialog operations
#[derive(Debug, Error)]
pub enum DialogError {
    #[error("Non-interactive environment")]
    NonInteractive,

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// The user's answer to a two-button dialog
///
/// There is no separate dismiss variant: handlers fold dismissal into
/// `Declined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogChoice {
    /// The user pressed the accept button.
    Accepted,
    /// The user pressed the decline button or dismissed the dialog.
    #[default]
    Declined,
}

impl DialogChoice {
    /// Check whether the dialog was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Trait for presenting two-button confirmation dialogs
///
/// Hosts implement this to bridge the flow to their presentation
/// technology. The call blocks until the user answers; the flow imposes no
/// timeout.
///
/// # Example
///
/// ```rust
/// use capflow_host::flow::{DialogChoice, DialogError, DialogHandler};
///
/// struct GuiDialogHandler {
///     // GUI framework handle
/// }
///
/// impl DialogHandler for GuiDialogHandler {
///     fn confirm(&self, message: &str) -> Result<DialogChoice, DialogError> {
///         // Show a modal dialog; for now, just accept.
///         let _ = message;
///         Ok(DialogChoice::Accepted)
///     }
///
///     fn is_interactive(&self) -> bool {
///         true
///     }
/// }
/// ```
pub trait DialogHandler: Send + Sync {
    /// Present a message with accept/decline buttons and block for the answer.
    fn confirm(&self, message: &str) -> Result<DialogChoice, DialogError>;

    /// Check if this handler can actually reach a user.
    fn is_interactive(&self) -> bool;
}

// ============================================================================
// Terminal Dialog Handler
// ============================================================================

/// Terminal-based dialog handler
///
/// Prints the message and reads a y/n answer from stdin. Anything other
/// than an explicit yes declines, matching the dismiss-equals-decline rule.
#[derive(Debug, Default)]
pub struct TerminalDialogHandler;

impl TerminalDialogHandler {
    /// Create a new terminal dialog handler.
    pub fn new() -> Self {
        Self
    }
}

impl DialogHandler for TerminalDialogHandler {
    fn confirm(&self, message: &str) -> Result<DialogChoice, DialogError> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        if !atty_check() {
            return Err(DialogError::NonInteractive);
        }

        writeln!(stdout)?;
        writeln!(stdout, "{}", message)?;
        write!(stdout, "[y]es / [n]o: ")?;
        stdout.flush()?;

        let mut input = String::new();
        stdin.lock().read_line(&mut input)?;

        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(DialogChoice::Accepted),
            _ => Ok(DialogChoice::Declined),
        }
    }

    fn is_interactive(&self) -> bool {
        atty_check()
    }
}

// ============================================================================
// Auto Handler (CI, defaults)
// ============================================================================

/// Handler that answers every dialog with a fixed choice
#[derive(Debug)]
pub struct AutoDialogHandler {
    response: DialogChoice,
}

impl AutoDialogHandler {
    /// Create a handler that accepts every dialog.
    pub fn always_accept() -> Self {
        Self {
            response: DialogChoice::Accepted,
        }
    }

    /// Create a handler that declines every dialog.
    pub fn always_decline() -> Self {
        Self {
            response: DialogChoice::Declined,
        }
    }
}

impl DialogHandler for AutoDialogHandler {
    fn confirm(&self, _message: &str) -> Result<DialogChoice, DialogError> {
        Ok(self.response)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Recording Handler (tests)
// ============================================================================

/// Handler that records every message shown, for testing
#[derive(Debug, Default)]
pub struct RecordingDialogHandler {
    messages: std::sync::Mutex<Vec<String>>,
    response: DialogChoice,
}

impl RecordingDialogHandler {
    /// Create a recording handler with a fixed response.
    pub fn new(response: DialogChoice) -> Self {
        Self {
            messages: std::sync::Mutex::new(Vec::new()),
            response,
        }
    }

    /// All messages shown so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Number of dialogs shown.
    pub fn dialog_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Forget recorded messages.
    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl DialogHandler for RecordingDialogHandler {
    fn confirm(&self, message: &str) -> Result<DialogChoice, DialogError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(self.response)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if stdin/stdout are connected to a terminal
fn atty_check() -> bool {
    // Use platform-specific checks for reliable terminal detection
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: isatty is safe to call with any file descriptor
        unsafe { libc::isatty(std::io::stdout().as_raw_fd()) != 0 }
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::System::Console::{GetConsoleMode, CONSOLE_MODE};
        let handle = std::io::stdout().as_raw_handle();
        let mut mode: CONSOLE_MODE = 0;
        // SAFETY: GetConsoleMode is safe with valid handle
        unsafe { GetConsoleMode(handle as _, &mut mode) != 0 }
    }

    #[cfg(not(any(unix, windows)))]
    {
        std::env::var("TERM").is_ok()
    }
}
