//! Settings screen gateway
//!
//! Capability-agnostic "open the OS settings page for this app" action.
//! The flow never reads anything back from the settings screen: a failed
//! open is converted to a declined session, and a successful visit ends the
//! session when the user returns.

use std::sync::Mutex;
use thiserror::Error;

/// Error type for settings gateway operations
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings screen is not available on this platform")]
    Unsupported,

    #[error("Failed to open settings screen: {0}")]
    OpenFailed(String),
}

/// Trait for opening the OS settings page for this application
pub trait SettingsGateway: Send + Sync {
    /// Open the settings screen. Returns once the screen has been launched,
    /// not once the user is done with it.
    fn open_app_settings(&self) -> Result<(), SettingsError>;
}

/// Gateway for platforms without a reachable settings screen
///
/// Always fails to open; the flow treats that as a declined session.
#[derive(Debug, Default)]
pub struct UnsupportedSettingsGateway;

impl SettingsGateway for UnsupportedSettingsGateway {
    fn open_app_settings(&self) -> Result<(), SettingsError> {
        Err(SettingsError::Unsupported)
    }
}

/// Gateway that records open attempts, for testing
#[derive(Debug, Default)]
pub struct RecordingSettingsGateway {
    opened: Mutex<usize>,
    fail: bool,
}

impl RecordingSettingsGateway {
    /// Create a gateway whose opens succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway whose opens fail.
    pub fn failing() -> Self {
        Self {
            opened: Mutex::new(0),
            fail: true,
        }
    }

    /// Number of open attempts so far.
    pub fn open_count(&self) -> usize {
        *self.opened.lock().unwrap()
    }
}

impl SettingsGateway for RecordingSettingsGateway {
    fn open_app_settings(&self) -> Result<(), SettingsError> {
        *self.opened.lock().unwrap() += 1;
        if self.fail {
            Err(SettingsError::OpenFailed("recorded failure".into()))
        } else {
            Ok(())
        }
    }
}
