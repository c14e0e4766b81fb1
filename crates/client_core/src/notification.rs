//! User-visible, dismissible signals (toasts).

use std::time::Duration;

use chrono::{DateTime, Utc};

pub const SUCCESS_DURATION: Duration = Duration::from_millis(3000);
pub const ERROR_DURATION: Duration = Duration::from_millis(5000);
pub const SELECTION_DURATION: Duration = Duration::from_millis(2000);

pub const LOAD_FAILED: &str = "Failed to load companies. Please try again.";
pub const CREATE_SUCCEEDED: &str = "Company created successfully!";
pub const CREATE_FAILED: &str = "Failed to create company. Please try again.";
pub const DELETE_SUCCEEDED: &str = "Company deleted successfully!";
pub const DELETE_FAILED: &str = "Failed to delete company. Please try again.";
pub const LOCATION_SET: &str = "Current location set successfully!";
pub const LOCATION_FAILED: &str =
    "Failed to get current location. Please enter coordinates manually.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub duration: Duration,
    pub issued_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            level,
            message: message.into(),
            duration,
            issued_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message, SUCCESS_DURATION)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message, ERROR_DURATION)
    }

    pub fn selected(company_name: &str) -> Self {
        Self::new(
            NotificationLevel::Success,
            format!("Selected: {company_name}"),
            SELECTION_DURATION,
        )
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}
