use serde::{Deserialize, Serialize};

/// Remedial action attached to an alert button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertAction {
    /// Send the user to the system privacy settings
    OpenSettings,
    /// Close the alert without further action
    Dismiss,
}

/// User-facing failure description produced by the session controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertInfo {
    pub title: String,
    pub message: String,
    pub primary_button_title: String,
    pub secondary_button_title: Option<String>,
    pub primary_action: Option<AlertAction>,
    pub secondary_action: Option<AlertAction>,
}

impl AlertInfo {
    pub fn new<T, M, B>(title: T, message: M, primary_button_title: B) -> Self
    where
        T: Into<String>,
        M: Into<String>,
        B: Into<String>,
    {
        Self {
            title: title.into(),
            message: message.into(),
            primary_button_title: primary_button_title.into(),
            secondary_button_title: None,
            primary_action: None,
            secondary_action: None,
        }
    }

    pub fn with_primary_action(mut self, action: AlertAction) -> Self {
        self.primary_action = Some(action);
        self
    }

    /// Whether acting on this alert should open the system settings
    pub fn offers_settings(&self) -> bool {
        self.primary_action == Some(AlertAction::OpenSettings)
            || self.secondary_action == Some(AlertAction::OpenSettings)
    }
}
