use crate::error::{Result, ShutterError};
use std::fmt;
use std::str::FromStr;

/// User commands from the keyboard or a `--script`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Configure,
    Start,
    Stop,
    /// Stop when running, start otherwise
    ToggleRunning,
    Capture,
    Switch,
    Quit,
}

impl AppCommand {
    /// Parse a comma separated command list such as `configure,capture,stop`
    pub fn parse_script(script: &str) -> Result<Vec<AppCommand>> {
        script
            .split(',')
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for AppCommand {
    type Err = ShutterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "configure" => Ok(AppCommand::Configure),
            "start" => Ok(AppCommand::Start),
            "stop" => Ok(AppCommand::Stop),
            "toggle" => Ok(AppCommand::ToggleRunning),
            "capture" => Ok(AppCommand::Capture),
            "switch" => Ok(AppCommand::Switch),
            "quit" => Ok(AppCommand::Quit),
            other => Err(ShutterError::system(format!(
                "Unknown script command '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AppCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppCommand::Configure => "configure",
            AppCommand::Start => "start",
            AppCommand::Stop => "stop",
            AppCommand::ToggleRunning => "toggle",
            AppCommand::Capture => "capture",
            AppCommand::Switch => "switch",
            AppCommand::Quit => "quit",
        };
        write!(f, "{}", name)
    }
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
    ScriptFinished,
    Error(String),
}

/// Counters kept by the front end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppStats {
    pub photos_saved: usize,
    pub capture_failures: usize,
    pub command_errors: usize,
}
