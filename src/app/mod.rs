mod orchestrator;
mod photos;
mod reporter;
mod runtime;
mod shutdown;
mod startup;
mod types;


pub use orchestrator::CameraApp;
pub use photos::{PhotoMetadata, PhotoWriter};
pub use reporter::render_alert;
pub use types::{AppCommand, AppStats, ShutdownReason};
