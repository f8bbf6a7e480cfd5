mod builder;
mod handle;
mod publisher;
mod scan;
mod types;
mod worker;
#[cfg(test)]
mod tests;

pub use builder::SessionControllerBuilder;
pub use handle::{PendingCapture, SessionController};
pub use scan::first_qr_payload;
pub use types::{OutputSet, SessionConfig, SessionSnapshot, SessionState};
