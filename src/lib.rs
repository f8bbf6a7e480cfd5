pub mod alert;
pub mod app;
pub mod backend;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod events;
pub mod keyboard_input;
pub mod photo;

pub use alert::{AlertAction, AlertInfo};
pub use app::{AppCommand, CameraApp, ShutdownReason};
pub use backend::{
    AuthorizationStatus, CaptureSession, DeviceDiscovery, PermissionProvider, SimulatedBackend,
};
pub use config::ShutterConfig;
pub use controller::{
    PendingCapture, SessionConfig, SessionController, SessionControllerBuilder, SessionSnapshot,
    SessionState,
};
pub use device::{DeviceHandle, DevicePosition, DeviceType};
pub use error::{CameraError, Result, ShutterError};
pub use events::{EventBus, EventFilter, EventReceiver, ShutterEvent};
pub use keyboard_input::KeyboardInputHandler;
pub use photo::{CapturedImage, Orientation, PixelFormat};
