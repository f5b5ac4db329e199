pub mod controller;

pub use controller::{ChatController, ControllerConfig};
