//! Doorward Controller - runs the access-control loop against real devices
//!
//! Wires the core state machine to its configuration file, the console
//! button/keypad, a tracing indicator driver and a replay matcher.

pub mod config;
pub mod console;
pub mod error;
pub mod replay;

pub use config::{ControllerConfig, PinText, CONFIG_ENV};
pub use console::{ConsoleEvent, ConsoleInput, InterruptHandle, TracingIndicators};
pub use error::{ControllerError, Result};
pub use replay::{ReplayMatcher, UnavailableMatcher};
