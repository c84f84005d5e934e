//! Common utilities for teensy-usb
//!
//! This crate provides shared functionality between the host driver and the
//! firmware simulator: error handling, logging setup, and the link queue that
//! carries frames from blocking submitters to the thread that owns the pipe.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{LinkCommand, LinkReceiver, LinkSender, create_link};
pub use error::{Error, Result};
pub use logging::setup_logging;
