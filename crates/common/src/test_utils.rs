//! Test utilities for teensy-usb
//!
//! Helpers for building raw wire frames independently of the codec, and for
//! waiting on conditions across threads.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{adc_reply_frame, raw_frame};
//!
//! let frame = adc_reply_frame(4, 300);
//! assert_eq!(&frame[..5], &[4, 0, 2, 0x01, 0x2C]);
//! assert_eq!(raw_frame(1, &[]).len(), 64);
//! ```

use protocol::FRAME_SIZE;
use std::future::Future;
use std::time::{Duration, Instant};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a zero-padded frame byte by byte
///
/// Panics if the payload does not fit; tests that need oversized or broken
/// frames should use [`malformed_frame`] or build the bytes themselves.
pub fn raw_frame(id: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() + 3 <= FRAME_SIZE, "payload too large for test frame");
    let mut frame = vec![0u8; FRAME_SIZE];
    frame[0] = id;
    frame[2] = payload.len() as u8;
    frame[3..3 + payload.len()].copy_from_slice(payload);
    frame
}

/// ADC reply frame carrying `value` high byte first
pub fn adc_reply_frame(id: u8, value: u16) -> Vec<u8> {
    raw_frame(id, &value.to_be_bytes())
}

/// Frame whose declared size runs past the end of the frame
pub fn malformed_frame(id: u8) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_SIZE];
    frame[0] = id;
    frame[2] = 0xFF;
    frame
}

/// Poll `condition` until it holds or `timeout` elapses
///
/// Returns whether the condition became true.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Run a future with a timeout
///
/// # Example
/// ```
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
/// assert_eq!(result, 42);
/// # }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}
