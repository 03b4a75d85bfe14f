//! Utility functions and helpers.

pub mod clock;
pub mod http;
pub mod retry;
pub mod text;

pub use clock::{Clock, FixedClock, SystemClock};
pub use retry::{Backoff, RetryPolicy};
