//! Scenario tests for the offline queue.
//!
//! - `harness.rs`    - MockTransport, FlakyStore and TestHarness
//! - `replay.rs`     - replay cycles: drain, no-op, filtering, partial failure
//! - `enqueue.rs`    - enqueue and depth under store failures
//! - `submission.rs` - send-or-queue results and background replay
//! - `restart.rs`    - replay over a file store shared by successive queues

pub(crate) mod harness;
