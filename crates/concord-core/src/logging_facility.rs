//! Structured logging
//!
//! The binary calls [`init`] once with the configured [`Profile`]. Library
//! code logs operation boundaries with `log_op_start!`, `log_op_end!` and
//! `log_op_error!`, and everything else with plain `tracing` macros. Tests
//! read events back through [`init_test_capture`].

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
