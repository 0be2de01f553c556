//! Test infrastructure for the switch command layer.
//!
//! Provides an in-process mock firmware that speaks the command wire format
//! over the [`McPortal`](ethsw_mc::McPortal) boundary and implements enough
//! command semantics (membership atomicity, precedence uniqueness, DMA-region
//! emulation) to drive end-to-end scenario tests without hardware.

mod firmware;

pub use firmware::{MockConfig, MockFirmware};
