//! Hardware Abstraction Layer (HAL) for headset jack detection
//!
//! This crate provides the trait-based seam between a codec's jack-detection
//! block and the detection engine, enabling development and testing without
//! physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Detection engine (mbhc crate)
//!         ↓
//! Platform HAL (this crate - JackHardware / AccessoryNotifier)
//!         ↓
//! Codec driver (register map, interrupt controller, bus)
//! ```
//!
//! # Modules
//!
//! - [`jack`] - Driver capability trait, notification sink, calibration
//! - [`jack_regs`] - Logical register fields and interrupt lines
//! - [`jack_types`] - Plug types, facet bits, button masks
//! - `mocks` - Recording driver and notifier (tests and `std` builds)
//!
//! # Features
//!
//! - `std`: Enable standard library support and the recording mocks
//! - `defmt`: Enable defmt::Format derives
//!
//! # Example
//!
//! ```no_run
//! use platform::jack::JackHardware;
//! use platform::jack_regs::Reg;
//!
//! async fn armed_for_insertion<H: JackHardware>(hw: &mut H) -> bool {
//!     matches!(hw.read(Reg::MechDetectionType).await, Ok(1))
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::match_same_arms)] // intentional for readability in field tables
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod jack;
pub mod jack_regs;
pub mod jack_types;
pub mod mocks;

// Re-export main high-level traits
pub use jack::{AccessoryNotifier, Calibration, Capabilities, CodecEvent, JackHardware};
pub use jack_types::{Accessory, ButtonEvent, ButtonEventKind, ButtonMask, JackStatus, PlugType};
