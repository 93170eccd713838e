//! Headset jack detection engine (MBHC: multi-button headset controller).
//!
//! Drives a codec's jack-detection block through [`platform::jack::JackHardware`]
//! and publishes what it finds through [`platform::jack::AccessoryNotifier`].
//!
//! # Architecture
//!
//! ```text
//!   interrupt dispatch ──► on_mech_irq / on_button_* / on_elec_* / on_*_ocp
//!   codec power events ──► on_codec_event                │
//!                                                        ▼
//!                                         Mutex<Core>  (resource lock)
//!                                           │      │
//!                      plug state machine ──┘      └── impedance classifier
//!                                                        │
//!   run() ── long-press timer, calibration loader        ▼
//!                                              AccessoryNotifier
//! ```
//!
//! # Example
//!
//! ```no_run
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use mbhc::{Mbhc, MbhcConfig};
//! use platform::jack::{AccessoryNotifier, JackHardware};
//!
//! async fn bring_up<H: JackHardware, N: AccessoryNotifier>(hw: H, bus: N) {
//!     let mbhc: Mbhc<CriticalSectionRawMutex, H, N> = Mbhc::new(hw, bus, MbhcConfig::default());
//!     if mbhc.init().await.is_ok() && mbhc.start().await.is_ok() {
//!         mbhc.run().await;
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `defmt`: log through defmt and derive `defmt::Format` (hardware builds)
//! - `tracing`: log through tracing (host builds)
//! - `std`: expose the `platform` recording mocks

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown)] // register and signal names in doc comments
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // every handler returns MbhcError
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

#[macro_use]
mod fmt;

mod button;
pub mod config;
mod controller;
mod detect;
pub mod error;
mod events;
pub mod impedance;
pub mod lifecycle;
mod ocp;
pub mod state;
pub mod work;

pub use config::{CalibrationSource, MbhcConfig, Timing};
pub use controller::Mbhc;
pub use error::{ConfigError, MbhcError, Result};
pub use impedance::Impedance;
pub use state::{AccessorySnapshot, CurrentMode, DetectionState, PaOffAck, FLOATING_IMPEDANCE};
