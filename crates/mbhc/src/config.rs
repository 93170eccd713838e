//! Detection configuration consumed at init.
//!
//! [`MbhcConfig`] is a plain value; board support code builds it (from a
//! const table, a devicetree blob, or anything else) and hands it to
//! [`Mbhc::new`](crate::Mbhc::new). [`MbhcConfig::validate`] runs once in
//! [`Mbhc::init`](crate::Mbhc::init) against the driver's capabilities.

use crate::error::ConfigError;
use embassy_time::Duration;
use platform::jack::{Calibration, Capabilities, MoistureParams};
use platform::jack_types::MAX_BUTTONS;

/// Default key table: media, voice command, volume up, volume down.
pub const DEFAULT_KEY_CODES: [u16; MAX_BUTTONS] = [226, 582, 115, 114, 0, 0];

/// Over-current interrupts per channel; the last one disables the channel.
pub const DEFAULT_OCP_ATTEMPTS: u8 = 20;

/// Where calibration comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSource {
    /// Use this block immediately at start.
    Builtin(Calibration),
    /// Fetch from the driver's calibration store, falling back to
    /// [`Calibration::DEFAULT`] after the retry budget is spent.
    Store,
}

/// Timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Button hold time before a long-press report.
    pub long_press: Duration,
    /// Minimum time after a headset report before presses are accepted.
    pub press_guard: Duration,
    /// Pause between calibration load attempts.
    pub calibration_backoff: Duration,
    /// Calibration load attempts before falling back to defaults.
    pub calibration_attempts: u8,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(400),
            press_guard: Duration::from_millis(250),
            calibration_backoff: Duration::from_millis(4000),
            calibration_attempts: 3,
        }
    }
}

/// Jack-detection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MbhcConfig {
    /// HPHL switch contact is normally open.
    pub hphl_swh: bool,
    /// Ground switch contact is normally open.
    pub gnd_swh: bool,
    /// Enable the ground-detect comparator.
    pub gnd_det_en: bool,
    /// Moisture detection references; `None` disables moisture handling.
    pub moisture: Option<MoistureParams>,
    /// Headphone loads above this many ohms on both channels are line-out.
    /// Zero disables the line-in check.
    pub linein_threshold: u32,
    /// Track devices attached behind an extension cable.
    pub detect_extn_cable: bool,
    /// Measure channel impedance on headphone insertion.
    pub impedance_detect: bool,
    /// Calibration source.
    pub calibration: CalibrationSource,
    /// Input key code for each logical button; `0` leaves a button unbound.
    pub key_codes: [u16; MAX_BUTTONS],
    /// Over-current interrupts tolerated per channel. Earlier interrupts reset
    /// the detector; the last one disables the channel and raises its
    /// over-current facet.
    pub ocp_attempts: u8,
    /// Timing parameters.
    pub timing: Timing,
}

impl Default for MbhcConfig {
    fn default() -> Self {
        Self {
            hphl_swh: true,
            gnd_swh: false,
            gnd_det_en: true,
            moisture: None,
            linein_threshold: 0,
            detect_extn_cable: false,
            impedance_detect: true,
            calibration: CalibrationSource::Builtin(Calibration::DEFAULT),
            key_codes: DEFAULT_KEY_CODES,
            ocp_attempts: DEFAULT_OCP_ATTEMPTS,
            timing: Timing::default(),
        }
    }
}

impl MbhcConfig {
    /// Check internal consistency and that every feature the configuration
    /// enables has a driver capability behind it.
    pub fn validate(&self, caps: &Capabilities) -> Result<(), ConfigError> {
        if self.moisture.is_some() && !caps.moisture {
            return Err(ConfigError::MissingCapability("moisture"));
        }
        if (self.impedance_detect || self.linein_threshold != 0) && !caps.impedance {
            return Err(ConfigError::MissingCapability("impedance"));
        }
        if self.calibration == CalibrationSource::Store && !caps.calibration_store {
            return Err(ConfigError::MissingCapability("calibration-store"));
        }
        for (i, code) in self.key_codes.iter().enumerate() {
            if *code == 0 {
                continue;
            }
            if self.key_codes.iter().skip(i.saturating_add(1)).any(|c| c == code) {
                return Err(ConfigError::DuplicateKeyCode(*code));
            }
        }
        if self.timing.long_press == Duration::from_ticks(0) {
            return Err(ConfigError::ZeroTiming("long_press"));
        }
        if self.ocp_attempts == 0 {
            return Err(ConfigError::ZeroTiming("ocp_attempts"));
        }
        if self.timing.calibration_attempts == 0 {
            return Err(ConfigError::ZeroTiming("calibration_attempts"));
        }
        Ok(())
    }
}
