//! Accessory state owned by the detection engine.
//!
//! [`AccessoryState`] lives behind the resource lock. The two PA-off
//! acknowledgement cells ([`PaOffAck`]) live outside it: codec amplifier
//! events update them without taking the resource lock.

use core::sync::atomic::{AtomicBool, Ordering};
use embassy_time::Instant;
use platform::jack_types::{ButtonMask, Channel, HphType, JackStatus, PlugType};

/// Impedance value published for an open (unloaded) channel.
///
/// Larger than any reading the ramp can produce; consumers treat it as "no
/// load", never as a number of ohms.
pub const FLOATING_IMPEDANCE: u32 = 0x0FFF_FFFE;

/// Detection phase as seen from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetectionState {
    /// Nothing inserted.
    None,
    /// Insertion seen, classification running.
    Detecting,
    /// Insertion seen but the moisture comparator reads wet.
    MoistureHold,
    /// Output-only accessory committed.
    Headphone,
    /// Headset committed.
    Headset,
    /// Line-out or extension cable committed.
    LineOut,
    /// Ground/mic swapped accessory committed.
    GndMicSwap,
}

/// Current-source / micbias mode of the button detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CurrentMode {
    /// Current source, micbias off.
    Cs,
    /// Micbias.
    Mb,
    /// Pull-up.
    Pullup,
    /// Nothing.
    None,
}

/// Amplifier events seen since the last PA-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PaEvents {
    pub hphl: bool,
    pub hphr: bool,
}

impl PaEvents {
    pub(crate) fn any(self) -> bool {
        self.hphl || self.hphr
    }
}

/// ANC paths whose shutdown was deferred at removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct AncAcks {
    pub anc0: bool,
    pub anc1: bool,
}

/// Over-current interrupts seen per channel in this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct OcpRetries {
    pub left: u8,
    pub right: u8,
}

impl OcpRetries {
    pub(crate) fn get_mut(&mut self, channel: Channel) -> &mut u8 {
        match channel {
            Channel::Left => &mut self.left,
            Channel::Right => &mut self.right,
        }
    }
}

/// Which electrical interrupts are currently unmasked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ElecIrqs {
    pub insertion: bool,
    pub removal: bool,
}

/// Everything the detection engine knows about the accessory.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct AccessoryState {
    pub current_plug: PlugType,
    pub hph_status: JackStatus,
    pub zl: u32,
    pub zr: u32,
    pub hph_type: HphType,
    pub buttons_pressed: ButtonMask,
    /// A press interrupt was seen and its release has not arrived yet.
    pub is_btn_press: bool,
    pub reported_at: Option<Instant>,
    pub force_linein: bool,
    pub is_extn_cable: bool,
    pub micbias_enable: bool,
    pub detecting: bool,
    /// Headset microphone capture is running.
    pub hs_recording: bool,
    pub moisture_hold: bool,
    pub deinit_in_progress: bool,
    pub pa_events: PaEvents,
    pub anc_acks: AncAcks,
    pub intr_status: ElecIrqs,
    pub ocp_retries: OcpRetries,
}

impl AccessoryState {
    pub(crate) const fn new() -> Self {
        Self {
            current_plug: PlugType::None,
            hph_status: JackStatus::EMPTY,
            zl: 0,
            zr: 0,
            hph_type: HphType::None,
            buttons_pressed: ButtonMask::EMPTY,
            is_btn_press: false,
            reported_at: None,
            force_linein: false,
            is_extn_cable: false,
            micbias_enable: false,
            detecting: false,
            hs_recording: false,
            moisture_hold: false,
            deinit_in_progress: false,
            pa_events: PaEvents {
                hphl: false,
                hphr: false,
            },
            anc_acks: AncAcks {
                anc0: false,
                anc1: false,
            },
            intr_status: ElecIrqs {
                insertion: false,
                removal: false,
            },
            ocp_retries: OcpRetries { left: 0, right: 0 },
        }
    }

    pub(crate) fn detection_state(&self) -> DetectionState {
        if self.moisture_hold {
            return DetectionState::MoistureHold;
        }
        if self.detecting {
            return DetectionState::Detecting;
        }
        match self.current_plug {
            PlugType::None => DetectionState::None,
            PlugType::Headphone => DetectionState::Headphone,
            PlugType::Headset => DetectionState::Headset,
            PlugType::HighImpedance => DetectionState::LineOut,
            PlugType::GroundMicSwap => DetectionState::GndMicSwap,
        }
    }

    pub(crate) fn snapshot(&self) -> AccessorySnapshot {
        AccessorySnapshot {
            state: self.detection_state(),
            plug: self.current_plug,
            hph_status: self.hph_status,
            zl: self.zl,
            zr: self.zr,
            hph_type: self.hph_type,
            buttons_pressed: self.buttons_pressed,
            force_linein: self.force_linein,
            hs_recording: self.hs_recording,
        }
    }
}

/// Copy of the accessory state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccessorySnapshot {
    /// Detection phase.
    pub state: DetectionState,
    /// Committed plug type.
    pub plug: PlugType,
    /// Asserted facet bits.
    pub hph_status: JackStatus,
    /// Left impedance in ohms, or [`FLOATING_IMPEDANCE`].
    pub zl: u32,
    /// Right impedance in ohms, or [`FLOATING_IMPEDANCE`].
    pub zr: u32,
    /// Mono/stereo classification.
    pub hph_type: HphType,
    /// Buttons currently held.
    pub buttons_pressed: ButtonMask,
    /// Line-out classification pinned until removal.
    pub force_linein: bool,
    /// Headset microphone capture is running.
    pub hs_recording: bool,
}

// ── PA-off acknowledgement cells ─────────────────────────────────────────────

/// Per-channel flags recording that removal switched an amplifier off while
/// the codec still considered it on.
///
/// Set on removal; consumed by whichever of the insertion path or the codec's
/// PA-off event clears it first.
pub struct PaOffAck {
    left: AtomicBool,
    right: AtomicBool,
}

impl PaOffAck {
    /// Both flags clear.
    pub const fn new() -> Self {
        Self {
            left: AtomicBool::new(false),
            right: AtomicBool::new(false),
        }
    }

    fn cell(&self, channel: Channel) -> &AtomicBool {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
        }
    }

    /// Raise the flag for `channel`.
    pub fn set(&self, channel: Channel) {
        self.cell(channel).store(true, Ordering::Release);
    }

    /// Clear the flag for `channel`, returning whether it was raised.
    pub fn test_and_clear(&self, channel: Channel) -> bool {
        self.cell(channel).swap(false, Ordering::AcqRel)
    }

    /// Current flag value.
    pub fn is_set(&self, channel: Channel) -> bool {
        self.cell(channel).load(Ordering::Acquire)
    }
}

impl Default for PaOffAck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_clear_consumes_the_flag_once() {
        let ack = PaOffAck::new();
        ack.set(Channel::Left);
        assert!(ack.test_and_clear(Channel::Left));
        assert!(!ack.test_and_clear(Channel::Left));
    }

    #[test]
    fn channels_are_independent() {
        let ack = PaOffAck::new();
        ack.set(Channel::Right);
        assert!(!ack.is_set(Channel::Left));
        assert!(ack.is_set(Channel::Right));
    }

    #[test]
    fn moisture_hold_overrides_plug_state() {
        let mut s = AccessoryState::new();
        s.moisture_hold = true;
        assert_eq!(s.detection_state(), DetectionState::MoistureHold);
        s.moisture_hold = false;
        s.current_plug = PlugType::HighImpedance;
        assert_eq!(s.detection_state(), DetectionState::LineOut);
    }

    #[test]
    fn ocp_retries_track_channels_separately() {
        let mut r = OcpRetries::default();
        *r.get_mut(Channel::Right) = 3;
        assert_eq!(r.left, 0);
        assert_eq!(r.right, 3);
    }

    #[test]
    fn floating_sentinel_exceeds_any_ramp_reading() {
        // Largest ramp result: K * 1000 / 1 milliohm → ohms.
        let max_ohms = 86_u64 * 16384 * 1000 / 1000;
        assert!(u64::from(FLOATING_IMPEDANCE) > max_ohms);
    }
}
