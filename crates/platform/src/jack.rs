//! Jack-detection hardware capability interface.
//!
//! A concrete codec driver implements [`JackHardware`] once; the detection
//! engine in the `mbhc` crate drives it. Everything chip-specific (register
//! layout, threshold encoding, comparator plumbing) stays behind this trait.
//!
//! # Required vs optional operations
//!
//! | Group            | Operations                                              | Presence |
//! |------------------|---------------------------------------------------------|----------|
//! | Registers        | [`read`], [`write`]                                     | required |
//! | Interrupts       | [`request_irq`], [`free_irq`], [`set_irq`]              | required |
//! | Bias             | [`bias_control`], [`clk_setup`], [`micb_ramp_control`]  | required |
//! | Detection        | [`detect_plug_type`], [`button_index`], [`hph_pa_on`]   | required |
//! | Power            | [`wake_lock`]                                           | required |
//! | Micbias control  | [`micbias_control`], [`micb_threshold_mic`]             | [`Capabilities`] |
//! | Moisture         | [`moisture_config`], [`moisture_status`], ...           | [`Capabilities`] |
//! | ANC              | [`anc_on`], [`update_anc_state`]                        | [`Capabilities`] |
//! | Calibration      | [`load_calibration`]                                    | [`Capabilities`] |
//!
//! Optional operations have default bodies that do nothing. The engine reads
//! [`JackHardware::capabilities`] once at construction and never calls an
//! operation the driver did not declare.
//!
//! [`read`]: JackHardware::read
//! [`write`]: JackHardware::write
//! [`request_irq`]: JackHardware::request_irq
//! [`free_irq`]: JackHardware::free_irq
//! [`set_irq`]: JackHardware::set_irq
//! [`bias_control`]: JackHardware::bias_control
//! [`clk_setup`]: JackHardware::clk_setup
//! [`micb_ramp_control`]: JackHardware::micb_ramp_control
//! [`detect_plug_type`]: JackHardware::detect_plug_type
//! [`button_index`]: JackHardware::button_index
//! [`hph_pa_on`]: JackHardware::hph_pa_on
//! [`wake_lock`]: JackHardware::wake_lock
//! [`micbias_control`]: JackHardware::micbias_control
//! [`micb_threshold_mic`]: JackHardware::micb_threshold_mic
//! [`moisture_config`]: JackHardware::moisture_config
//! [`moisture_status`]: JackHardware::moisture_status
//! [`anc_on`]: JackHardware::anc_on
//! [`update_anc_state`]: JackHardware::update_anc_state
//! [`load_calibration`]: JackHardware::load_calibration

use crate::jack_regs::{Irq, Reg};
use crate::jack_types::{Accessory, ButtonEvent, JackStatus, Micbias, PlugType};

// ── Capabilities ─────────────────────────────────────────────────────────────

/// Optional operation groups a driver implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)] // one flag per optional capability
pub struct Capabilities {
    /// Chip sequences micbias itself; the engine must not switch
    /// current-source/micbias modes on amplifier events.
    pub micbias_control: bool,
    /// Raises micbias for threshold microphones on request.
    pub micb_threshold: bool,
    /// Moisture comparator with polling.
    pub moisture: bool,
    /// Active noise cancellation state sequencing.
    pub anc: bool,
    /// Impedance ramp registers are present.
    pub impedance: bool,
    /// Hardware-resident calibration store.
    pub calibration_store: bool,
}

// ── Calibration ──────────────────────────────────────────────────────────────

/// Number of button threshold slots in a calibration block.
pub const THRESHOLD_SLOTS: usize = 8;

/// Button comparator thresholds in millivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonThresholds {
    /// Lower bound of each button window.
    pub low: [i16; THRESHOLD_SLOTS],
    /// Upper bound of each button window.
    pub high: [i16; THRESHOLD_SLOTS],
    /// Number of slots in use.
    pub count: u8,
}

/// Detection calibration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Maximum headset microphone voltage in millivolts.
    pub v_hs_max: u16,
    /// Button comparator thresholds.
    pub buttons: ButtonThresholds,
}

impl Calibration {
    /// Built-in calibration used when no store is present or loading fails.
    pub const DEFAULT: Self = Self {
        v_hs_max: 1700,
        buttons: ButtonThresholds {
            low: [75, 150, 237, 500, 500, 500, 500, 500],
            high: [75, 150, 237, 500, 500, 500, 500, 500],
            count: 8,
        },
    };
}

impl Default for Calibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Moisture comparator reference settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MoistureParams {
    /// Reference voltage code.
    pub vref: MoistureVref,
    /// Reference current code.
    pub iref: MoistureIref,
    /// Reference resistance code.
    pub rref: MoistureRref,
}

impl Default for MoistureParams {
    fn default() -> Self {
        Self {
            vref: MoistureVref::V45Mv,
            iref: MoistureIref::I3p0Ua,
            rref: MoistureRref::R24Kohm,
        }
    }
}

/// Moisture reference voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum MoistureVref {
    V0Mv,
    V45Mv,
    V225Mv,
}

/// Moisture reference current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum MoistureIref {
    Off,
    I2p0Ua,
    I3p0Ua,
}

/// Moisture reference resistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum MoistureRref {
    Off,
    R24Kohm,
    R84Kohm,
    R250Kohm,
}

/// Micbias request for chips that own micbias sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MicbiasRequest {
    /// Turn micbias on for the headset microphone.
    Enable,
    /// Turn micbias off.
    Disable,
}

// ── Codec events ─────────────────────────────────────────────────────────────

/// Amplifier and micbias lifecycle notification from the owning codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum CodecEvent {
    PostMicbias2On,
    PreMicbias2Off,
    PostMicbias2Off,
    PostDapmMicbias2On,
    PostDapmMicbias2Off,
    PreHphlPaOn,
    PreHphrPaOn,
    PostHphlPaOff,
    PostHphrPaOff,
    /// Codec asks to mask the left over-current interrupt.
    OcpOff,
    /// Codec allows the left over-current interrupt again.
    OcpOn,
}

impl CodecEvent {
    /// Short label for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PostMicbias2On => "post-micb2-on",
            Self::PreMicbias2Off => "pre-micb2-off",
            Self::PostMicbias2Off => "post-micb2-off",
            Self::PostDapmMicbias2On => "post-dapm-micb2-on",
            Self::PostDapmMicbias2Off => "post-dapm-micb2-off",
            Self::PreHphlPaOn => "pre-hphl-pa-on",
            Self::PreHphrPaOn => "pre-hphr-pa-on",
            Self::PostHphlPaOff => "post-hphl-pa-off",
            Self::PostHphrPaOff => "post-hphr-pa-off",
            Self::OcpOff => "ocp-off",
            Self::OcpOn => "ocp-on",
        }
    }
}

// ── Hardware trait ───────────────────────────────────────────────────────────

/// Jack-detection block of a codec.
pub trait JackHardware {
    /// Bus or driver error.
    type Error: core::fmt::Debug;

    /// Optional operation groups this driver implements.
    fn capabilities(&self) -> Capabilities;

    /// Read a logical field, right-aligned.
    async fn read(&mut self, reg: Reg) -> Result<u16, Self::Error>;

    /// Write a logical field. Bits outside the field are preserved.
    async fn write(&mut self, reg: Reg, value: u16) -> Result<(), Self::Error>;

    /// Claim an interrupt line. Lines start enabled.
    async fn request_irq(&mut self, irq: Irq) -> Result<(), Self::Error>;

    /// Release an interrupt line.
    async fn free_irq(&mut self, irq: Irq) -> Result<(), Self::Error>;

    /// Mask or unmask a claimed line.
    async fn set_irq(&mut self, irq: Irq, enable: bool) -> Result<(), Self::Error>;

    /// Global detection bias.
    async fn bias_control(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// Detection block clock.
    async fn clk_setup(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// Micbias ramp generator.
    async fn micb_ramp_control(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// Program button comparator thresholds for micbias or pull-up operation.
    async fn program_btn_thresholds(
        &mut self,
        thresholds: &ButtonThresholds,
        micbias: bool,
    ) -> Result<(), Self::Error>;

    /// Logical index of the button whose window the comparator matched.
    async fn button_index(&mut self) -> Result<u8, Self::Error>;

    /// `true` while the given micbias supply is on.
    async fn micbias_enabled(&mut self, micbias: Micbias) -> Result<bool, Self::Error>;

    /// `true` while either headphone amplifier is on.
    async fn hph_pa_on(&mut self) -> Result<bool, Self::Error>;

    /// Ground-detect comparator.
    async fn gnd_det_ctrl(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// Run the chip's resistance-ladder comparison and return a candidate
    /// plug type for a freshly inserted accessory.
    async fn detect_plug_type(&mut self) -> Result<PlugType, Self::Error>;

    /// Subscribe to or unsubscribe from codec amplifier events.
    async fn register_notifier(&mut self, enable: bool) -> Result<(), Self::Error>;

    /// Hold (`true`) or release (`false`) the system wake lock.
    ///
    /// Returns `false` if the lock could not be taken.
    fn wake_lock(&mut self, hold: bool) -> bool;

    // ── Optional: micbias control ───────────────────────────────────────────

    /// Chip-owned micbias sequencing.
    async fn micbias_control(&mut self, _request: MicbiasRequest) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Raise (`true`) or restore (`false`) micbias for threshold microphones.
    async fn micb_threshold_mic(&mut self, _enable: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    // ── Optional: moisture ──────────────────────────────────────────────────

    /// Program the moisture comparator references.
    async fn moisture_config(&mut self, _params: &MoistureParams) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Enable or disable the moisture comparator.
    async fn moisture_detect_enable(&mut self, _enable: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Enable or disable periodic moisture polling.
    async fn moisture_polling(&mut self, _enable: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    /// `true` when the moisture comparator reads wet.
    async fn moisture_status(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    // ── Optional: ANC ───────────────────────────────────────────────────────

    /// `true` while active noise cancellation is running.
    async fn anc_on(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    /// Turn one ANC path (`0` or `1`) on or off.
    async fn update_anc_state(&mut self, _enable: bool, _path: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    // ── Optional: calibration store ─────────────────────────────────────────

    /// Fetch calibration from the hardware store.
    ///
    /// `Ok(None)` means the store is not ready yet; the caller retries.
    async fn load_calibration(&mut self) -> Result<Option<Calibration>, Self::Error> {
        Ok(None)
    }
}

// ── Notification bus ─────────────────────────────────────────────────────────

/// Consumer of accessory reports (input subsystem, extcon mirror).
///
/// Calls are synchronous and must not block.
pub trait AccessoryNotifier {
    /// Full jack facet state after a change.
    fn jack_report(&mut self, status: JackStatus);

    /// One button transition.
    fn button_report(&mut self, event: ButtonEvent);

    /// Presence of one accessory line changed.
    fn extcon_report(&mut self, accessory: Accessory, attached: bool);

    /// Bind logical button `index` to an input key code.
    fn set_key(&mut self, index: u8, key_code: u16);
}
