//! Logical register fields and interrupt lines of a jack-detection block.
//!
//! The detection engine never sees physical addresses. Each [`Reg`] names a
//! bit-field; the chip driver owns the mapping to register, mask and shift
//! and returns the field value right-aligned.
//!
//! ```text
//!   engine ── Reg::FsmEn ──► driver ── (0x..57, mask 0x80, shift 7) ──► bus
//! ```

/// Logical register field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Reg {
    // ── Mechanical detection ────────────────────────────────────────────────
    /// Left-detect comparator enable.
    LDetEn,
    /// Ground-detect comparator enable.
    GndDetEn,
    /// Polarity of the next mechanical edge: 1 = insertion, 0 = removal.
    MechDetectionType,
    /// Microphone clamp control.
    MicClampCtl,
    /// Polarity of the next electrical edge: 1 = insertion, 0 = removal.
    ElectDetectionType,
    /// Left-detect pull-up enable.
    HsLDetPullUpCtrl,
    /// Left-detect pull-up comparator enable.
    HsLDetPullUpCompCtrl,
    /// Switch wiring polarity of the HPHL contact (1 = normally open).
    HphlPlugType,
    /// Switch wiring polarity of the ground contact (1 = normally open).
    GndPlugType,
    /// 100 kΩ pull-down from HPHL to ground.
    SwHphLp100kToGnd,
    /// Schmitt trigger current source selector for electrical detection.
    ElectSchmtIsrc,
    /// Detection state machine enable.
    FsmEn,
    /// Insertion/removal debounce code.
    InsRemDbnc,
    /// Button debounce code.
    BtnDbnc,
    /// Headset reference voltage code.
    HsVref,
    /// Button current source control.
    BtnIsrcCtl,
    /// Micbias source: 0 = off, 1 = pull-up, 2 = micbias.
    MicbCtrl,
    /// Amplifier charge-pump wait time in milliseconds, minus one.
    HphCnpWgTime,
    /// Left amplifier enable.
    HphlPaEn,
    /// Right amplifier enable.
    HphrPaEn,
    /// Both amplifier enables as a two-bit field (bit 1 = left, bit 0 = right).
    HphPaEn,
    /// Debounced switch level: 1 = jack removed.
    SwchLevelRemove,
    /// Micbias pull-down enable.
    PulldownCtrl,
    /// Analog mux selector for the detection comparator.
    MuxCtl,
    /// Left over-current detector enable.
    HphlOcpDetEn,
    /// Right over-current detector enable.
    HphrOcpDetEn,
    /// Over-current protection state machine enable.
    OcpFsmEn,
    /// Electrical detection current source enable.
    ElectIsrcEn,

    // ── Impedance ramp ──────────────────────────────────────────────────────
    /// Ramp LDO control of the active bracket.
    ZdetLdoCtl,
    /// Ramp offset (`noff`) of the active bracket.
    ZdetNoff,
    /// Ramp shift (`nshift`) of the active bracket.
    ZdetNshift,
    /// Button 5 comparator threshold, borrowed by the ramp.
    ZdetBtn5,
    /// Button 6 comparator threshold, borrowed by the ramp.
    ZdetBtn6,
    /// Button 7 comparator threshold, borrowed by the ramp.
    ZdetBtn7,
    /// Detection block clock control.
    MbhcClk,
    /// Start a ramp on HPHL.
    ZdetRampLeft,
    /// Start a ramp on HPHR.
    ZdetRampRight,
    /// Latch the ramp result.
    ZdetResultRequest,
    /// 16-bit ramp result: `C1` in bits 15..14, `X1` in bits 13..0.
    ZdetResult,
    /// Output surge protection enable.
    SurgeEn,
    /// Routes HPHR through the analog test resistor.
    HphrAtest,
    /// Ties HPHR to ground through the test resistor.
    ZdetRightShort,
    /// Factory trim for HPHL below 400 Ω (signed magnitude, bit 7 = sign).
    EfuseTrimLeftLow,
    /// Factory trim for HPHL at or above 400 Ω.
    EfuseTrimLeftHigh,
    /// Factory trim for HPHR below 400 Ω.
    EfuseTrimRightLow,
    /// Factory trim for HPHR at or above 400 Ω.
    EfuseTrimRightHigh,
}

impl Reg {
    /// Number of logical fields.
    pub const COUNT: usize = Reg::EfuseTrimRightHigh as usize + 1;

    /// Dense index, `0..COUNT`.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Interrupt line of the jack-detection block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Irq {
    /// Mechanical switch insertion/removal edge.
    MechInsRem,
    /// Button comparator crossed a press threshold.
    ButtonPress,
    /// Button comparator returned below threshold.
    ButtonRelease,
    /// Electrical insertion detected on the HPHL/MIC Schmitt triggers.
    ElecInsertion,
    /// Electrical removal detected on the HPHL/MIC Schmitt triggers.
    ElecRemoval,
    /// Left output over-current.
    HphlOcp,
    /// Right output over-current.
    HphrOcp,
}

impl Irq {
    /// Short label for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MechInsRem => "mech-ins-rem",
            Self::ButtonPress => "btn-press",
            Self::ButtonRelease => "btn-release",
            Self::ElecInsertion => "elec-ins",
            Self::ElecRemoval => "elec-rem",
            Self::HphlOcp => "hphl-ocp",
            Self::HphrOcp => "hphr-ocp",
        }
    }
}
