//! Value types shared between the jack HAL and the detection engine.
//!
//! # Facet bits
//!
//! A jack report is a bitmask where each bit is one independently reportable
//! accessory attribute:
//!
//! | Bit      | Constant                   | Meaning                              |
//! |----------|----------------------------|--------------------------------------|
//! | `0x0001` | [`JackStatus::HEADPHONE`]  | stereo/mono output path present      |
//! | `0x0002` | [`JackStatus::MICROPHONE`] | microphone line present              |
//! | `0x0004` | [`JackStatus::LINEOUT`]    | high-impedance load / extension cable |
//! | `0x0008` | [`JackStatus::MECHANICAL`] | switch closed (insertion reports only) |
//! | `0x0010` | [`JackStatus::UNSUPPORTED`]| ground/mic swapped accessory         |
//! | `0x0020` | [`JackStatus::OC_HPHL`]    | left output over-current             |
//! | `0x0040` | [`JackStatus::OC_HPHR`]    | right output over-current            |

// ── Plug classification ──────────────────────────────────────────────────────

/// Classified accessory type currently committed for the jack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlugType {
    /// Nothing inserted (or nothing reported yet).
    #[default]
    None,
    /// Output-only accessory, no microphone.
    Headphone,
    /// Output plus microphone.
    Headset,
    /// High-impedance load: line-in of an external device or an extension
    /// cable with nothing attached at the far end.
    HighImpedance,
    /// Ground and microphone contacts swapped (unsupported wiring standard).
    GroundMicSwap,
}

impl PlugType {
    /// Short label for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Headphone => "headphone",
            Self::Headset => "headset",
            Self::HighImpedance => "lineout",
            Self::GroundMicSwap => "gnd-mic-swap",
        }
    }
}

/// Headphone construction inferred by the impedance classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HphType {
    /// Not measured, or indeterminate (both channels floating).
    #[default]
    None,
    /// Left and right are the same transducer or one channel is open/shorted.
    Mono,
    /// Left and right are electrically independent.
    Stereo,
}

impl HphType {
    /// Short label for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mono => "mono",
            Self::Stereo => "stereo",
        }
    }
}

/// Left or right output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// HPHL
    Left,
    /// HPHR
    Right,
}

/// Micbias supply selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Micbias {
    /// MIC_BIAS_1
    Mb1,
    /// MIC_BIAS_2, the supply shared with the headset microphone.
    Mb2,
}

// ── Jack status bitmask ──────────────────────────────────────────────────────

/// Bitmask of asserted jack facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JackStatus(u16);

impl JackStatus {
    /// No facet asserted.
    pub const EMPTY: Self = Self(0);
    /// Output path present.
    pub const HEADPHONE: Self = Self(0x0001);
    /// Microphone line present.
    pub const MICROPHONE: Self = Self(0x0002);
    /// Headphone plus microphone.
    pub const HEADSET: Self = Self(0x0003);
    /// High-impedance load or extension cable.
    pub const LINEOUT: Self = Self(0x0004);
    /// Mechanical switch closed. OR-ed into insertion reports only.
    pub const MECHANICAL: Self = Self(0x0008);
    /// Accessory with an unsupported contact arrangement.
    pub const UNSUPPORTED: Self = Self(0x0010);
    /// Left output over-current.
    pub const OC_HPHL: Self = Self(0x0020);
    /// Right output over-current.
    pub const OC_HPHR: Self = Self(0x0040);

    /// Build from raw bits.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// `true` when no facet is asserted.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when every bit of `other` is asserted in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when any bit of `other` is asserted in `self`.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Bitwise union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `self` with every bit of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Assert the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl core::ops::BitOr for JackStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// ── Buttons ──────────────────────────────────────────────────────────────────

/// Number of logical buttons a headset can encode on the microphone line.
pub const MAX_BUTTONS: usize = 6;

/// Bitmask of pressed headset buttons (`BTN_0` .. `BTN_5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonMask(u8);

impl ButtonMask {
    /// No button.
    pub const EMPTY: Self = Self(0);
    /// Mask with every supported button bit.
    pub const ALL: Self = Self(0x3F);

    /// Mask for a logical button index reported by the comparator.
    ///
    /// Indices past the last supported button map to an empty mask.
    pub fn from_index(index: u8) -> Self {
        match index {
            0..=5 => 1_u8.checked_shl(u32::from(index)).map_or(Self::EMPTY, Self),
            _ => Self::EMPTY,
        }
    }

    /// Build from raw bits, dropping unsupported bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` when no button bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bitwise union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Kind of button transition delivered to the notification bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEventKind {
    /// Short press, reported together with its release.
    Press,
    /// Button held past the long-press window.
    LongPress,
    /// Button released.
    Release,
}

impl ButtonEventKind {
    /// Short label for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::LongPress => "long-press",
            Self::Release => "release",
        }
    }
}

/// One button report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    /// What happened.
    pub kind: ButtonEventKind,
    /// Which buttons it applies to.
    pub mask: ButtonMask,
}

/// Accessory line mirrored to systems tracking presence outside the jack
/// abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Accessory {
    /// Output path.
    Headphone,
    /// Microphone line.
    Microphone,
    /// Line-out / extension cable.
    LineOut,
    /// Mechanical presence without a usable classification.
    Mechanical,
}

impl Accessory {
    /// Short label for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Headphone => "headphone",
            Self::Microphone => "microphone",
            Self::LineOut => "line-out",
            Self::Mechanical => "mechanical",
        }
    }
}
