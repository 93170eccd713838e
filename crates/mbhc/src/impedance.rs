//! Headphone impedance measurement and mono/stereo classification.
//!
//! # Measurement
//!
//! One *ramp* drives a current ramp into a channel and latches a 16-bit
//! result: a 2-bit `C1` code selecting a calibration divisor `D1[C1]` and a
//! 14-bit `X1` count. With the bracket's offset `noff`:
//!
//! ```text
//!   denom = X1 · D1[C1] − 2^(14 − noff)
//!   zdet  = K · 1000 / denom              [milliohm],  K = 86 · 16384
//! ```
//!
//! A non-positive denominator with `X1` under the bracket's minimum code is an
//! open channel ([`FLOATING_IMPEDANCE`]).
//!
//! # Brackets
//!
//! | # | Range          | ldo | noff | nshift | btn5 | btn6 | btn7 | D1            |
//! |---|----------------|-----|------|--------|------|------|------|---------------|
//! | 0 | < 32 Ω         | 4   | 0    | 4      | 0x08 | 0x14 | 0x18 | 0, 30, 90, 30 |
//! | 1 | 32 – 400 Ω     | 2   | 0    | 3      | 0x18 | 0x7C | 0x90 | 0, 30, 30, 5  |
//! | 2 | 400 – 1200 Ω   | 1   | 4    | 5      | 0x18 | 0x7C | 0x90 | 0, 30, 30, 5  |
//! | 3 | > 1200 Ω       | 1   | 6    | 7      | 0x18 | 0x7C | 0x90 | 0, 30, 30, 5  |
//!
//! Every channel starts in bracket 1 and is re-measured at most once in the
//! bracket matching the first estimate.
//!
//! # Mono / stereo
//!
//! With both channels loaded, HPHR is tied to ground through a 9 Ω test
//! resistor and HPHL is measured again (`zls`). A stereo plug keeps HPHL
//! independent of HPHR, so `zls` stays near `zl`; a mono plug shares one
//! transducer, so `zls` drops toward `zl ∥ 9 Ω`. The relative deviations are
//! compared cross-multiplied to stay in integers; ties resolve to mono.

use crate::error::{MbhcError, Result};
use crate::state::FLOATING_IMPEDANCE;
use embassy_time::Timer;
use platform::jack::JackHardware;
use platform::jack_regs::Reg;
use platform::jack_types::{Channel, HphType};

// ── Constants ────────────────────────────────────────────────────────────────

/// Ramp normalisation constant `K`.
const ZDET_CONST: i64 = 86 * 16384;

/// 32 Ω in milliohm.
pub const ZDET_VAL_32: u32 = 32_000;
/// 400 Ω in milliohm.
pub const ZDET_VAL_400: u32 = 400_000;
/// 1200 Ω in milliohm.
pub const ZDET_VAL_1200: u32 = 1_200_000;
/// 100 kΩ in milliohm. Readings above are treated as open.
pub const ZDET_VAL_100K: u32 = 100_000_000;

/// Polls of the result register before giving up on a ramp.
pub const NUM_MEASUREMENTS: usize = 900;

/// Below this many ohms a channel counts as shorted to ground.
pub const MONO_MIN_THRESHOLD: u32 = 2;

/// Test resistor tied to HPHR during the mono/stereo measurement, in ohms.
const SHORT_TEST_OHMS: u32 = 9;

/// Minimum `X1` for a valid reading, indexed by `noff`.
const MIN_CODE: [u16; 8] = [3277, 1639, 820, 410, 205, 103, 52, 26];

/// Ramp parameter set for one impedance range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket {
    ldo_ctl: u16,
    noff: u16,
    nshift: u16,
    btn5: u16,
    btn6: u16,
    btn7: u16,
    d1: [i64; 4],
}

/// The four ramp brackets, lowest range first.
pub const BRACKETS: [Bracket; 4] = [
    Bracket { ldo_ctl: 4, noff: 0, nshift: 4, btn5: 0x08, btn6: 0x14, btn7: 0x18, d1: [0, 30, 90, 30] },
    Bracket { ldo_ctl: 2, noff: 0, nshift: 3, btn5: 0x18, btn6: 0x7C, btn7: 0x90, d1: [0, 30, 30, 5] },
    Bracket { ldo_ctl: 1, noff: 4, nshift: 5, btn5: 0x18, btn6: 0x7C, btn7: 0x90, d1: [0, 30, 30, 5] },
    Bracket { ldo_ctl: 1, noff: 6, nshift: 7, btn5: 0x18, btn6: 0x7C, btn7: 0x90, d1: [0, 30, 30, 5] },
];

const LOW: Bracket = BRACKETS[0];
const MID: Bracket = BRACKETS[1];
const HIGH: Bracket = BRACKETS[2];
const VERY_HIGH: Bracket = BRACKETS[3];

/// Result of one classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Impedance {
    /// Left channel in ohms, or [`FLOATING_IMPEDANCE`].
    pub zl: u32,
    /// Right channel in ohms, or [`FLOATING_IMPEDANCE`].
    pub zr: u32,
    /// Construction inferred from the two channels.
    pub hph_type: HphType,
}

// ── Pure arithmetic ──────────────────────────────────────────────────────────

/// Raw ramp result split into its two codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampCode {
    /// Calibration divisor selector (bits 15..14).
    pub c1: u16,
    /// Ramp count (bits 13..0).
    pub x1: u16,
}

impl RampCode {
    /// Split a latched 16-bit result.
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            c1: (raw & 0xC000) >> 14,
            x1: raw & 0x3FFF,
        }
    }
}

/// Impedance in milliohm for one ramp code measured in `bracket`.
///
/// Returns `0` for a ramp error (`C1` or `X1` zero) and for a non-positive
/// denominator with `X1` at or above the bracket's minimum code.
pub fn zdet_milliohm(code: RampCode, bracket: &Bracket) -> u32 {
    if code.c1 == 0 || code.x1 == 0 {
        return 0;
    }
    let d1 = bracket.d1.get(usize::from(code.c1)).copied().unwrap_or(0);
    let offset = 1_i64.checked_shl(14_u32.saturating_sub(u32::from(bracket.noff))).unwrap_or(0);
    let denom = i64::from(code.x1).saturating_mul(d1).saturating_sub(offset);
    if denom > 0 {
        let z = ZDET_CONST.saturating_mul(1000).checked_div(denom).unwrap_or(0);
        return u32::try_from(z).unwrap_or(u32::MAX);
    }
    let min_code = MIN_CODE.get(usize::from(bracket.noff)).copied().unwrap_or(0);
    if code.x1 < min_code {
        FLOATING_IMPEDANCE
    } else {
        0
    }
}

/// `true` when a first-pass reading falls outside the mid bracket.
pub fn needs_second_ramp(z_milliohm: u32) -> bool {
    z_milliohm > ZDET_VAL_400 || z_milliohm < ZDET_VAL_32
}

/// Bracket for a re-measurement given a first-pass reading.
fn escalation_bracket(z_milliohm: u32) -> Bracket {
    if z_milliohm < ZDET_VAL_32 {
        LOW
    } else if z_milliohm > ZDET_VAL_1200 {
        VERY_HIGH
    } else if z_milliohm > ZDET_VAL_400 {
        HIGH
    } else {
        MID
    }
}

/// Apply a factory trim to an impedance in ohms.
///
/// The trim is a sign-magnitude byte in units of 0.25 % (25 per 10000):
/// a set sign bit lowers the divisor, a clear one raises it.
pub fn apply_trim(z_ohms: u32, q1: u16) -> u32 {
    let q1 = u64::from(q1 & 0xFF);
    let cal = if q1 & 0x80 != 0 {
        10_000_u64.saturating_sub((q1 & 0x7F).saturating_mul(25))
    } else {
        10_000_u64.saturating_add(q1.saturating_mul(25))
    };
    let Some(z) = u64::from(z_ohms).saturating_mul(10_000).checked_div(cal) else {
        return z_ohms;
    };
    u32::try_from(z).unwrap_or(u32::MAX)
}

/// Mono/stereo decision from the plain left reading and the left reading
/// taken with HPHR tied to the test resistor. All values in ohms.
pub fn classify_short_test(zl: u32, zls: u32) -> HphType {
    let zl = u64::from(zl);
    let zls = u64::from(zls);
    let z_mono = zl
        .saturating_mul(u64::from(SHORT_TEST_OHMS))
        .checked_div(zl.saturating_add(u64::from(SHORT_TEST_OHMS)))
        .unwrap_or(0);
    let diff_short = zls.abs_diff(z_mono);
    let diff_plain = zl.abs_diff(zls);
    let lhs = diff_short.saturating_mul(zl.saturating_add(zls));
    let rhs = diff_plain.saturating_mul(zls.saturating_add(z_mono));
    if lhs > rhs {
        HphType::Stereo
    } else {
        HphType::Mono
    }
}

/// Mono when exactly one channel is open, or one is shorted while the
/// other is loaded. `None` when the short test is needed.
fn classify_without_short_test(zl: u32, zr: u32) -> Option<HphType> {
    if zl == FLOATING_IMPEDANCE && zr == FLOATING_IMPEDANCE {
        return Some(HphType::None);
    }
    if zl == FLOATING_IMPEDANCE
        || zr == FLOATING_IMPEDANCE
        || (zl < MONO_MIN_THRESHOLD && zr > MONO_MIN_THRESHOLD)
        || (zl > MONO_MIN_THRESHOLD && zr < MONO_MIN_THRESHOLD)
    {
        return Some(HphType::Mono);
    }
    None
}

// ── Hardware protocol ────────────────────────────────────────────────────────

/// Latch one result, compute its impedance, and wait for the ramp to drain.
async fn ramp_result<H: JackHardware>(hw: &mut H, bracket: &Bracket) -> Result<u32, H::Error> {
    hw.write(Reg::ZdetResultRequest, 1).await.map_err(MbhcError::Hardware)?;
    let mut raw = 0;
    for _ in 0..NUM_MEASUREMENTS {
        raw = hw.read(Reg::ZdetResult).await.map_err(MbhcError::Hardware)?;
        if raw & 0x8000 != 0 {
            break;
        }
    }
    hw.write(Reg::ZdetResultRequest, 0).await.map_err(MbhcError::Hardware)?;

    let code = RampCode::from_raw(raw);
    if code.c1 < 2 && code.x1 != 0 {
        Timer::after_millis(5).await;
    }
    let z = zdet_milliohm(code, bracket);
    trace!("zdet: c1={} x1={} z={} mohm", code.c1, code.x1, z);

    let mut x1 = code.x1;
    let mut polls = 0;
    while x1 != 0 && polls < NUM_MEASUREMENTS {
        x1 = RampCode::from_raw(hw.read(Reg::ZdetResult).await.map_err(MbhcError::Hardware)?).x1;
        polls = polls.saturating_add(1);
    }
    Ok(z)
}

/// Run one ramp on `channel` in `bracket`. Returns milliohm.
async fn ramp<H: JackHardware>(
    hw: &mut H,
    bracket: &Bracket,
    channel: Channel,
) -> Result<u32, H::Error> {
    hw.write(Reg::ZdetLdoCtl, bracket.ldo_ctl).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetBtn5, bracket.btn5).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetBtn6, bracket.btn6).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetBtn7, bracket.btn7).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetNoff, bracket.noff).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetNshift, bracket.nshift).await.map_err(MbhcError::Hardware)?;

    let start = match channel {
        Channel::Left => Reg::ZdetRampLeft,
        Channel::Right => Reg::ZdetRampRight,
    };
    hw.write(start, 1).await.map_err(MbhcError::Hardware)?;
    let z = ramp_result(hw, bracket).await;
    hw.write(start, 0).await.map_err(MbhcError::Hardware)?;
    z
}

/// Convert a milliohm reading to published ohms with the channel trim.
async fn publish<H: JackHardware>(
    hw: &mut H,
    z_milliohm: u32,
    channel: Channel,
) -> Result<u32, H::Error> {
    if z_milliohm == FLOATING_IMPEDANCE || z_milliohm > ZDET_VAL_100K {
        return Ok(FLOATING_IMPEDANCE);
    }
    let ohms = z_milliohm / 1000;
    let high = ohms >= ZDET_VAL_400 / 1000;
    let trim_reg = match (channel, high) {
        (Channel::Left, false) => Reg::EfuseTrimLeftLow,
        (Channel::Left, true) => Reg::EfuseTrimLeftHigh,
        (Channel::Right, false) => Reg::EfuseTrimRightLow,
        (Channel::Right, true) => Reg::EfuseTrimRightHigh,
    };
    let q1 = hw.read(trim_reg).await.map_err(MbhcError::Hardware)?;
    Ok(apply_trim(ohms, q1))
}

/// Registers the measurement perturbs.
struct Saved {
    btn5: u16,
    btn6: u16,
    btn7: u16,
    clk: u16,
    ldo_ctl: u16,
    noff: u16,
}

async fn save<H: JackHardware>(hw: &mut H) -> Result<Saved, H::Error> {
    Ok(Saved {
        btn5: hw.read(Reg::ZdetBtn5).await.map_err(MbhcError::Hardware)?,
        btn6: hw.read(Reg::ZdetBtn6).await.map_err(MbhcError::Hardware)?,
        btn7: hw.read(Reg::ZdetBtn7).await.map_err(MbhcError::Hardware)?,
        clk: hw.read(Reg::MbhcClk).await.map_err(MbhcError::Hardware)?,
        ldo_ctl: hw.read(Reg::ZdetLdoCtl).await.map_err(MbhcError::Hardware)?,
        noff: hw.read(Reg::ZdetNoff).await.map_err(MbhcError::Hardware)?,
    })
}

async fn restore<H: JackHardware>(hw: &mut H, saved: &Saved, hphl_swh: bool) -> Result<(), H::Error> {
    hw.write(Reg::SurgeEn, 1).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetBtn5, saved.btn5).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetBtn6, saved.btn6).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetBtn7, saved.btn7).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::SwHphLp100kToGnd, 1).await.map_err(MbhcError::Hardware)?;
    if hphl_swh {
        hw.write(Reg::LDetEn, 1).await.map_err(MbhcError::Hardware)?;
    }
    hw.write(Reg::ZdetLdoCtl, saved.ldo_ctl).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetNoff, saved.noff).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::MbhcClk, saved.clk).await.map_err(MbhcError::Hardware)?;
    Ok(())
}

async fn measure_channels<H: JackHardware>(hw: &mut H) -> Result<Impedance, H::Error> {
    // Left: mid bracket first, one escalation at most.
    let mut bracket = MID;
    let mut z1l = ramp(hw, &bracket, Channel::Left).await?;
    if needs_second_ramp(z1l) {
        bracket = escalation_bracket(z1l);
        z1l = ramp(hw, &bracket, Channel::Left).await?;
    }
    let zl = publish(hw, z1l, Channel::Left).await?;
    if zl == FLOATING_IMPEDANCE {
        bracket = MID;
    }
    debug!("zdet: left {} ohm", zl);

    // Right: reuse the left bracket; escalate only after an open left.
    let mut z1r = ramp(hw, &bracket, Channel::Right).await?;
    if needs_second_ramp(z1r) {
        let saturated = z1r > ZDET_VAL_1200 && bracket.noff == VERY_HIGH.noff;
        if zl == FLOATING_IMPEDANCE && !saturated {
            let second = escalation_bracket(z1r);
            z1r = ramp(hw, &second, Channel::Right).await?;
        }
    }
    let zr = publish(hw, z1r, Channel::Right).await?;
    debug!("zdet: right {} ohm", zr);

    if let Some(hph_type) = classify_without_short_test(zl, zr) {
        return Ok(Impedance { zl, zr, hph_type });
    }

    hw.write(Reg::HphrAtest, 1).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::ZdetRightShort, 1).await.map_err(MbhcError::Hardware)?;
    let short_bracket = if zl < ZDET_VAL_32 / 1000 { LOW } else { MID };
    let z1ls = ramp(hw, &short_bracket, Channel::Left).await;
    hw.write(Reg::ZdetRightShort, 0).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::HphrAtest, 0).await.map_err(MbhcError::Hardware)?;
    let zls = z1ls? / 1000;
    let trim = hw
        .read(if zls < ZDET_VAL_400 / 1000 {
            Reg::EfuseTrimLeftLow
        } else {
            Reg::EfuseTrimLeftHigh
        })
        .await
        .map_err(MbhcError::Hardware)?;
    let zls = apply_trim(zls, trim);

    let hph_type = classify_short_test(zl, zls);
    debug!("zdet: short test zls={} -> {}", zls, hph_type.as_str());
    Ok(Impedance { zl, zr, hph_type })
}

/// Measure both channels and classify the headphone.
///
/// Must run under the resource lock: it takes the detection comparators
/// and surge protection away from normal operation until it returns.
/// Every perturbed register is restored even when a measurement fails.
pub async fn measure<H: JackHardware>(hw: &mut H, hphl_swh: bool) -> Result<Impedance, H::Error> {
    let saved = save(hw).await?;

    if hw.read(Reg::FsmEn).await.map_err(MbhcError::Hardware)? != 0 {
        hw.write(Reg::FsmEn, 0).await.map_err(MbhcError::Hardware)?;
    }
    if hphl_swh {
        hw.write(Reg::LDetEn, 0).await.map_err(MbhcError::Hardware)?;
    }
    hw.write(Reg::SwHphLp100kToGnd, 0).await.map_err(MbhcError::Hardware)?;
    hw.write(Reg::SurgeEn, 0).await.map_err(MbhcError::Hardware)?;
    Timer::after_millis(1).await;

    let result = measure_channels(hw).await;
    restore(hw, &saved, hphl_swh).await?;
    let result = result?;
    info!(
        "zdet: zl={} zr={} type={}",
        result.zl,
        result.zr,
        result.hph_type.as_str()
    );
    Ok(result)
}
