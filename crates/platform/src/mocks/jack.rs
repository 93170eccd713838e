//! Recording jack hardware and notifier for host-side tests.
//!
//! [`MockJackHardware`] keeps a flat register file indexed by [`Reg`], a queue
//! of impedance ramp results, and counters for every side effect the engine
//! can cause. [`MockNotifier`] records every report in arrival order.

use crate::jack::{
    AccessoryNotifier, ButtonThresholds, Calibration, Capabilities, JackHardware,
    MicbiasRequest, MoistureParams,
};
use crate::jack_regs::{Irq, Reg};
use crate::jack_types::{Accessory, ButtonEvent, ButtonEventKind, JackStatus, Micbias, PlugType};
use heapless::{Deque, Vec};

/// Error returned by [`MockJackHardware`] when a fault is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

const IRQ_LINES: usize = 7;

fn irq_slot(irq: Irq) -> usize {
    match irq {
        Irq::MechInsRem => 0,
        Irq::ButtonPress => 1,
        Irq::ButtonRelease => 2,
        Irq::ElecInsertion => 3,
        Irq::ElecRemoval => 4,
        Irq::HphlOcp => 5,
        Irq::HphrOcp => 6,
    }
}

/// Mock jack-detection block.
#[allow(clippy::struct_excessive_bools)]
pub struct MockJackHardware {
    regs: [u16; Reg::COUNT],
    latched_result: u16,
    irq_enabled: [bool; IRQ_LINES],
    irq_claimed: [bool; IRQ_LINES],
    /// Capabilities reported to the engine.
    pub caps: Capabilities,
    /// Candidate returned by the next `detect_plug_type` call.
    pub next_plug: PlugType,
    /// Number of `detect_plug_type` calls.
    pub detect_count: usize,
    /// Logical button index returned by `button_index`.
    pub button: u8,
    /// Reported amplifier state.
    pub pa_on: bool,
    /// Reported MIC_BIAS_2 state.
    pub micbias2_on: bool,
    /// Reported moisture comparator state.
    pub wet: bool,
    /// Reported ANC state.
    pub anc: bool,
    /// Ramp results handed out in order, one per result request.
    pub ramp_codes: Deque<u16, 32>,
    /// Interrupt lines in the order they were claimed.
    pub requested: Vec<Irq, 16>,
    /// Interrupt lines in the order they were released.
    pub freed: Vec<Irq, 16>,
    /// `request_irq` fails for this line.
    pub fail_request: Option<Irq>,
    /// `register_notifier` fails.
    pub fail_notifier: bool,
    /// `register_notifier(false)` fails.
    pub fail_notifier_release: bool,
    /// `read` of this register fails.
    pub fail_read: Option<Reg>,
    /// Codec notifier currently registered.
    pub notifier_registered: bool,
    /// Global bias state.
    pub bias_on: bool,
    /// Clock state.
    pub clk_on: bool,
    /// Micbias ramp state.
    pub micb_ramp_on: bool,
    /// Ground-detect comparator state.
    pub gnd_det_on: bool,
    /// Moisture polling state.
    pub moisture_polling: bool,
    /// Moisture comparator state.
    pub moisture_detect: bool,
    /// Number of `moisture_config` calls.
    pub moisture_configs: usize,
    /// Number of threshold programming calls.
    pub threshold_programs: usize,
    /// `micbias` argument of the last threshold programming call.
    pub thresholds_for_micbias: Option<bool>,
    /// Micbias requests in order.
    pub micbias_requests: Vec<MicbiasRequest, 16>,
    /// ANC updates in order as `(enable, path)`.
    pub anc_updates: Vec<(bool, u8), 8>,
    /// Calibration handed out once `calibration_ready_after` attempts failed.
    pub calibration: Option<Calibration>,
    /// Attempts answered with "not ready" before `calibration` is returned.
    pub calibration_ready_after: usize,
    /// Number of `load_calibration` calls.
    pub calibration_attempts: usize,
    /// Wake lock acquisitions.
    pub wake_lock_acquired: usize,
    /// Wake lock releases.
    pub wake_lock_released: usize,
    /// `wake_lock(true)` fails.
    pub wake_lock_fails: bool,
}

impl MockJackHardware {
    /// Empty jack, every capability present, all interrupts unclaimed.
    pub fn new() -> Self {
        let mut regs = [0_u16; Reg::COUNT];
        if let Some(slot) = regs.get_mut(Reg::MechDetectionType.index()) {
            *slot = 1;
        }
        if let Some(slot) = regs.get_mut(Reg::SwchLevelRemove.index()) {
            *slot = 1;
        }
        Self {
            regs,
            latched_result: 0,
            irq_enabled: [false; IRQ_LINES],
            irq_claimed: [false; IRQ_LINES],
            caps: Capabilities {
                micbias_control: false,
                micb_threshold: true,
                moisture: true,
                anc: true,
                impedance: true,
                calibration_store: true,
            },
            next_plug: PlugType::None,
            detect_count: 0,
            button: 0,
            pa_on: false,
            micbias2_on: false,
            wet: false,
            anc: false,
            ramp_codes: Deque::new(),
            requested: Vec::new(),
            freed: Vec::new(),
            fail_request: None,
            fail_notifier: false,
            fail_notifier_release: false,
            fail_read: None,
            notifier_registered: false,
            bias_on: false,
            clk_on: false,
            micb_ramp_on: false,
            gnd_det_on: false,
            moisture_polling: false,
            moisture_detect: false,
            moisture_configs: 0,
            threshold_programs: 0,
            thresholds_for_micbias: None,
            micbias_requests: Vec::new(),
            anc_updates: Vec::new(),
            calibration: None,
            calibration_ready_after: 0,
            calibration_attempts: 0,
            wake_lock_acquired: 0,
            wake_lock_released: 0,
            wake_lock_fails: false,
        }
    }

    /// Physically insert an accessory that the comparators classify as `plug`.
    pub fn insert(&mut self, plug: PlugType) {
        self.next_plug = plug;
        self.set(Reg::SwchLevelRemove, 0);
    }

    /// Physically remove the accessory.
    pub fn remove(&mut self) {
        self.next_plug = PlugType::None;
        self.set(Reg::SwchLevelRemove, 1);
    }

    /// Current value of a logical field.
    pub fn reg(&self, reg: Reg) -> u16 {
        self.regs.get(reg.index()).copied().unwrap_or(0)
    }

    /// Preset a logical field.
    pub fn set(&mut self, reg: Reg, value: u16) {
        if let Some(slot) = self.regs.get_mut(reg.index()) {
            *slot = value;
        }
    }

    /// Queue one ramp result.
    pub fn push_ramp(&mut self, code: u16) {
        let _ = self.ramp_codes.push_back(code);
    }

    /// `true` when the line is claimed and unmasked.
    pub fn irq_enabled(&self, irq: Irq) -> bool {
        let slot = irq_slot(irq);
        self.irq_claimed.get(slot).copied().unwrap_or(false)
            && self.irq_enabled.get(slot).copied().unwrap_or(false)
    }

    /// `true` while the line is claimed.
    pub fn irq_claimed(&self, irq: Irq) -> bool {
        self.irq_claimed.get(irq_slot(irq)).copied().unwrap_or(false)
    }

    /// Wake locks currently held.
    #[allow(clippy::cast_possible_wrap, clippy::arithmetic_side_effects)] // test counters stay small
    pub fn wake_lock_balance(&self) -> isize {
        self.wake_lock_acquired as isize - self.wake_lock_released as isize
    }
}

impl Default for MockJackHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl JackHardware for MockJackHardware {
    type Error = MockFault;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    async fn read(&mut self, reg: Reg) -> Result<u16, Self::Error> {
        if self.fail_read == Some(reg) {
            return Err(MockFault);
        }
        if reg == Reg::ZdetResult {
            return Ok(self.latched_result);
        }
        Ok(self.reg(reg))
    }

    async fn write(&mut self, reg: Reg, value: u16) -> Result<(), Self::Error> {
        if reg == Reg::ZdetResultRequest {
            self.latched_result = if value != 0 {
                self.ramp_codes.pop_front().unwrap_or(0)
            } else {
                0
            };
        }
        self.set(reg, value);
        Ok(())
    }

    async fn request_irq(&mut self, irq: Irq) -> Result<(), Self::Error> {
        if self.fail_request == Some(irq) {
            return Err(MockFault);
        }
        let slot = irq_slot(irq);
        if let Some(claimed) = self.irq_claimed.get_mut(slot) {
            *claimed = true;
        }
        if let Some(enabled) = self.irq_enabled.get_mut(slot) {
            *enabled = true;
        }
        let _ = self.requested.push(irq);
        Ok(())
    }

    async fn free_irq(&mut self, irq: Irq) -> Result<(), Self::Error> {
        if let Some(claimed) = self.irq_claimed.get_mut(irq_slot(irq)) {
            *claimed = false;
        }
        let _ = self.freed.push(irq);
        Ok(())
    }

    async fn set_irq(&mut self, irq: Irq, enable: bool) -> Result<(), Self::Error> {
        if let Some(enabled) = self.irq_enabled.get_mut(irq_slot(irq)) {
            *enabled = enable;
        }
        Ok(())
    }

    async fn bias_control(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.bias_on = enable;
        Ok(())
    }

    async fn clk_setup(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.clk_on = enable;
        Ok(())
    }

    async fn micb_ramp_control(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.micb_ramp_on = enable;
        Ok(())
    }

    #[allow(clippy::arithmetic_side_effects)] // Mock counter; overflow not a concern in tests
    async fn program_btn_thresholds(
        &mut self,
        _thresholds: &ButtonThresholds,
        micbias: bool,
    ) -> Result<(), Self::Error> {
        self.threshold_programs += 1;
        self.thresholds_for_micbias = Some(micbias);
        Ok(())
    }

    async fn button_index(&mut self) -> Result<u8, Self::Error> {
        Ok(self.button)
    }

    async fn micbias_enabled(&mut self, micbias: Micbias) -> Result<bool, Self::Error> {
        Ok(micbias == Micbias::Mb2 && self.micbias2_on)
    }

    async fn hph_pa_on(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pa_on)
    }

    async fn gnd_det_ctrl(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.gnd_det_on = enable;
        Ok(())
    }

    #[allow(clippy::arithmetic_side_effects)] // Mock counter; overflow not a concern in tests
    async fn detect_plug_type(&mut self) -> Result<PlugType, Self::Error> {
        self.detect_count += 1;
        Ok(self.next_plug)
    }

    async fn register_notifier(&mut self, enable: bool) -> Result<(), Self::Error> {
        if (enable && self.fail_notifier) || (!enable && self.fail_notifier_release) {
            return Err(MockFault);
        }
        self.notifier_registered = enable;
        Ok(())
    }

    #[allow(clippy::arithmetic_side_effects)] // Mock counter; overflow not a concern in tests
    fn wake_lock(&mut self, hold: bool) -> bool {
        if hold {
            if self.wake_lock_fails {
                return false;
            }
            self.wake_lock_acquired += 1;
        } else {
            self.wake_lock_released += 1;
        }
        true
    }

    async fn micbias_control(&mut self, request: MicbiasRequest) -> Result<(), Self::Error> {
        let _ = self.micbias_requests.push(request);
        Ok(())
    }

    #[allow(clippy::arithmetic_side_effects)] // Mock counter; overflow not a concern in tests
    async fn moisture_config(&mut self, _params: &MoistureParams) -> Result<(), Self::Error> {
        self.moisture_configs += 1;
        Ok(())
    }

    async fn moisture_detect_enable(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.moisture_detect = enable;
        Ok(())
    }

    async fn moisture_polling(&mut self, enable: bool) -> Result<(), Self::Error> {
        self.moisture_polling = enable;
        Ok(())
    }

    async fn moisture_status(&mut self) -> Result<bool, Self::Error> {
        Ok(self.wet)
    }

    async fn anc_on(&mut self) -> Result<bool, Self::Error> {
        Ok(self.anc)
    }

    async fn update_anc_state(&mut self, enable: bool, path: u8) -> Result<(), Self::Error> {
        let _ = self.anc_updates.push((enable, path));
        Ok(())
    }

    #[allow(clippy::arithmetic_side_effects)] // Mock counter; overflow not a concern in tests
    async fn load_calibration(&mut self) -> Result<Option<Calibration>, Self::Error> {
        self.calibration_attempts += 1;
        if self.calibration_attempts <= self.calibration_ready_after {
            return Ok(None);
        }
        Ok(self.calibration)
    }
}

// ── Notifier ─────────────────────────────────────────────────────────────────

/// One recorded notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// `jack_report`
    Jack(JackStatus),
    /// `button_report`
    Button(ButtonEvent),
    /// `extcon_report`
    Extcon(Accessory, bool),
}

/// Notifier that records every report.
pub struct MockNotifier {
    /// Reports in arrival order.
    pub reports: Vec<Report, 64>,
    /// Key bindings as `(index, key_code)`.
    pub keys: Vec<(u8, u16), 8>,
}

impl MockNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Jack reports only, in order.
    pub fn jack_reports(&self) -> Vec<JackStatus, 64> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                Report::Jack(status) => Some(*status),
                _ => None,
            })
            .collect()
    }

    /// Button reports only, in order.
    pub fn button_reports(&self) -> Vec<ButtonEvent, 64> {
        self.reports
            .iter()
            .filter_map(|r| match r {
                Report::Button(event) => Some(*event),
                _ => None,
            })
            .collect()
    }

    /// Number of button reports of one kind.
    pub fn count_buttons(&self, kind: ButtonEventKind) -> usize {
        self.button_reports()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Most recent jack report.
    pub fn last_jack(&self) -> Option<JackStatus> {
        self.jack_reports().last().copied()
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.reports.clear();
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessoryNotifier for MockNotifier {
    fn jack_report(&mut self, status: JackStatus) {
        let _ = self.reports.push(Report::Jack(status));
    }

    fn button_report(&mut self, event: ButtonEvent) {
        let _ = self.reports.push(Report::Button(event));
    }

    fn extcon_report(&mut self, accessory: Accessory, attached: bool) {
        let _ = self.reports.push(Report::Extcon(accessory, attached));
    }

    fn set_key(&mut self, index: u8, key_code: u16) {
        let _ = self.keys.push((index, key_code));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // tests unwrap mock results for readable assertions
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_mock_reads_as_empty_jack_armed_for_insertion() {
        let mut hw = MockJackHardware::new();
        assert_eq!(hw.read(Reg::SwchLevelRemove).await.unwrap(), 1);
        assert_eq!(hw.read(Reg::MechDetectionType).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ramp_result_latches_on_request_and_clears_on_release() {
        let mut hw = MockJackHardware::new();
        hw.push_ramp(0x8123);
        hw.write(Reg::ZdetResultRequest, 1).await.unwrap();
        assert_eq!(hw.read(Reg::ZdetResult).await.unwrap(), 0x8123);
        hw.write(Reg::ZdetResultRequest, 0).await.unwrap();
        assert_eq!(hw.read(Reg::ZdetResult).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_request_failure_leaves_line_unclaimed() {
        let mut hw = MockJackHardware::new();
        hw.fail_request = Some(Irq::HphlOcp);
        assert!(hw.request_irq(Irq::HphlOcp).await.is_err());
        assert!(!hw.irq_claimed(Irq::HphlOcp));
        hw.request_irq(Irq::HphrOcp).await.unwrap();
        assert!(hw.irq_enabled(Irq::HphrOcp));
    }

    #[test]
    fn wake_lock_failure_is_not_counted() {
        let mut hw = MockJackHardware::new();
        hw.wake_lock_fails = true;
        assert!(!hw.wake_lock(true));
        assert_eq!(hw.wake_lock_balance(), 0);
    }

    #[test]
    fn notifier_filters_by_report_kind() {
        let mut n = MockNotifier::new();
        n.jack_report(JackStatus::HEADSET);
        n.button_report(ButtonEvent {
            kind: ButtonEventKind::Press,
            mask: crate::jack_types::ButtonMask::from_index(0),
        });
        assert_eq!(n.jack_reports().len(), 1);
        assert_eq!(n.count_buttons(ButtonEventKind::Press), 1);
        assert_eq!(n.last_jack(), Some(JackStatus::HEADSET));
    }
}
