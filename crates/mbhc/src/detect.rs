//! Plug detection state machine.
//!
//! ```text
//!                      mech edge (armed for insertion)
//!   NONE ─────────────────────────────────────────────► DETECTING
//!    ▲   │ wet                                              │ candidate
//!    │   ▼                                                  ▼
//!    │  MOISTURE_HOLD                 HEADPHONE / HEADSET / LINEOUT / GND_MIC_SWAP
//!    │                                                      │
//!    └──────────────────────────────────────────────────────┘
//!                      mech edge (armed for removal)
//! ```
//!
//! The mechanical switch interrupt flips `MechDetectionType` between
//! "armed for insertion" (`1`) and "armed for removal" (`0`). Insertion arms
//! removal before doing anything else; removal arms insertion as its very
//! last register write so a quick re-insertion is never lost.

use crate::controller::{Core, Mbhc};
use crate::error::{MbhcError, Result};
use crate::impedance;
use crate::state::{CurrentMode, OcpRetries};
use core::sync::atomic::Ordering;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use platform::jack::{AccessoryNotifier, JackHardware, MicbiasRequest};
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::{Accessory, Channel, JackStatus, Micbias, PlugType};

/// `MechDetectionType` value arming the switch for insertion.
const ARMED_FOR_INSERTION: u16 = 1;
/// `MechDetectionType` value arming the switch for removal.
const ARMED_FOR_REMOVAL: u16 = 0;

/// `MuxCtl` setting that lets the state machine drive the impedance mux.
const MUX_CTL_AUTO: u16 = 4;

/// Delay between enabling the ANC path and touching it again.
const ANC_SETTLE: Duration = Duration::from_millis(20);

/// Jack facets retracted when an extension cable changes what it carries.
const CABLE_FACETS: JackStatus = JackStatus::HEADSET
    .union(JackStatus::LINEOUT)
    .union(JackStatus::UNSUPPORTED);

/// Every facet a plug commit can raise.
const PLUG_FACETS: JackStatus = CABLE_FACETS.union(JackStatus::HEADPHONE);

/// Facet reported for a committed plug type.
fn jack_for(plug: PlugType) -> JackStatus {
    match plug {
        PlugType::None => JackStatus::EMPTY,
        PlugType::Headphone => JackStatus::HEADPHONE,
        PlugType::Headset => JackStatus::HEADSET,
        PlugType::HighImpedance => JackStatus::LINEOUT,
        PlugType::GroundMicSwap => JackStatus::UNSUPPORTED,
    }
}

/// Accessory line mirrored for a committed plug type.
fn accessory_for(plug: PlugType) -> Accessory {
    match plug {
        PlugType::Headphone => Accessory::Headphone,
        PlugType::Headset => Accessory::Microphone,
        PlugType::HighImpedance => Accessory::LineOut,
        PlugType::None | PlugType::GroundMicSwap => Accessory::Mechanical,
    }
}

/// Plug type committed for a reported facet.
fn plug_for(jack: JackStatus) -> PlugType {
    if jack == JackStatus::HEADPHONE {
        PlugType::Headphone
    } else if jack == JackStatus::HEADSET {
        PlugType::Headset
    } else if jack == JackStatus::LINEOUT {
        PlugType::HighImpedance
    } else if jack == JackStatus::UNSUPPORTED {
        PlugType::GroundMicSwap
    } else {
        PlugType::None
    }
}

impl<M: RawMutex, H: JackHardware, N: AccessoryNotifier> Mbhc<M, H, N> {
    // ── Mechanical switch ────────────────────────────────────────────────────

    /// Mechanical switch interrupt.
    pub async fn on_mech_irq(&self) -> Result<(), H::Error> {
        self.in_swch_irq.store(true, Ordering::Release);
        let result = {
            let mut core = self.core.lock().await;
            self.handle_switch(&mut core).await
        };
        self.in_swch_irq.store(false, Ordering::Release);
        if let Err(e) = &result {
            warn!("switch irq dropped: {}", e.as_str());
        }
        result
    }

    pub(crate) async fn handle_switch(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        if self.cancel_btn_work(core) {
            debug!("switch: pending button press cancelled");
        }

        let detection_type = core.read(Reg::MechDetectionType).await?;
        core.hw.micb_ramp_control(true).await.map_err(MbhcError::Hardware)?;
        let plug = core.state.current_plug;
        debug!(
            "switch: plug={} detection_type={}",
            plug.as_str(),
            detection_type
        );

        if plug == PlugType::None && detection_type == ARMED_FOR_INSERTION {
            self.handle_insertion(core).await
        } else if plug != PlugType::None && detection_type == ARMED_FOR_REMOVAL {
            self.handle_removal(core).await
        } else if detection_type == ARMED_FOR_REMOVAL {
            // Removed before anything was committed.
            core.write(Reg::FsmEn, 0).await?;
            core.write(Reg::BtnIsrcCtl, 0).await?;
            core.state.detecting = false;
            core.write(Reg::MechDetectionType, ARMED_FOR_INSERTION).await
        } else {
            trace!("switch: edge ignored");
            Ok(())
        }
    }

    async fn handle_insertion(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        core.write(Reg::MechDetectionType, ARMED_FOR_REMOVAL).await?;
        core.set_elec_irq(Irq::ElecRemoval, false).await?;
        core.set_elec_irq(Irq::ElecInsertion, false).await?;

        if core.switch_reads_removed().await? {
            // Edge from a plug pulled while parked in moisture hold.
            debug!("switch: insertion edge with empty jack");
            core.state.moisture_hold = false;
            core.moisture_off().await?;
            return core.write(Reg::MechDetectionType, ARMED_FOR_INSERTION).await;
        }

        if core.moisture_detected().await? {
            return Ok(());
        }

        core.hw.bias_control(true).await.map_err(MbhcError::Hardware)?;
        core.write(Reg::PulldownCtrl, 0).await?;
        core.state.is_btn_press = false;
        core.state.detecting = true;

        let candidate = core.hw.detect_plug_type().await.map_err(MbhcError::Hardware);
        let result = match candidate {
            Ok(candidate) => {
                info!("switch: candidate {}", candidate.as_str());
                self.find_plug_and_report_locked(core, candidate).await
            }
            Err(e) => Err(e),
        };
        core.state.detecting = false;
        result
    }

    async fn handle_removal(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        if !core.switch_reads_removed().await? {
            debug!("switch: duplicate insertion edge ignored");
            return core.write(Reg::MechDetectionType, ARMED_FOR_REMOVAL).await;
        }

        core.write(Reg::FsmEn, 0).await?;
        core.write(Reg::BtnIsrcCtl, 0).await?;
        core.state.is_btn_press = false;

        let plug = core.state.current_plug;
        match plug {
            PlugType::Headset => core.write(Reg::PulldownCtrl, 1).await?,
            PlugType::HighImpedance => {
                core.write(Reg::ElectIsrcEn, 0).await?;
                core.state.is_extn_cable = false;
            }
            PlugType::None | PlugType::Headphone | PlugType::GroundMicSwap => {}
        }

        core.set_elec_irq(Irq::ElecRemoval, false).await?;
        core.set_elec_irq(Irq::ElecInsertion, false).await?;
        core.write(Reg::ElectDetectionType, 1).await?;
        core.write(Reg::ElectSchmtIsrc, 0).await?;

        info!("switch: removal of {}", plug.as_str());
        self.report_plug(core, false, jack_for(plug)).await?;
        core.extcon_report(accessory_for(plug), false);

        core.moisture_off().await?;
        core.write(Reg::MechDetectionType, ARMED_FOR_INSERTION).await
    }

    // ── Classification commit ────────────────────────────────────────────────

    /// Commit a candidate produced by a detection protocol that finished
    /// outside the switch handler.
    pub async fn find_plug_and_report(&self, candidate: PlugType) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        self.find_plug_and_report_locked(&mut core, candidate).await
    }

    pub(crate) async fn find_plug_and_report_locked(
        &self,
        core: &mut Core<H, N>,
        candidate: PlugType,
    ) -> Result<(), H::Error> {
        if core.state.deinit_in_progress {
            debug!("find plug: deinit in progress, ignored");
            return Ok(());
        }
        let current = core.state.current_plug;
        if candidate == current {
            trace!("find plug: {} already reported", candidate.as_str());
            return Ok(());
        }
        if core.state.force_linein && current == PlugType::HighImpedance {
            debug!("find plug: line-out pinned, {} ignored", candidate.as_str());
            return Ok(());
        }

        match candidate {
            PlugType::None => {
                debug!("find plug: no candidate");
            }
            PlugType::Headphone | PlugType::Headset => {
                let committed = self.report_plug(core, true, jack_for(candidate)).await?;
                core.extcon_report(accessory_for(plug_for(committed)), true);
            }
            PlugType::GroundMicSwap => {
                if matches!(current, PlugType::Headphone | PlugType::Headset) {
                    self.report_plug(core, false, jack_for(current)).await?;
                    core.extcon_report(accessory_for(current), false);
                }
                self.report_plug(core, true, JackStatus::UNSUPPORTED).await?;
                core.extcon_report(Accessory::Mechanical, true);
            }
            PlugType::HighImpedance => {
                self.report_plug(core, true, JackStatus::LINEOUT).await?;
                core.extcon_report(Accessory::LineOut, true);
                if core.cfg.detect_extn_cable {
                    core.write(Reg::FsmEn, 0).await?;
                    core.write(Reg::BtnIsrcCtl, 0).await?;
                    core.write(Reg::ElectDetectionType, 1).await?;
                    core.write(Reg::ElectSchmtIsrc, 3).await?;
                    core.set_elec_irq(Irq::ElecInsertion, true).await?;
                    core.state.is_extn_cable = true;
                }
            }
        }
        Ok(())
    }

    /// Report an insertion or removal of `jack`.
    ///
    /// Returns the facet actually committed, which differs from `jack` when
    /// a headphone is reclassified as line-out.
    pub(crate) async fn report_plug(
        &self,
        core: &mut Core<H, N>,
        insertion: bool,
        jack: JackStatus,
    ) -> Result<JackStatus, H::Error> {
        if insertion {
            self.report_insertion(core, jack).await
        } else {
            self.report_removal(core, jack).await?;
            Ok(jack)
        }
    }

    async fn report_removal(&self, core: &mut Core<H, N>, jack: JackStatus) -> Result<(), H::Error> {
        // Whatever was committed for the plug leaves with it, including a
        // facet a later reclassification left behind.
        core.state.hph_status.remove(jack.union(PLUG_FACETS));
        self.retire_buttons_on_removal(core);

        if core.state.micbias_enable {
            core.micbias_off().await?;
        }
        core.state.hph_type = platform::jack_types::HphType::None;
        core.state.zl = 0;
        core.state.zr = 0;

        // A fresh session starts with clean over-current state; the cleared
        // facets go out with the removal report below.
        core.state.hph_status.remove(JackStatus::OC_HPHL | JackStatus::OC_HPHR);
        core.state.ocp_retries = OcpRetries::default();
        core.set_irq(Irq::HphlOcp, true).await?;
        core.set_irq(Irq::HphrOcp, true).await?;

        let status = core.state.hph_status;
        core.jack_report(status);
        self.set_and_turnoff_hph_padac(core).await?;

        core.state.current_plug = PlugType::None;
        core.state.force_linein = false;
        Ok(())
    }

    async fn report_insertion(
        &self,
        core: &mut Core<H, N>,
        jack: JackStatus,
    ) -> Result<JackStatus, H::Error> {
        let mut jack = jack;
        let status = core.state.hph_status;
        let current = core.state.current_plug;

        if core.cfg.detect_extn_cable
            && (current == PlugType::HighImpedance || jack == JackStatus::LINEOUT)
            && !status.is_empty()
            && status != jack
        {
            // Extension cable changed what it carries: retract the old facets
            // without a zero report so consumers never see the jack empty.
            if core.state.micbias_enable && status == JackStatus::HEADSET {
                core.micbias_off().await?;
            }
            core.state.hph_type = platform::jack_types::HphType::None;
            core.state.zl = 0;
            core.state.zr = 0;
            if !core.state.force_linein {
                core.extcon_report(accessory_for(current), false);
            }
            if status == JackStatus::LINEOUT {
                core.set_current_mode(CurrentMode::Mb).await?;
                Timer::after_micros(200).await;
                core.set_elec_irq(Irq::ElecRemoval, true).await?;
            }
            core.state.hph_status.remove(CABLE_FACETS);
        }

        if current == PlugType::Headset && jack == JackStatus::HEADPHONE {
            core.state.hph_status.remove(JackStatus::HEADSET);
        }
        if current == PlugType::GroundMicSwap && jack != JackStatus::UNSUPPORTED {
            core.state.hph_status.remove(JackStatus::UNSUPPORTED);
        }

        core.state.current_plug = plug_for(jack);
        if jack == JackStatus::HEADSET {
            core.state.reported_at = Some(embassy_time::Instant::now());
        }

        let pa_on = core.hw.hph_pa_on().await.map_err(MbhcError::Hardware)?;
        let measurable = jack == JackStatus::HEADPHONE || jack == JackStatus::HEADSET;

        if core.state.force_linein && jack == JackStatus::HEADPHONE {
            jack = core.commit_linein();
        } else if core.cfg.impedance_detect && measurable && !pa_on {
            let fsm_en = core.read(Reg::FsmEn).await?;
            core.write(Reg::FsmEn, 0).await?;
            core.write(Reg::MuxCtl, MUX_CTL_AUTO).await?;
            core.write(Reg::FsmEn, 1).await?;
            let hphl_swh = core.cfg.hphl_swh;
            let measured = impedance::measure(&mut core.hw, hphl_swh).await;
            core.write(Reg::FsmEn, fsm_en).await?;
            match measured {
                Ok(z) => {
                    core.state.zl = z.zl;
                    core.state.zr = z.zr;
                    core.state.hph_type = z.hph_type;

                    let threshold = core.cfg.linein_threshold;
                    if threshold != 0
                        && z.zl > threshold
                        && z.zr > threshold
                        && jack == JackStatus::HEADPHONE
                    {
                        info!("report: zl={} zr={} above line-in threshold", z.zl, z.zr);
                        core.state.force_linein = true;
                        jack = core.commit_linein();
                    }
                }
                // Commit the plug without impedance data.
                Err(e) => warn!("report: impedance measurement failed: {}", e.as_str()),
            }
        }

        core.state.hph_status.insert(jack);
        if jack == JackStatus::HEADPHONE {
            core.hw.micb_ramp_control(false).await.map_err(MbhcError::Hardware)?;
        }
        let report = core.state.hph_status | JackStatus::MECHANICAL;
        info!("report: insertion {}", report.bits());
        core.jack_report(report);
        self.clr_and_turnon_hph_padac(core).await?;

        if jack == JackStatus::HEADSET && core.caps.micbias_control && !core.state.micbias_enable {
            core.hw
                .micbias_control(MicbiasRequest::Enable)
                .await
                .map_err(MbhcError::Hardware)?;
            if core.caps.micb_threshold {
                core.hw.micb_threshold_mic(true).await.map_err(MbhcError::Hardware)?;
            }
            core.state.micbias_enable = true;
        }
        Ok(jack)
    }

    // ── Amplifier power-down acknowledgement ─────────────────────────────────

    /// Force the amplifiers off at removal, remembering which ones the codec
    /// still believes are on.
    pub(crate) async fn set_and_turnoff_hph_padac(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        let wg = core.warmup_time().await?;
        if core.hw.hph_pa_on().await.map_err(MbhcError::Hardware)? {
            debug!("padac: amplifier on at removal, deferring ack");
            self.pa_ack.set(Channel::Left);
            self.pa_ack.set(Channel::Right);
            core.write(Reg::HphlOcpDetEn, 0).await?;
            core.write(Reg::HphrOcpDetEn, 0).await?;
        }
        core.write(Reg::HphPaEn, 0).await?;
        Timer::after(wg).await;

        if core.caps.anc && core.hw.anc_on().await.map_err(MbhcError::Hardware)? {
            Timer::after(ANC_SETTLE).await;
            core.state.anc_acks.anc0 = true;
            core.state.anc_acks.anc1 = true;
            core.hw.update_anc_state(false, 0).await.map_err(MbhcError::Hardware)?;
            core.hw.update_anc_state(false, 1).await.map_err(MbhcError::Hardware)?;
        }
        Ok(())
    }

    /// Turn back on any amplifier a removal forced off that the codec never
    /// acknowledged.
    pub(crate) async fn clr_and_turnon_hph_padac(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        let wg = core.warmup_time().await?;
        let mut turned_on = false;
        if self.pa_ack.test_and_clear(Channel::Right) {
            debug!("padac: re-enabling HPHR");
            core.write(Reg::HphrPaEn, 1).await?;
            core.write(Reg::HphrOcpDetEn, 1).await?;
            turned_on = true;
        }
        if self.pa_ack.test_and_clear(Channel::Left) {
            debug!("padac: re-enabling HPHL");
            core.write(Reg::HphlPaEn, 1).await?;
            core.write(Reg::HphlOcpDetEn, 1).await?;
            turned_on = true;
        }
        if turned_on {
            Timer::after(wg).await;
        }

        if core.state.anc_acks.anc0 {
            core.state.anc_acks.anc0 = false;
            Timer::after(ANC_SETTLE).await;
            core.hw.update_anc_state(true, 0).await.map_err(MbhcError::Hardware)?;
        }
        if core.state.anc_acks.anc1 {
            core.state.anc_acks.anc1 = false;
            Timer::after(ANC_SETTLE).await;
            core.hw.update_anc_state(true, 1).await.map_err(MbhcError::Hardware)?;
        }
        Ok(())
    }

    // ── Electrical detection ─────────────────────────────────────────────────

    /// Electrical insertion interrupt: a device was plugged into an
    /// extension cable.
    pub async fn on_elec_insertion(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        let result = self.handle_elec_insertion(&mut core).await;
        if let Err(e) = &result {
            warn!("elec insertion dropped: {}", e.as_str());
        }
        result
    }

    async fn handle_elec_insertion(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        if core.state.current_plug != PlugType::HighImpedance || !core.state.is_extn_cable {
            trace!("elec insertion: no extension cable");
            return Ok(());
        }
        core.set_elec_irq(Irq::ElecInsertion, false).await?;
        let candidate = core.hw.detect_plug_type().await.map_err(MbhcError::Hardware)?;
        info!("elec insertion: candidate {}", candidate.as_str());
        self.find_plug_and_report_locked(core, candidate).await
    }

    /// Electrical removal interrupt: a device was unplugged from an
    /// extension cable.
    pub async fn on_elec_removal(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        let result = self.handle_elec_removal(&mut core).await;
        if let Err(e) = &result {
            warn!("elec removal dropped: {}", e.as_str());
        }
        result
    }

    async fn handle_elec_removal(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        let cable_device = matches!(
            core.state.current_plug,
            PlugType::Headphone | PlugType::Headset | PlugType::GroundMicSwap
        );
        if !core.cfg.detect_extn_cable || !cable_device {
            trace!("elec removal: ignored");
            return Ok(());
        }
        if self.cancel_btn_work(core) {
            debug!("elec removal: pending button press cancelled");
        }
        info!("elec removal: reporting extension cable");
        self.report_plug(core, true, JackStatus::LINEOUT).await?;
        core.extcon_report(Accessory::LineOut, true);
        if core.state.pa_events.hphl {
            self.set_and_turnoff_hph_padac(core).await?;
        }
        core.set_elec_irq(Irq::ElecRemoval, false).await?;
        core.set_current_mode(CurrentMode::None).await?;
        core.write(Reg::FsmEn, 0).await?;
        core.write(Reg::ElectSchmtIsrc, 3).await?;
        core.write(Reg::ElectDetectionType, 1).await?;
        core.set_elec_irq(Irq::ElecInsertion, true).await?;
        core.state.is_extn_cable = true;
        Ok(())
    }
}

// ── Core helpers ─────────────────────────────────────────────────────────────

impl<H: JackHardware, N: AccessoryNotifier> Core<H, N> {
    /// `true` when the insertion was parked because the jack reads wet.
    async fn moisture_detected(&mut self) -> Result<bool, H::Error> {
        self.state.moisture_hold = false;
        if self.cfg.moisture.is_none() {
            return Ok(false);
        }
        if self.hw.moisture_status().await.map_err(MbhcError::Hardware)? {
            warn!("switch: moisture on insertion, polling");
            self.write(Reg::LDetEn, 0).await?;
            self.write(Reg::GndDetEn, 0).await?;
            self.hw.moisture_polling(true).await.map_err(MbhcError::Hardware)?;
            self.write(Reg::MechDetectionType, ARMED_FOR_INSERTION).await?;
            self.write(Reg::LDetEn, 1).await?;
            if self.cfg.gnd_det_en {
                self.write(Reg::GndDetEn, 1).await?;
            }
            self.state.moisture_hold = true;
            return Ok(true);
        }
        self.moisture_off().await?;
        Ok(false)
    }

    async fn moisture_off(&mut self) -> Result<(), H::Error> {
        if self.cfg.moisture.is_some() {
            self.hw.moisture_polling(false).await.map_err(MbhcError::Hardware)?;
            self.hw.moisture_detect_enable(false).await.map_err(MbhcError::Hardware)?;
        }
        Ok(())
    }

    /// Switch the pending insertion to line-out, clearing anything already
    /// reported for the plug.
    fn commit_linein(&mut self) -> JackStatus {
        self.state.current_plug = PlugType::HighImpedance;
        if !self.state.hph_status.is_empty() {
            self.state.hph_status.remove(CABLE_FACETS);
            let status = self.state.hph_status;
            self.jack_report(status);
        }
        JackStatus::LINEOUT
    }

    async fn micbias_off(&mut self) -> Result<(), H::Error> {
        if self.caps.micbias_control {
            self.hw
                .micbias_control(MicbiasRequest::Disable)
                .await
                .map_err(MbhcError::Hardware)?;
        }
        if self.caps.micb_threshold {
            self.hw.micb_threshold_mic(false).await.map_err(MbhcError::Hardware)?;
        }
        self.state.micbias_enable = false;
        Ok(())
    }

    async fn warmup_time(&mut self) -> Result<Duration, H::Error> {
        let wg = self.read(Reg::HphCnpWgTime).await?;
        Ok(Duration::from_millis(u64::from(wg).saturating_add(1)))
    }

    /// Mask or unmask an electrical interrupt, skipping redundant writes.
    pub(crate) async fn set_elec_irq(
        &mut self,
        irq: Irq,
        enable: bool,
    ) -> Result<(), H::Error> {
        let slot = match irq {
            Irq::ElecInsertion => &mut self.state.intr_status.insertion,
            Irq::ElecRemoval => &mut self.state.intr_status.removal,
            _ => return Ok(()),
        };
        if *slot == enable {
            return Ok(());
        }
        *slot = enable;
        trace!("elec irq {} -> {}", irq.as_str(), enable);
        self.set_irq(irq, enable).await
    }

    /// Program the button detector for current-source, micbias, pull-up or
    /// no excitation. No effect when the chip sequences micbias itself.
    pub(crate) async fn set_current_mode(
        &mut self,
        mode: CurrentMode,
    ) -> Result<(), H::Error> {
        if self.caps.micbias_control {
            return Ok(());
        }
        let buttons = self.cal.buttons;
        match mode {
            CurrentMode::Cs => {
                self.write(Reg::MicbCtrl, 0).await?;
                self.write(Reg::BtnIsrcCtl, 3).await?;
                self.hw
                    .program_btn_thresholds(&buttons, false)
                    .await
                    .map_err(MbhcError::Hardware)?;
            }
            CurrentMode::Mb => {
                self.write(Reg::BtnIsrcCtl, 0).await?;
                self.write(Reg::FsmEn, 1).await?;
                self.write(Reg::MicbCtrl, 2).await?;
                self.hw
                    .program_btn_thresholds(&buttons, true)
                    .await
                    .map_err(MbhcError::Hardware)?;
            }
            CurrentMode::Pullup => {
                self.write(Reg::BtnIsrcCtl, 3).await?;
                self.write(Reg::FsmEn, 1).await?;
                self.write(Reg::MicbCtrl, 1).await?;
                self.hw
                    .program_btn_thresholds(&buttons, true)
                    .await
                    .map_err(MbhcError::Hardware)?;
            }
            CurrentMode::None => {
                self.write(Reg::BtnIsrcCtl, 0).await?;
                self.write(Reg::FsmEn, 1).await?;
                self.write(Reg::MicbCtrl, 0).await?;
            }
        }
        self.current_mode = mode;
        Ok(())
    }

    /// MB when MIC_BIAS_2 is on, `otherwise` when it is not.
    pub(crate) async fn micbias_or(
        &mut self,
        otherwise: CurrentMode,
    ) -> Result<CurrentMode, H::Error> {
        let micbias2 = self
            .hw
            .micbias_enabled(Micbias::Mb2)
            .await
            .map_err(MbhcError::Hardware)?;
        Ok(if micbias2 { CurrentMode::Mb } else { otherwise })
    }
}
