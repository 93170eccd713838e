//! Bring-up, shutdown and the background runner.
//!
//! ```text
//!   new ──► init ──► start ──► (interrupts + run) ──► stop ──► deinit
//!            │         │
//!            │         └─ Builtin calibration: initialise now
//!            │            Store: runner loads, then initialises
//!            └─ validate, register notifier, claim lines, bind keys
//! ```

use crate::config::CalibrationSource;
use crate::controller::{Core, Mbhc};
use crate::error::{MbhcError, Result};
use crate::state::{AccessoryState, CurrentMode};
use embassy_futures::select::select3;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use platform::jack::{AccessoryNotifier, Calibration, JackHardware};
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::{ButtonMask, Channel, JackStatus, PlugType};

/// Interrupt lines in claim order. Release runs in reverse.
pub const IRQ_ORDER: [Irq; 7] = [
    Irq::MechInsRem,
    Irq::ButtonPress,
    Irq::ButtonRelease,
    Irq::ElecInsertion,
    Irq::ElecRemoval,
    Irq::HphlOcp,
    Irq::HphrOcp,
];

/// Lowest headset reference voltage in millivolts; `HsVref` counts 100 mV
/// steps above it.
const HS_VREF_MIN_MV: u16 = 1400;

/// Insertion/removal debounce code for 96 ms.
const INS_REM_DBNC_96MS: u16 = 6;
/// Button debounce code for 16 ms.
const BTN_DBNC_16MS: u16 = 2;

fn hs_vref_code(v_hs_max: u16) -> u16 {
    v_hs_max.saturating_sub(HS_VREF_MIN_MV) / 100
}

impl<M: RawMutex, H: JackHardware, N: AccessoryNotifier> Mbhc<M, H, N> {
    /// Validate the configuration, subscribe to codec events, claim every
    /// interrupt line and bind the key table.
    ///
    /// On failure everything acquired so far is released in reverse order.
    pub async fn init(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        if let Err(e) = core.cfg.validate(&core.caps) {
            error!("init: configuration rejected");
            return Err(MbhcError::Config(e));
        }

        core.hw
            .register_notifier(true)
            .await
            .map_err(MbhcError::Hardware)?;
        if let Err(e) = core.claim_irqs().await {
            error!("init: interrupt setup failed: {}", e.as_str());
            if core.hw.register_notifier(false).await.is_err() {
                warn!("init: notifier release failed during unwind");
            }
            return Err(e);
        }

        let codes = core.cfg.key_codes;
        for (index, code) in (0_u8..).zip(codes) {
            if code != 0 {
                core.notifier.set_key(index, code);
            }
        }
        core.state.deinit_in_progress = false;
        info!("init: done");
        Ok(())
    }

    /// Reset session state and bring up detection.
    ///
    /// With [`CalibrationSource::Store`] the hardware is initialised by
    /// [`run`](Self::run) once calibration is loaded.
    pub async fn start(&self) -> Result<(), H::Error> {
        self.stop_signal.reset();
        let _ = self.pa_ack.test_and_clear(Channel::Left);
        let _ = self.pa_ack.test_and_clear(Channel::Right);

        let mut core = self.core.lock().await;
        core.state = AccessoryState::new();
        core.current_mode = CurrentMode::None;
        match core.cfg.calibration {
            CalibrationSource::Builtin(cal) => {
                core.cal = cal;
                self.bring_up(&mut core).await
            }
            CalibrationSource::Store => {
                debug!("start: calibration deferred to runner");
                self.calibrate.signal(());
                Ok(())
            }
        }
    }

    async fn bring_up(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        core.initialise().await?;
        core.write(Reg::MechDetectionType, 1).await?;
        if !core.switch_reads_removed().await? {
            info!("start: jack already inserted");
            self.handle_switch(core).await?;
        }
        Ok(())
    }

    /// Forget the accessory and stop background work.
    ///
    /// The runner returns; call [`run`](Self::run) again after the next
    /// [`start`](Self::start).
    pub async fn stop(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        if core.state.current_plug != PlugType::None {
            debug!("stop: dropping {}", core.state.current_plug.as_str());
        }
        core.state.current_plug = PlugType::None;
        core.state.hph_status = JackStatus::EMPTY;
        core.state.buttons_pressed = ButtonMask::EMPTY;
        core.state.is_btn_press = false;
        let _ = self.retire_long_press(&mut core);
        self.calibrate.reset();
        self.stop_signal.signal(());

        core.set_irq(Irq::HphlOcp, false).await?;
        core.set_irq(Irq::HphrOcp, false).await
    }

    /// Release every interrupt line and unsubscribe from codec events.
    ///
    /// Reports are suppressed from here on. Every release is attempted even
    /// if one fails; the first failure is returned.
    pub async fn deinit(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        core.state.deinit_in_progress = true;
        let _ = self.retire_long_press(&mut core);
        self.stop_signal.signal(());

        let mut first_err = None;
        for irq in IRQ_ORDER.iter().rev() {
            if let Err(e) = core.hw.free_irq(*irq).await {
                warn!("deinit: free {} failed", irq.as_str());
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        if let Err(e) = core.hw.register_notifier(false).await {
            warn!("deinit: notifier release failed");
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
        first_err.map_or(Ok(()), |e| Err(MbhcError::Hardware(e)))
    }

    // ── Runner ───────────────────────────────────────────────────────────────

    /// Background work: the long-press timer and calibration loading.
    ///
    /// Returns after [`stop`](Self::stop) or [`deinit`](Self::deinit). Run it
    /// concurrently with the task dispatching interrupts.
    pub async fn run(&self) {
        let _ = select3(
            self.long_press_loop(),
            self.calibration_loop(),
            self.stop_signal.wait(),
        )
        .await;
        debug!("runner: stopped");
    }

    async fn calibration_loop(&self) {
        loop {
            self.calibrate.wait().await;
            let cal = self.load_calibration().await;
            let mut core = self.core.lock().await;
            core.cal = cal;
            if let Err(e) = self.bring_up(&mut core).await {
                warn!("runner: bring-up failed: {}", e.as_str());
            }
        }
    }

    /// Fetch calibration from the store, falling back to
    /// [`Calibration::DEFAULT`] once the attempt budget is spent.
    ///
    /// The resource lock is held for each attempt, never across a backoff.
    async fn load_calibration(&self) -> Calibration {
        let (attempts, backoff) = {
            let core = self.core.lock().await;
            (
                core.cfg.timing.calibration_attempts,
                core.cfg.timing.calibration_backoff,
            )
        };
        for attempt in 1..=attempts {
            let loaded = self.core.lock().await.hw.load_calibration().await;
            match loaded {
                Ok(Some(cal)) => {
                    info!("calibration: loaded on attempt {}", attempt);
                    return cal;
                }
                Ok(None) => debug!("calibration: attempt {} not ready", attempt),
                Err(_) => warn!("calibration: attempt {} failed", attempt),
            }
            if attempt < attempts {
                Timer::after(backoff).await;
            }
        }
        warn!("calibration: using built-in defaults");
        Calibration::DEFAULT
    }
}

impl<H: JackHardware, N: AccessoryNotifier> Core<H, N> {
    /// Claim every line in [`IRQ_ORDER`], masking the electrical pair.
    async fn claim_irqs(&mut self) -> Result<(), H::Error> {
        for (claimed, irq) in IRQ_ORDER.iter().enumerate() {
            if let Err(e) = self.hw.request_irq(*irq).await {
                self.release_irqs(claimed).await;
                return Err(MbhcError::Hardware(e));
            }
            if matches!(irq, Irq::ElecInsertion | Irq::ElecRemoval) {
                if let Err(e) = self.set_irq(*irq, false).await {
                    self.release_irqs(claimed.saturating_add(1)).await;
                    return Err(e);
                }
            }
        }
        self.state.intr_status.insertion = false;
        self.state.intr_status.removal = false;
        Ok(())
    }

    async fn release_irqs(&mut self, held: usize) {
        for irq in IRQ_ORDER.iter().take(held).rev() {
            if self.hw.free_irq(*irq).await.is_err() {
                warn!("init: free {} failed during unwind", irq.as_str());
            }
        }
    }

    /// Program the detection block from the configuration and calibration.
    async fn initialise(&mut self) -> Result<(), H::Error> {
        debug!("initialise: enter");
        self.write(Reg::HsLDetPullUpCtrl, 3).await?;
        if let Some(params) = self.cfg.moisture {
            self.hw.moisture_config(&params).await.map_err(MbhcError::Hardware)?;
        } else if self.caps.moisture {
            self.hw
                .moisture_detect_enable(false)
                .await
                .map_err(MbhcError::Hardware)?;
        }

        self.write(Reg::HphlPlugType, u16::from(self.cfg.hphl_swh)).await?;
        self.write(Reg::GndPlugType, u16::from(self.cfg.gnd_swh)).await?;
        self.write(Reg::SwHphLp100kToGnd, 1).await?;
        if self.cfg.gnd_det_en {
            self.hw.gnd_det_ctrl(true).await.map_err(MbhcError::Hardware)?;
        }
        self.write(Reg::HsLDetPullUpCompCtrl, 1).await?;
        self.write(Reg::LDetEn, 1).await?;
        self.write(Reg::InsRemDbnc, INS_REM_DBNC_96MS).await?;
        self.write(Reg::BtnDbnc, BTN_DBNC_16MS).await?;

        self.hw.bias_control(true).await.map_err(MbhcError::Hardware)?;
        self.hw.clk_setup(true).await.map_err(MbhcError::Hardware)?;

        let cal = self.cal;
        self.write(Reg::HsVref, hs_vref_code(cal.v_hs_max)).await?;
        self.hw
            .program_btn_thresholds(&cal.buttons, false)
            .await
            .map_err(MbhcError::Hardware)
    }
}
