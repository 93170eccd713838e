//! The detection engine object and its lock-protected core.
//!
//! # Locking
//!
//! ```text
//!   Mbhc
//!   ├── core: Mutex<Core>          resource lock: hardware, notifier, AccessoryState
//!   ├── btn_work: DelayedWork      long-press timer, cancelled without the lock
//!   ├── pa_ack: PaOffAck           PA-off acknowledgements, lock-free
//!   ├── in_swch_irq: AtomicBool    switch handler active
//!   └── calibrate / stop: Signal   background runner wake-ups
//! ```
//!
//! Every handler takes the resource lock for its whole body. The long-press
//! timer is the one piece of deferred work; handlers cancel it under the lock
//! and never wait for it, so the runner taking the lock to finish a long press
//! can never deadlock a handler.

use crate::config::MbhcConfig;
use crate::error::{MbhcError, Result};
use crate::state::{AccessorySnapshot, AccessoryState, CurrentMode, DetectionState, PaOffAck};
use crate::work::DelayedWork;
use core::sync::atomic::AtomicBool;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use platform::jack::{AccessoryNotifier, Calibration, Capabilities, JackHardware};
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::{Accessory, ButtonEvent, ButtonEventKind, ButtonMask, JackStatus};

/// State and collaborators guarded by the resource lock.
pub(crate) struct Core<H, N> {
    pub(crate) hw: H,
    pub(crate) notifier: N,
    pub(crate) caps: Capabilities,
    pub(crate) cfg: MbhcConfig,
    pub(crate) cal: Calibration,
    pub(crate) state: AccessoryState,
    pub(crate) current_mode: CurrentMode,
}

impl<H: JackHardware, N: AccessoryNotifier> Core<H, N> {
    pub(crate) async fn read(&mut self, reg: Reg) -> Result<u16, H::Error> {
        self.hw.read(reg).await.map_err(MbhcError::Hardware)
    }

    pub(crate) async fn write(&mut self, reg: Reg, value: u16) -> Result<(), H::Error> {
        self.hw.write(reg, value).await.map_err(MbhcError::Hardware)
    }

    pub(crate) async fn set_irq(&mut self, irq: Irq, enable: bool) -> Result<(), H::Error> {
        self.hw.set_irq(irq, enable).await.map_err(MbhcError::Hardware)
    }

    /// `true` when the switch level says nothing is inserted.
    pub(crate) async fn switch_reads_removed(&mut self) -> Result<bool, H::Error> {
        Ok(self.read(Reg::SwchLevelRemove).await? != 0)
    }

    pub(crate) fn jack_report(&mut self, status: JackStatus) {
        if self.state.deinit_in_progress {
            return;
        }
        debug!("jack report {}", status.bits());
        self.notifier.jack_report(status);
    }

    pub(crate) fn button_report(&mut self, kind: ButtonEventKind, mask: ButtonMask) {
        if self.state.deinit_in_progress {
            return;
        }
        debug!("button report {} mask {}", kind.as_str(), mask.bits());
        self.notifier.button_report(ButtonEvent { kind, mask });
    }

    pub(crate) fn extcon_report(&mut self, accessory: Accessory, attached: bool) {
        if self.state.deinit_in_progress {
            return;
        }
        debug!("extcon {} attached={}", accessory.as_str(), attached);
        self.notifier.extcon_report(accessory, attached);
    }

    pub(crate) fn release_wake_lock(&mut self) {
        let _ = self.hw.wake_lock(false);
    }
}

/// Headset jack detection engine.
///
/// `M` selects the raw mutex of the resource lock
/// (`CriticalSectionRawMutex` when handlers run from several executors,
/// `NoopRawMutex` on a single one).
///
/// Construction performs no I/O. Call [`init`](Self::init), then
/// [`start`](Self::start), and drive [`run`](Self::run) alongside the task
/// that dispatches interrupts to the `on_*` handlers.
pub struct Mbhc<M: RawMutex, H, N> {
    pub(crate) core: Mutex<M, Core<H, N>>,
    pub(crate) btn_work: DelayedWork<M>,
    pub(crate) pa_ack: PaOffAck,
    pub(crate) in_swch_irq: AtomicBool,
    pub(crate) calibrate: Signal<M, ()>,
    pub(crate) stop_signal: Signal<M, ()>,
}

impl<M: RawMutex, H: JackHardware, N: AccessoryNotifier> Mbhc<M, H, N> {
    /// Wrap a driver and a notification sink.
    pub fn new(hw: H, notifier: N, cfg: MbhcConfig) -> Self {
        let caps = hw.capabilities();
        Self {
            core: Mutex::new(Core {
                hw,
                notifier,
                caps,
                cfg,
                cal: Calibration::DEFAULT,
                state: AccessoryState::new(),
                current_mode: CurrentMode::None,
            }),
            btn_work: DelayedWork::new(),
            pa_ack: PaOffAck::new(),
            in_swch_irq: AtomicBool::new(false),
            calibrate: Signal::new(),
            stop_signal: Signal::new(),
        }
    }

    /// Copy of the current accessory state.
    pub async fn snapshot(&self) -> AccessorySnapshot {
        self.core.lock().await.state.snapshot()
    }

    /// Current detection phase.
    pub async fn state(&self) -> DetectionState {
        self.core.lock().await.state.detection_state()
    }

    /// Button detector mode last programmed.
    pub async fn current_mode(&self) -> CurrentMode {
        self.core.lock().await.current_mode
    }

    /// Calibration in use.
    pub async fn calibration(&self) -> Calibration {
        self.core.lock().await.cal
    }

    /// `true` while a long-press timer is armed.
    pub fn long_press_pending(&self) -> bool {
        self.btn_work.is_pending()
    }

    /// Run `f` with the driver under the resource lock.
    pub async fn with_hw<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.core.lock().await.hw)
    }

    /// Run `f` with the notifier under the resource lock.
    pub async fn with_notifier<R>(&self, f: impl FnOnce(&mut N) -> R) -> R {
        f(&mut self.core.lock().await.notifier)
    }

    /// Tear down, returning the driver and the notifier.
    pub fn into_parts(self) -> (H, N) {
        let core = self.core.into_inner();
        (core.hw, core.notifier)
    }
}
