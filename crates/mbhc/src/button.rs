//! Button debounce engine.
//!
//! ```text
//!            press irq                     long_press elapses
//!   IDLE ──────────────► ARMED ─────────────────────────────► HOLDING
//!    ▲                     │ release irq                         │ release irq
//!    │  Press + Release    │                        Release only │
//!    └─────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! A valid press takes the wake lock and arms the long-press timer. Whoever
//! retires the timer (a release, a removal, or the timer body itself) owns
//! releasing that wake lock, exactly once.

use crate::controller::{Core, Mbhc};
use crate::error::{MbhcError, Result};
use core::sync::atomic::Ordering;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;
use platform::jack::{AccessoryNotifier, JackHardware};
use platform::jack_types::{ButtonEventKind, ButtonMask, PlugType};

/// How the long-press timer was taken out of play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retired {
    /// Nothing was armed; any long press already went out.
    Idle,
    /// Cancelled before its deadline.
    Cancelled,
    /// The deadline passed but the long-press body had not run yet.
    Claimed,
}

impl Retired {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Cancelled => "cancelled",
            Self::Claimed => "claimed",
        }
    }
}

impl<M: RawMutex, H: JackHardware, N: AccessoryNotifier> Mbhc<M, H, N> {
    /// Cancel a pending long-press timer, releasing the wake lock it holds.
    ///
    /// Returns `true` if a timer was pending.
    pub(crate) fn cancel_btn_work(&self, core: &mut Core<H, N>) -> bool {
        if self.btn_work.cancel() {
            core.release_wake_lock();
            true
        } else {
            false
        }
    }

    /// Take the long-press timer out of play whatever its phase.
    pub(crate) fn retire_long_press(&self, core: &mut Core<H, N>) -> Retired {
        if self.cancel_btn_work(core) {
            Retired::Cancelled
        } else if self.btn_work.is_running() {
            // The runner is parked on the resource lock; it will see the item
            // idle and skip the body, so its wake lock is ours to release.
            self.btn_work.abandon();
            core.release_wake_lock();
            Retired::Claimed
        } else {
            Retired::Idle
        }
    }

    /// Retire the timer on removal and release any held button.
    pub(crate) fn retire_buttons_on_removal(&self, core: &mut Core<H, N>) {
        let retired = self.retire_long_press(core);
        let held = core.state.buttons_pressed;
        core.state.buttons_pressed = ButtonMask::EMPTY;
        core.state.is_btn_press = false;
        if !held.is_empty() {
            debug!("button: removal with {} held ({})", held.bits(), retired.as_str());
            core.button_report(ButtonEventKind::Release, held);
        }
    }

    // ── Press ────────────────────────────────────────────────────────────────

    /// Button press interrupt.
    pub async fn on_button_press(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        let result = self.handle_press(&mut core).await;
        if let Err(e) = &result {
            warn!("button press dropped: {}", e.as_str());
        }
        result
    }

    async fn handle_press(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        if self.cancel_btn_work(core) {
            debug!("button: previous press cancelled");
        }
        if core.switch_reads_removed().await? {
            trace!("button: press with empty jack");
            return Ok(());
        }
        core.state.is_btn_press = true;

        if let Some(reported_at) = core.state.reported_at {
            if Instant::now().saturating_duration_since(reported_at) < core.cfg.timing.press_guard {
                debug!("button: press inside insertion guard");
                return Ok(());
            }
        }
        if self.in_swch_irq.load(Ordering::Acquire) {
            debug!("button: press during switch handling");
            return Ok(());
        }
        if core.state.current_plug != PlugType::Headset {
            trace!("button: press without microphone");
            return Ok(());
        }

        let index = core.hw.button_index().await.map_err(MbhcError::Hardware)?;
        let mask = ButtonMask::from_index(index);
        if mask.is_empty() {
            debug!("button: index {} out of range", index);
            return Ok(());
        }
        if !core.hw.wake_lock(true) {
            return Err(MbhcError::WakeLock);
        }
        core.state.buttons_pressed = core.state.buttons_pressed.union(mask);
        debug!("button: press index {} mask {}", index, mask.bits());

        if !self.btn_work.schedule(core.cfg.timing.long_press) {
            warn!("button: long-press timer already armed");
            core.release_wake_lock();
        }
        Ok(())
    }

    // ── Release ──────────────────────────────────────────────────────────────

    /// Button release interrupt.
    pub async fn on_button_release(&self) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        let result = self.handle_release(&mut core).await;
        if let Err(e) = &result {
            warn!("button release dropped: {}", e.as_str());
        }
        result
    }

    async fn handle_release(&self, core: &mut Core<H, N>) -> Result<(), H::Error> {
        if core.switch_reads_removed().await? {
            trace!("button: release with empty jack");
            return Ok(());
        }
        if !core.state.is_btn_press {
            debug!("button: fake release");
            return Ok(());
        }
        core.state.is_btn_press = false;

        if core.state.current_plug == PlugType::Headphone {
            info!("button: release on headphone, microphone present");
            return self.find_plug_and_report_locked(core, PlugType::Headset).await;
        }

        let held = core.state.buttons_pressed;
        if held.is_empty() {
            return Ok(());
        }
        match self.retire_long_press(core) {
            Retired::Cancelled => {
                if self.in_swch_irq.load(Ordering::Acquire) {
                    debug!("button: short press dropped during switch handling");
                } else {
                    core.button_report(ButtonEventKind::Press, held);
                    core.button_report(ButtonEventKind::Release, held);
                }
            }
            Retired::Claimed => {
                core.button_report(ButtonEventKind::LongPress, held);
                core.button_report(ButtonEventKind::Release, held);
            }
            Retired::Idle => core.button_report(ButtonEventKind::Release, held),
        }
        core.state.buttons_pressed = ButtonMask::EMPTY;
        Ok(())
    }

    // ── Long press ───────────────────────────────────────────────────────────

    /// Drive the long-press timer. Never returns; run it from [`run`](Self::run).
    pub(crate) async fn long_press_loop(&self) {
        loop {
            self.btn_work.expired().await;
            let mut core = self.core.lock().await;
            // A release or removal may have retired the item while this task
            // waited for the lock.
            if self.btn_work.is_running() {
                Self::long_press(&mut core);
                self.btn_work.complete();
            }
        }
    }

    fn long_press(core: &mut Core<H, N>) {
        let held = core.state.buttons_pressed;
        if core.state.current_plug == PlugType::Headset && !held.is_empty() {
            info!("button: long press mask {}", held.bits());
            core.button_report(ButtonEventKind::LongPress, held);
        }
        core.release_wake_lock();
    }
}
