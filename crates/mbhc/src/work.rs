//! Cancellable one-shot timer with an ownership hand-off.
//!
//! ```text
//!            schedule()            deadline + claim()
//!   Idle ───────────────► Pending ───────────────────► Running
//!    ▲                       │                            │
//!    │        cancel() → true│                 complete() │
//!    └───────────────────────┴────────────────────────────┘
//! ```
//!
//! Exactly one side wins the `Pending` state: either a canceller
//! ([`DelayedWork::cancel`] returns `true`) or the timer runner
//! ([`DelayedWork::expired`] returns). The winner owns whatever cleanup the
//! work item carries. A runner that loses simply waits for the next
//! schedule.
//!
//! The state word packs a generation counter above the two phase bits, so a
//! runner that slept through a cancel and re-schedule never claims the newer
//! item at the older deadline.

use core::sync::atomic::{AtomicU32, Ordering};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};

const IDLE: u32 = 0;
const PENDING: u32 = 1;
const RUNNING: u32 = 2;
const PHASE_MASK: u32 = 0b11;

#[allow(clippy::arithmetic_side_effects)] // packed state word; shifts stay in range
const fn pack(generation: u32, phase: u32) -> u32 {
    (generation << 2) | phase
}

const fn generation(word: u32) -> u32 {
    word >> 2
}

const fn phase(word: u32) -> u32 {
    word & PHASE_MASK
}

/// One-shot delayed work item.
pub struct DelayedWork<M: RawMutex> {
    word: AtomicU32,
    armed: Signal<M, (Instant, u32)>,
}

impl<M: RawMutex> DelayedWork<M> {
    /// Idle work item.
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(pack(0, IDLE)),
            armed: Signal::new(),
        }
    }

    /// Arm the timer to fire after `delay`.
    ///
    /// Returns `false` (and leaves the existing deadline alone) if the item
    /// is already pending or running.
    pub fn schedule(&self, delay: Duration) -> bool {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            if phase(current) != IDLE {
                return false;
            }
            let next_gen = generation(current).wrapping_add(1) & (u32::MAX >> 2);
            let next = pack(next_gen, PENDING);
            match self
                .word
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let deadline = Instant::now()
                        .checked_add(delay)
                        .unwrap_or(Instant::MAX);
                    self.armed.signal((deadline, next_gen));
                    return true;
                }
                Err(seen) => current = seen,
            }
        }
    }

    /// Cancel a pending item.
    ///
    /// Returns `true` if the item was pending and will now never run; the
    /// caller takes over its cleanup. Returns `false` if nothing was pending
    /// or the runner already claimed it.
    pub fn cancel(&self) -> bool {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            if phase(current) != PENDING {
                return false;
            }
            let next = pack(generation(current), IDLE);
            match self
                .word
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(seen) => current = seen,
            }
        }
    }

    /// Force the item idle whether pending or running.
    ///
    /// Returns `true` if it was pending or running. Used at shutdown, where
    /// the runner is dropped and cannot finish its own cleanup.
    pub fn abandon(&self) -> bool {
        let current = self.word.load(Ordering::Acquire);
        let was_live = phase(current) != IDLE;
        self.word
            .store(pack(generation(current), IDLE), Ordering::Release);
        was_live
    }

    /// `true` while armed and not yet claimed.
    pub fn is_pending(&self) -> bool {
        phase(self.word.load(Ordering::Acquire)) == PENDING
    }

    /// `true` while the runner owns the item.
    pub fn is_running(&self) -> bool {
        phase(self.word.load(Ordering::Acquire)) == RUNNING
    }

    /// Wait until an armed deadline passes and the runner wins the item.
    ///
    /// On return the item is `Running`; call [`complete`](Self::complete)
    /// once the work body is done.
    pub async fn expired(&self) {
        loop {
            let (deadline, gen) = self.armed.wait().await;
            Timer::at(deadline).await;
            let expect = pack(gen, PENDING);
            if self
                .word
                .compare_exchange(
                    expect,
                    pack(gen, RUNNING),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return;
            }
        }
    }

    /// Mark a running item finished. No effect unless the item is running.
    pub fn complete(&self) {
        let current = self.word.load(Ordering::Acquire);
        if phase(current) == RUNNING {
            let _ = self.word.compare_exchange(
                current,
                pack(generation(current), IDLE),
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

impl<M: RawMutex> Default for DelayedWork<M> {
    fn default() -> Self {
        Self::new()
    }
}
