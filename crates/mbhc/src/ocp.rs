//! Over-current protection retry.
//!
//! Each output channel tolerates a bounded number of over-current trips per
//! session. Every trip before the limit restarts the protection state
//! machine; the trip that reaches the limit masks the channel's interrupt and
//! raises its over-current facet. The counter clears on removal and whenever
//! the channel's amplifier reports fully off; a raised facet clears with it.

use crate::controller::{Core, Mbhc};
use crate::error::Result;
use embassy_sync::blocking_mutex::raw::RawMutex;
use platform::jack::{AccessoryNotifier, JackHardware};
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::{Channel, JackStatus};

/// Over-current facet of a channel.
pub(crate) fn oc_facet(channel: Channel) -> JackStatus {
    match channel {
        Channel::Left => JackStatus::OC_HPHL,
        Channel::Right => JackStatus::OC_HPHR,
    }
}

fn ocp_irq(channel: Channel) -> Irq {
    match channel {
        Channel::Left => Irq::HphlOcp,
        Channel::Right => Irq::HphrOcp,
    }
}

fn channel_str(channel: Channel) -> &'static str {
    match channel {
        Channel::Left => "hphl",
        Channel::Right => "hphr",
    }
}

impl<M: RawMutex, H: JackHardware, N: AccessoryNotifier> Mbhc<M, H, N> {
    /// Left output over-current interrupt.
    pub async fn on_hphl_ocp(&self) -> Result<(), H::Error> {
        self.on_ocp(Channel::Left).await
    }

    /// Right output over-current interrupt.
    pub async fn on_hphr_ocp(&self) -> Result<(), H::Error> {
        self.on_ocp(Channel::Right).await
    }

    /// Over-current interrupt on `channel`.
    pub async fn on_ocp(&self, channel: Channel) -> Result<(), H::Error> {
        let mut core = self.core.lock().await;
        let result = core.handle_ocp(channel).await;
        if let Err(e) = &result {
            warn!("{} ocp dropped: {}", channel_str(channel), e.as_str());
        }
        result
    }
}

impl<H: JackHardware, N: AccessoryNotifier> Core<H, N> {
    async fn handle_ocp(&mut self, channel: Channel) -> Result<(), H::Error> {
        let facet = oc_facet(channel);
        if self.state.hph_status.contains(facet) {
            trace!("{} ocp: channel already disabled", channel_str(channel));
            return Ok(());
        }

        let limit = self.cfg.ocp_attempts;
        let retries = self.state.ocp_retries.get_mut(channel);
        let seen = retries.saturating_add(1);
        *retries = seen;

        if seen < limit {
            debug!("{} ocp: retry {} of {}", channel_str(channel), seen, limit);
            self.restart_ocp_fsm().await
        } else {
            warn!("{} ocp: limit reached, channel disabled", channel_str(channel));
            self.set_irq(ocp_irq(channel), false).await?;
            self.state.hph_status.insert(facet);
            let status = self.state.hph_status;
            self.jack_report(status);
            Ok(())
        }
    }

    async fn restart_ocp_fsm(&mut self) -> Result<(), H::Error> {
        self.write(Reg::OcpFsmEn, 0).await?;
        self.write(Reg::OcpFsmEn, 1).await
    }

    /// Clear a raised over-current facet and give the channel a fresh budget.
    pub(crate) async fn ocp_off_report(&mut self, channel: Channel) -> Result<(), H::Error> {
        self.state.hph_status.remove(oc_facet(channel));
        let status = self.state.hph_status;
        self.jack_report(status);
        self.restart_ocp_fsm().await?;
        *self.state.ocp_retries.get_mut(channel) = 0;
        self.set_irq(ocp_irq(channel), true).await
    }
}
