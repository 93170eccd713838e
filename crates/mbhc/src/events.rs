//! Codec amplifier and micbias notifications.
//!
//! The owning codec reports its power sequencing through
//! [`Mbhc::on_codec_event`]. While an amplifier runs the button detector
//! moves off micbias onto the pull-up unless MIC_BIAS_2 is on for capture;
//! amplifier-off restores the current source and completes any PA-off
//! acknowledgement a removal left behind.

use crate::controller::{Core, Mbhc};
use crate::error::Result;
use crate::state::CurrentMode;
use embassy_sync::blocking_mutex::raw::RawMutex;
use platform::jack::{AccessoryNotifier, CodecEvent, JackHardware};
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::Channel;

impl<M: RawMutex, H: JackHardware, N: AccessoryNotifier> Mbhc<M, H, N> {
    /// Amplifier or micbias lifecycle notification from the codec.
    pub async fn on_codec_event(&self, event: CodecEvent) -> Result<(), H::Error> {
        // The ack cells are cleared before the resource lock is taken.
        let acked = match event {
            CodecEvent::PostHphlPaOff => self.pa_ack.test_and_clear(Channel::Left),
            CodecEvent::PostHphrPaOff => self.pa_ack.test_and_clear(Channel::Right),
            _ => false,
        };
        if acked {
            debug!("codec: {} completes deferred PA-off", event.as_str());
        }

        let mut core = self.core.lock().await;
        let result = core.handle_codec_event(event).await;
        if let Err(e) = &result {
            warn!("codec event {} dropped: {}", event.as_str(), e.as_str());
        }
        result
    }
}

impl<H: JackHardware, N: AccessoryNotifier> Core<H, N> {
    async fn handle_codec_event(&mut self, event: CodecEvent) -> Result<(), H::Error> {
        trace!("codec: {}", event.as_str());
        match event {
            CodecEvent::PostDapmMicbias2On => self.state.hs_recording = true,
            CodecEvent::PostDapmMicbias2Off => self.state.hs_recording = false,
            CodecEvent::PostMicbias2On => {
                if self.caps.micbias_control {
                    if self.read(Reg::FsmEn).await? != 0 {
                        self.write(Reg::BtnIsrcCtl, 0).await?;
                    }
                } else {
                    self.state.hs_recording = true;
                    self.set_current_mode(CurrentMode::Mb).await?;
                }
            }
            CodecEvent::PreMicbias2Off => {
                // Keep button detection alive once micbias goes away.
                if self.caps.micbias_control
                    && !self.state.micbias_enable
                    && self.read(Reg::FsmEn).await? != 0
                {
                    self.write(Reg::BtnIsrcCtl, 3).await?;
                }
            }
            CodecEvent::PostMicbias2Off => {
                if !self.caps.micbias_control {
                    self.state.hs_recording = false;
                }
                let mode = if self.state.micbias_enable {
                    CurrentMode::Mb
                } else if self.state.pa_events.any() {
                    CurrentMode::Pullup
                } else {
                    CurrentMode::Cs
                };
                self.set_current_mode(mode).await?;
            }
            CodecEvent::PreHphlPaOn => {
                self.state.pa_events.hphl = true;
                let mode = self.micbias_or(CurrentMode::Pullup).await?;
                self.set_current_mode(mode).await?;
            }
            CodecEvent::PreHphrPaOn => {
                self.state.pa_events.hphr = true;
                let mode = self.micbias_or(CurrentMode::Pullup).await?;
                self.set_current_mode(mode).await?;
            }
            CodecEvent::PostHphlPaOff => self.pa_off(Channel::Left).await?,
            CodecEvent::PostHphrPaOff => self.pa_off(Channel::Right).await?,
            CodecEvent::OcpOff => self.set_irq(Irq::HphlOcp, false).await?,
            CodecEvent::OcpOn => self.set_irq(Irq::HphlOcp, true).await?,
        }
        Ok(())
    }

    async fn pa_off(&mut self, channel: Channel) -> Result<(), H::Error> {
        // A powered-down output starts its next session with a full budget.
        if self.state.hph_status.contains(crate::ocp::oc_facet(channel)) {
            self.ocp_off_report(channel).await?;
        } else {
            *self.state.ocp_retries.get_mut(channel) = 0;
        }
        match channel {
            Channel::Left => self.state.pa_events.hphl = false,
            Channel::Right => self.state.pa_events.hphr = false,
        }
        let mode = self.micbias_or(CurrentMode::Cs).await?;
        self.set_current_mode(mode).await?;
        match channel {
            Channel::Left => self.state.anc_acks.anc0 = false,
            Channel::Right => self.state.anc_acks.anc1 = false,
        }
        Ok(())
    }
}
