//! Codec amplifier and micbias notifications: button detector mode,
//! deferred PA-off acknowledgements and ANC sequencing.
#![allow(clippy::unwrap_used)] // tests unwrap handler results for readable assertions

mod common;

use common::{config, plug_in, pull_out, started, started_with, TestMbhc};
use mbhc::CurrentMode;
use platform::jack::{CodecEvent, MicbiasRequest};
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::PlugType;
use platform::mocks::MockJackHardware;

async fn send(m: &TestMbhc, event: CodecEvent) {
    m.on_codec_event(event).await.unwrap();
}

#[tokio::test]
async fn amplifier_on_moves_detector_to_pullup() {
    let m = started().await;

    send(&m, CodecEvent::PreHphlPaOn).await;

    assert_eq!(m.current_mode().await, CurrentMode::Pullup);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::MicbCtrl)).await, 1);
    assert_eq!(m.with_hw(|hw| hw.thresholds_for_micbias).await, Some(true));
}

#[tokio::test]
async fn amplifier_on_keeps_micbias_while_capturing() {
    let m = started().await;
    m.with_hw(|hw| hw.micbias2_on = true).await;

    send(&m, CodecEvent::PreHphrPaOn).await;

    assert_eq!(m.current_mode().await, CurrentMode::Mb);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::MicbCtrl)).await, 2);
}

#[tokio::test]
async fn micbias_off_falls_back_by_amplifier_state() {
    let m = started().await;
    send(&m, CodecEvent::PostMicbias2On).await;
    assert_eq!(m.current_mode().await, CurrentMode::Mb);
    assert!(m.snapshot().await.hs_recording);

    send(&m, CodecEvent::PreHphlPaOn).await;
    send(&m, CodecEvent::PostMicbias2Off).await;
    assert_eq!(m.current_mode().await, CurrentMode::Pullup);
    assert!(!m.snapshot().await.hs_recording);

    send(&m, CodecEvent::PostHphlPaOff).await;
    assert_eq!(m.current_mode().await, CurrentMode::Cs);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::BtnIsrcCtl)).await, 3);
    assert_eq!(m.with_hw(|hw| hw.thresholds_for_micbias).await, Some(false));

    send(&m, CodecEvent::PostMicbias2Off).await;
    assert_eq!(m.current_mode().await, CurrentMode::Cs);
}

#[tokio::test]
async fn dapm_micbias_events_track_recording() {
    let m = started().await;

    send(&m, CodecEvent::PostDapmMicbias2On).await;
    assert!(m.snapshot().await.hs_recording);
    send(&m, CodecEvent::PostDapmMicbias2Off).await;
    assert!(!m.snapshot().await.hs_recording);
    assert_eq!(m.current_mode().await, CurrentMode::None, "mode untouched");
}

#[tokio::test]
async fn codec_can_mask_the_left_overcurrent_line() {
    let m = started().await;

    send(&m, CodecEvent::OcpOff).await;
    assert!(!m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
    send(&m, CodecEvent::OcpOn).await;
    assert!(m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
}

// ── Chips that sequence micbias themselves ──────────────────────────────────

async fn self_sequencing() -> TestMbhc {
    let mut hw = MockJackHardware::new();
    hw.caps.micbias_control = true;
    let m = started_with(hw, config()).await;
    m.with_hw(|hw| hw.set(Reg::FsmEn, 1)).await;
    m
}

#[tokio::test]
async fn self_sequencing_chip_toggles_button_current_source_only() {
    let m = self_sequencing().await;

    send(&m, CodecEvent::PreMicbias2Off).await;
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::BtnIsrcCtl)).await, 3);

    send(&m, CodecEvent::PostMicbias2On).await;
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::BtnIsrcCtl)).await, 0);
    assert_eq!(m.current_mode().await, CurrentMode::None, "mode is the chip's");
}

#[tokio::test]
async fn self_sequencing_chip_gets_micbias_request_for_headset() {
    let m = self_sequencing().await;

    plug_in(&m, PlugType::Headset).await;
    assert_eq!(
        m.with_hw(|hw| hw.micbias_requests.iter().copied().collect::<Vec<_>>())
            .await,
        vec![MicbiasRequest::Enable]
    );

    // Micbias stays up for the headset, so its pre-off leaves the source alone.
    m.with_hw(|hw| hw.set(Reg::BtnIsrcCtl, 0)).await;
    send(&m, CodecEvent::PreMicbias2Off).await;
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::BtnIsrcCtl)).await, 0);

    pull_out(&m).await;
    assert_eq!(
        m.with_hw(|hw| hw.micbias_requests.last().copied()).await,
        Some(MicbiasRequest::Disable)
    );
}

// ── Deferred PA-off ─────────────────────────────────────────────────────────

async fn removed_with_amplifier_running() -> TestMbhc {
    let m = started().await;
    m.with_hw(|hw| hw.pa_on = true).await;
    plug_in(&m, PlugType::Headset).await;
    pull_out(&m).await;
    m
}

#[tokio::test]
async fn removal_forces_running_amplifiers_off() {
    let m = removed_with_amplifier_running().await;

    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphPaEn)).await, 0);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphlOcpDetEn)).await, 0);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphrOcpDetEn)).await, 0);
}

#[tokio::test]
async fn reinsertion_turns_unacknowledged_amplifiers_back_on() {
    let m = removed_with_amplifier_running().await;

    plug_in(&m, PlugType::Headset).await;

    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphlPaEn)).await, 1);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphrPaEn)).await, 1);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphlOcpDetEn)).await, 1);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphrOcpDetEn)).await, 1);
}

#[tokio::test]
async fn codec_acknowledgement_wins_over_reinsertion() {
    let m = removed_with_amplifier_running().await;

    send(&m, CodecEvent::PostHphlPaOff).await;
    plug_in(&m, PlugType::Headset).await;

    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphlPaEn)).await, 0, "left acked");
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::HphrPaEn)).await, 1, "right pending");
}

#[tokio::test]
async fn anc_paths_are_parked_on_removal_and_resumed_on_insertion() {
    let m = started().await;
    m.with_hw(|hw| hw.anc = true).await;
    plug_in(&m, PlugType::Headset).await;
    pull_out(&m).await;

    assert_eq!(
        m.with_hw(|hw| hw.anc_updates.iter().copied().collect::<Vec<_>>())
            .await,
        vec![(false, 0), (false, 1)]
    );

    plug_in(&m, PlugType::Headset).await;
    assert_eq!(
        m.with_hw(|hw| hw.anc_updates.iter().copied().collect::<Vec<_>>())
            .await,
        vec![(false, 0), (false, 1), (true, 0), (true, 1)]
    );
}

#[tokio::test]
async fn amplifier_off_drops_a_parked_anc_path() {
    let m = started().await;
    m.with_hw(|hw| hw.anc = true).await;
    plug_in(&m, PlugType::Headset).await;
    pull_out(&m).await;

    send(&m, CodecEvent::PostHphrPaOff).await;
    plug_in(&m, PlugType::Headset).await;

    assert_eq!(
        m.with_hw(|hw| hw.anc_updates.last().copied()).await,
        Some((true, 0))
    );
}
