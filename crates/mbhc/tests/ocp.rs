//! Over-current retry budget, per-channel disable, and recovery on
//! amplifier power-down or removal.
#![allow(clippy::unwrap_used)] // tests unwrap handler results for readable assertions

mod common;

use common::{clear_reports, config, jack_reports, plug_in, pull_out, started, started_with};
use mbhc::config::DEFAULT_OCP_ATTEMPTS;
use mbhc::{CurrentMode, MbhcConfig};
use platform::jack::CodecEvent;
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::{JackStatus, PlugType};
use platform::mocks::MockJackHardware;

#[tokio::test]
async fn trips_below_the_limit_restart_the_detector() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;
    clear_reports(&m).await;

    for _ in 1..DEFAULT_OCP_ATTEMPTS {
        m.on_hphl_ocp().await.unwrap();
    }

    assert!(jack_reports(&m).await.is_empty());
    assert!(m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
    assert_eq!(m.with_hw(|hw| hw.reg(Reg::OcpFsmEn)).await, 1);
}

#[tokio::test]
async fn trip_at_the_limit_disables_the_channel_once() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;
    clear_reports(&m).await;

    for _ in 0..DEFAULT_OCP_ATTEMPTS {
        m.on_hphl_ocp().await.unwrap();
    }

    let overcurrent = JackStatus::HEADSET | JackStatus::OC_HPHL;
    assert_eq!(jack_reports(&m).await, vec![overcurrent]);
    assert!(!m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);

    // Further trips are stale: the channel is already off.
    m.on_hphl_ocp().await.unwrap();
    assert_eq!(jack_reports(&m).await.len(), 1);
}

#[tokio::test]
async fn channels_keep_separate_budgets() {
    let cfg = MbhcConfig {
        ocp_attempts: 2,
        ..config()
    };
    let m = started_with(MockJackHardware::new(), cfg).await;
    plug_in(&m, PlugType::Headphone).await;
    clear_reports(&m).await;

    m.on_hphl_ocp().await.unwrap();
    m.on_hphr_ocp().await.unwrap();
    assert!(jack_reports(&m).await.is_empty());

    m.on_hphr_ocp().await.unwrap();
    assert_eq!(
        jack_reports(&m).await,
        vec![JackStatus::HEADPHONE | JackStatus::OC_HPHR]
    );
    assert!(m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
    assert!(!m.with_hw(|hw| hw.irq_enabled(Irq::HphrOcp)).await);
}

#[tokio::test]
async fn amplifier_off_clears_the_facet_and_restores_the_budget() {
    let cfg = MbhcConfig {
        ocp_attempts: 1,
        ..config()
    };
    let m = started_with(MockJackHardware::new(), cfg).await;
    plug_in(&m, PlugType::Headset).await;
    m.on_hphl_ocp().await.unwrap();
    clear_reports(&m).await;

    m.on_codec_event(CodecEvent::PostHphlPaOff).await.unwrap();

    assert_eq!(jack_reports(&m).await, vec![JackStatus::HEADSET]);
    assert!(m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
    assert_eq!(m.current_mode().await, CurrentMode::Cs);

    // Fresh budget: the next trip counts as the first again.
    clear_reports(&m).await;
    m.on_hphl_ocp().await.unwrap();
    assert_eq!(
        jack_reports(&m).await,
        vec![JackStatus::HEADSET | JackStatus::OC_HPHL]
    );
}

#[tokio::test]
async fn amplifier_off_restores_a_partly_used_budget() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;
    for _ in 1..DEFAULT_OCP_ATTEMPTS {
        m.on_hphl_ocp().await.unwrap();
    }
    m.on_codec_event(CodecEvent::PostHphlPaOff).await.unwrap();
    clear_reports(&m).await;

    // One trip in the new session is a retry, not the last straw.
    m.on_hphl_ocp().await.unwrap();

    assert!(jack_reports(&m).await.is_empty());
    assert!(m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
}

#[tokio::test]
async fn amplifier_off_without_trip_reports_nothing() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;
    clear_reports(&m).await;

    m.on_codec_event(CodecEvent::PostHphrPaOff).await.unwrap();

    assert!(jack_reports(&m).await.is_empty());
}

#[tokio::test]
async fn removal_clears_overcurrent_state() {
    let cfg = MbhcConfig {
        ocp_attempts: 1,
        ..config()
    };
    let m = started_with(MockJackHardware::new(), cfg).await;
    plug_in(&m, PlugType::Headset).await;
    m.on_hphr_ocp().await.unwrap();
    clear_reports(&m).await;

    pull_out(&m).await;

    assert_eq!(jack_reports(&m).await, vec![JackStatus::EMPTY]);
    assert!(m.with_hw(|hw| hw.irq_enabled(Irq::HphrOcp)).await);
    assert_eq!(m.snapshot().await.hph_status, JackStatus::EMPTY);
}
