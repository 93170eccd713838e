//! Init, start, stop and deinit: interrupt claiming and unwinding, key
//! binding, hardware bring-up and calibration loading.
#![allow(clippy::unwrap_used)] // tests unwrap handler results for readable assertions

mod common;

use common::{config, plug_in, pull_out, reports, started, TestMbhc};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use mbhc::lifecycle::IRQ_ORDER;
use mbhc::{CalibrationSource, ConfigError, DetectionState, Mbhc, MbhcConfig, MbhcError, Timing};
use platform::jack::Calibration;
use platform::jack_regs::{Irq, Reg};
use platform::jack_types::{Accessory, JackStatus, PlugType};
use platform::mocks::{MockFault, MockJackHardware, MockNotifier, Report};

fn engine(hw: MockJackHardware, cfg: MbhcConfig) -> TestMbhc {
    Mbhc::new(hw, MockNotifier::new(), cfg)
}

#[tokio::test]
async fn init_claims_every_line_in_order_with_electrical_lines_masked() {
    let m = engine(MockJackHardware::new(), config());
    m.init().await.unwrap();

    let (hw, notifier) = m.into_parts();
    assert_eq!(hw.requested.as_slice(), IRQ_ORDER.as_slice());
    assert!(hw.irq_enabled(Irq::MechInsRem));
    assert!(hw.irq_enabled(Irq::HphrOcp));
    assert!(!hw.irq_enabled(Irq::ElecInsertion));
    assert!(!hw.irq_enabled(Irq::ElecRemoval));
    assert!(hw.irq_claimed(Irq::ElecRemoval));
    assert!(hw.notifier_registered);
    let keys: [(u8, u16); 4] = [(0, 226), (1, 582), (2, 115), (3, 114)];
    assert_eq!(notifier.keys.as_slice(), keys.as_slice(), "unbound slots skipped");
}

#[tokio::test]
async fn failed_claim_releases_earlier_lines_in_reverse() {
    let mut hw = MockJackHardware::new();
    hw.fail_request = Some(Irq::ElecRemoval);
    let m = engine(hw, config());

    let r = m.init().await;
    assert!(matches!(r, Err(MbhcError::Hardware(_))));

    let (hw, notifier) = m.into_parts();
    assert_eq!(
        hw.freed.as_slice(),
        [
            Irq::ElecInsertion,
            Irq::ButtonRelease,
            Irq::ButtonPress,
            Irq::MechInsRem
        ]
        .as_slice()
    );
    assert!(!hw.notifier_registered);
    assert!(notifier.keys.is_empty());
}

#[tokio::test]
async fn unwind_keeps_the_claim_error_when_unsubscribing_fails() {
    let mut hw = MockJackHardware::new();
    hw.fail_request = Some(Irq::ButtonPress);
    hw.fail_notifier_release = true;
    let m = engine(hw, config());

    let r = m.init().await;
    assert!(matches!(r, Err(MbhcError::Hardware(MockFault))));

    let (hw, notifier) = m.into_parts();
    assert_eq!(hw.freed.as_slice(), [Irq::MechInsRem].as_slice());
    assert!(notifier.keys.is_empty());
}

#[tokio::test]
async fn invalid_configuration_touches_no_hardware() {
    let cfg = MbhcConfig {
        key_codes: [226, 226, 0, 0, 0, 0],
        ..config()
    };
    let m = engine(MockJackHardware::new(), cfg);

    let r = m.init().await;
    assert!(matches!(
        r,
        Err(MbhcError::Config(ConfigError::DuplicateKeyCode(226)))
    ));
    let (hw, _) = m.into_parts();
    assert!(hw.requested.is_empty());
    assert!(!hw.notifier_registered);
}

#[tokio::test]
async fn missing_capability_is_a_configuration_error() {
    let mut hw = MockJackHardware::new();
    hw.caps.impedance = false;
    let m = engine(hw, MbhcConfig::default());

    assert!(matches!(
        m.init().await,
        Err(MbhcError::Config(ConfigError::MissingCapability("impedance")))
    ));
}

#[tokio::test]
async fn notifier_failure_claims_nothing() {
    let mut hw = MockJackHardware::new();
    hw.fail_notifier = true;
    let m = engine(hw, config());

    assert!(m.init().await.is_err());
    let (hw, _) = m.into_parts();
    assert!(hw.requested.is_empty());
}

#[tokio::test]
async fn start_programs_the_detection_block() {
    let m = started().await;
    let (hw, _) = m.into_parts();

    assert_eq!(hw.reg(Reg::HsLDetPullUpCtrl), 3);
    assert_eq!(hw.reg(Reg::HphlPlugType), 1);
    assert_eq!(hw.reg(Reg::GndPlugType), 0);
    assert_eq!(hw.reg(Reg::SwHphLp100kToGnd), 1);
    assert_eq!(hw.reg(Reg::HsLDetPullUpCompCtrl), 1);
    assert_eq!(hw.reg(Reg::LDetEn), 1);
    assert_eq!(hw.reg(Reg::InsRemDbnc), 6);
    assert_eq!(hw.reg(Reg::BtnDbnc), 2);
    assert_eq!(hw.reg(Reg::HsVref), 3);
    assert_eq!(hw.reg(Reg::MechDetectionType), 1);
    assert!(hw.bias_on && hw.clk_on && hw.gnd_det_on);
    assert_eq!(hw.threshold_programs, 1);
    assert_eq!(hw.thresholds_for_micbias, Some(false));
    assert!(!hw.moisture_detect, "moisture comparator left off");
}

#[tokio::test]
async fn start_with_plug_already_inserted_reports_it() {
    let mut hw = MockJackHardware::new();
    hw.insert(PlugType::Headset);
    let m = engine(hw, config());
    m.init().await.unwrap();
    m.start().await.unwrap();

    assert_eq!(
        reports(&m).await,
        vec![
            Report::Jack(JackStatus::HEADSET | JackStatus::MECHANICAL),
            Report::Extcon(Accessory::Microphone, true)
        ]
    );
}

#[tokio::test]
async fn stop_forgets_the_accessory_and_ends_the_runner() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;

    m.stop().await.unwrap();

    assert_eq!(m.state().await, DetectionState::None);
    assert_eq!(m.snapshot().await.hph_status, JackStatus::EMPTY);
    assert!(!m.with_hw(|hw| hw.irq_enabled(Irq::HphlOcp)).await);
    let r = select(m.run(), Timer::after(Duration::from_secs(1))).await;
    assert!(matches!(r, Either::First(())), "runner kept going after stop");
}

#[tokio::test]
async fn restart_after_stop_detects_again() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;
    m.with_hw(MockJackHardware::remove).await;
    m.stop().await.unwrap();

    m.start().await.unwrap();
    common::clear_reports(&m).await;
    plug_in(&m, PlugType::Headphone).await;

    assert_eq!(m.state().await, DetectionState::Headphone);
}

#[tokio::test]
async fn deinit_releases_in_reverse_and_silences_reports() {
    let m = started().await;
    plug_in(&m, PlugType::Headset).await;
    common::clear_reports(&m).await;

    m.deinit().await.unwrap();
    pull_out(&m).await;

    assert!(reports(&m).await.is_empty());
    let (hw, _) = m.into_parts();
    let reversed: Vec<Irq> = IRQ_ORDER.iter().rev().copied().collect();
    assert_eq!(hw.freed.as_slice(), reversed.as_slice());
    assert!(!hw.notifier_registered);
}

// ── Calibration store ───────────────────────────────────────────────────────

fn from_store() -> MbhcConfig {
    MbhcConfig {
        calibration: CalibrationSource::Store,
        timing: Timing {
            calibration_backoff: Duration::from_millis(5),
            ..config().timing
        },
        ..config()
    }
}

/// Start, then let the runner work for a while.
async fn start_and_run(m: &TestMbhc) {
    m.init().await.unwrap();
    m.start().await.unwrap();
    assert!(
        !m.with_hw(|hw| hw.bias_on).await,
        "bring-up waits for calibration"
    );
    let _ = select(m.run(), Timer::after(Duration::from_millis(200))).await;
}

#[tokio::test]
async fn stored_calibration_loads_after_retries() {
    let mut hw = MockJackHardware::new();
    let custom = Calibration {
        v_hs_max: 2000,
        ..Calibration::DEFAULT
    };
    hw.calibration = Some(custom);
    hw.calibration_ready_after = 1;
    let m = engine(hw, from_store());

    start_and_run(&m).await;

    assert_eq!(m.calibration().await, custom);
    let (hw, _) = m.into_parts();
    assert_eq!(hw.calibration_attempts, 2);
    assert!(hw.bias_on);
    assert_eq!(hw.reg(Reg::HsVref), 6);
}

#[tokio::test]
async fn missing_calibration_falls_back_to_defaults() {
    let m = engine(MockJackHardware::new(), from_store());

    start_and_run(&m).await;

    assert_eq!(m.calibration().await, Calibration::DEFAULT);
    let (hw, _) = m.into_parts();
    assert_eq!(hw.calibration_attempts, 3);
    assert_eq!(hw.reg(Reg::HsVref), 3);
}

#[tokio::test]
async fn deferred_bring_up_still_reports_a_present_plug() {
    let mut hw = MockJackHardware::new();
    hw.calibration = Some(Calibration::DEFAULT);
    hw.insert(PlugType::Headset);
    let m = engine(hw, from_store());

    start_and_run(&m).await;

    assert_eq!(m.state().await, DetectionState::Headset);
}
