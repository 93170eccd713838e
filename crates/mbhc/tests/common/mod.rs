//! Shared rig for the engine integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use mbhc::{Mbhc, MbhcConfig, Timing};
use platform::jack_types::{JackStatus, PlugType};
use platform::mocks::{MockJackHardware, MockNotifier, Report};

pub type TestMbhc = Mbhc<CriticalSectionRawMutex, MockJackHardware, MockNotifier>;

/// Long-press window used by the rig.
pub const LONG_PRESS: Duration = Duration::from_millis(60);

/// Configuration with impedance measurement off and no press guard, so
/// tests can press right after an insertion.
pub fn config() -> MbhcConfig {
    MbhcConfig {
        impedance_detect: false,
        timing: Timing {
            long_press: LONG_PRESS,
            press_guard: Duration::from_millis(0),
            ..Timing::default()
        },
        ..MbhcConfig::default()
    }
}

/// Engine initialised and started on an empty jack, with the notifier
/// cleared.
pub async fn started_with(hw: MockJackHardware, cfg: MbhcConfig) -> TestMbhc {
    let mbhc = Mbhc::new(hw, MockNotifier::new(), cfg);
    mbhc.init().await.unwrap();
    mbhc.start().await.unwrap();
    mbhc.with_notifier(MockNotifier::clear).await;
    mbhc
}

pub async fn started() -> TestMbhc {
    started_with(MockJackHardware::new(), config()).await
}

/// Physically insert `plug` and deliver the switch interrupt.
pub async fn plug_in(mbhc: &TestMbhc, plug: PlugType) {
    mbhc.with_hw(|hw| hw.insert(plug)).await;
    mbhc.on_mech_irq().await.unwrap();
}

/// Physically remove the accessory and deliver the switch interrupt.
pub async fn pull_out(mbhc: &TestMbhc) {
    mbhc.with_hw(MockJackHardware::remove).await;
    mbhc.on_mech_irq().await.unwrap();
}

pub async fn jack_reports(mbhc: &TestMbhc) -> Vec<JackStatus> {
    mbhc.with_notifier(|n| n.jack_reports().iter().copied().collect())
        .await
}

pub async fn reports(mbhc: &TestMbhc) -> Vec<Report> {
    mbhc.with_notifier(|n| n.reports.iter().copied().collect())
        .await
}

pub async fn clear_reports(mbhc: &TestMbhc) {
    mbhc.with_notifier(MockNotifier::clear).await;
}
