//! Property-based tests over random interrupt sequences.
//! Whatever order insertions, bounces and button edges arrive in, a removal
//! always leaves the engine empty with the wake lock balanced.
#![allow(clippy::unwrap_used)] // tests unwrap handler results for readable assertions

mod common;

use common::{config, TestMbhc};
use embassy_futures::block_on;
use mbhc::{DetectionState, Mbhc};
use platform::jack_regs::Reg;
use platform::jack_types::{ButtonMask, JackStatus, PlugType};
use platform::mocks::{MockJackHardware, MockNotifier};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Step {
    Insert(PlugType),
    Remove,
    /// Switch interrupt with no physical change.
    Bounce,
    Press(u8),
    Release,
}

fn plug() -> impl Strategy<Value = PlugType> {
    prop_oneof![
        Just(PlugType::None),
        Just(PlugType::Headphone),
        Just(PlugType::Headset),
        Just(PlugType::HighImpedance),
        Just(PlugType::GroundMicSwap),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        plug().prop_map(Step::Insert),
        Just(Step::Remove),
        Just(Step::Bounce),
        (0_u8..8).prop_map(Step::Press),
        Just(Step::Release),
    ]
}

async fn apply(m: &TestMbhc, step: Step) {
    match step {
        Step::Insert(plug) => {
            // Only a physically empty jack can take a new plug.
            let empty = m.with_hw(|hw| hw.reg(Reg::SwchLevelRemove)).await;
            if empty != 0 {
                m.with_hw(|hw| hw.insert(plug)).await;
                m.on_mech_irq().await.unwrap();
            }
        }
        Step::Remove => {
            m.with_hw(MockJackHardware::remove).await;
            m.on_mech_irq().await.unwrap();
        }
        Step::Bounce => m.on_mech_irq().await.unwrap(),
        Step::Press(index) => {
            m.with_hw(|hw| hw.button = index).await;
            m.on_button_press().await.unwrap();
        }
        Step::Release => m.on_button_release().await.unwrap(),
    }
}

async fn check_removed(m: &TestMbhc, saw_insertion: bool) {
    let snap = m.snapshot().await;
    assert_eq!(snap.state, DetectionState::None);
    assert_eq!(snap.hph_status, JackStatus::EMPTY);
    assert_eq!(snap.buttons_pressed, ButtonMask::EMPTY);
    assert!(!m.long_press_pending());
    assert_eq!(m.with_hw(|hw| hw.wake_lock_balance()).await, 0);
    if saw_insertion {
        assert_eq!(
            m.with_notifier(|n| n.last_jack()).await,
            Some(JackStatus::EMPTY)
        );
    }
}

proptest::proptest! {
    /// Removal always returns the engine to empty, whatever preceded it.
    #[test]
    fn removal_always_resets(steps in proptest::collection::vec(step(), 1..40)) {
        block_on(async {
            let m: TestMbhc = Mbhc::new(MockJackHardware::new(), MockNotifier::new(), config());
            m.init().await.unwrap();
            m.start().await.unwrap();

            let mut saw_insertion = false;
            for step in steps {
                apply(&m, step).await;
                let reported = m.with_notifier(|n| !n.jack_reports().is_empty()).await;
                saw_insertion |= reported;
                if matches!(step, Step::Remove) {
                    check_removed(&m, saw_insertion).await;
                    saw_insertion = false;
                    m.with_notifier(MockNotifier::clear).await;
                }
                let balance = m.with_hw(|hw| hw.wake_lock_balance()).await;
                assert!((0..=1).contains(&balance), "wake lock balance {}", balance);
            }
        });
    }

    /// Button masks only ever carry supported buttons.
    #[test]
    fn held_mask_stays_within_supported_buttons(indices in proptest::collection::vec(0_u8..16, 1..10)) {
        block_on(async {
            let m: TestMbhc = Mbhc::new(MockJackHardware::new(), MockNotifier::new(), config());
            m.init().await.unwrap();
            m.start().await.unwrap();
            m.with_hw(|hw| hw.insert(PlugType::Headset)).await;
            m.on_mech_irq().await.unwrap();

            for index in indices {
                m.with_hw(|hw| hw.button = index).await;
                m.on_button_press().await.unwrap();
                let held = m.snapshot().await.buttons_pressed;
                assert_eq!(held.bits() & !ButtonMask::ALL.bits(), 0);
            }
            m.on_button_release().await.unwrap();
            assert_eq!(m.with_hw(|hw| hw.wake_lock_balance()).await, 0);
        });
    }
}
