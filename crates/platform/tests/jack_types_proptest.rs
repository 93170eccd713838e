//! Property-based tests for the jack value types.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

use platform::jack_regs::Reg;
use platform::jack_types::{ButtonMask, JackStatus, MAX_BUTTONS};

proptest::proptest! {
    /// ButtonMask::from_index never panics and sets at most one supported bit.
    #[test]
    fn button_mask_from_index_sets_one_supported_bit(index in 0u8..=255u8) {
        let mask = ButtonMask::from_index(index);
        if usize::from(index) < MAX_BUTTONS {
            assert_eq!(mask.bits().count_ones(), 1);
            assert_eq!(mask.bits().trailing_zeros(), u32::from(index));
        } else {
            assert!(mask.is_empty(), "index {} must map to no button", index);
        }
    }

    /// from_bits never carries bits above the last button.
    #[test]
    fn button_mask_from_bits_stays_in_range(bits in 0u8..=255u8) {
        let mask = ButtonMask::from_bits(bits);
        assert_eq!(mask.bits() & !ButtonMask::ALL.bits(), 0);
        assert_eq!(mask.union(ButtonMask::ALL), ButtonMask::ALL);
    }

    /// Removing facets clears exactly those facets and nothing else.
    #[test]
    fn jack_status_remove_is_without(a in 0u16..0x80u16, b in 0u16..0x80u16) {
        let mut status = JackStatus::from_bits(a);
        status.remove(JackStatus::from_bits(b));
        assert_eq!(status, JackStatus::from_bits(a).without(JackStatus::from_bits(b)));
        assert!(!status.intersects(JackStatus::from_bits(b)));
    }

    /// Inserting then testing a facet always finds it.
    #[test]
    fn jack_status_insert_then_contains(a in 0u16..0x80u16, b in 0u16..0x80u16) {
        let mut status = JackStatus::from_bits(a);
        status.insert(JackStatus::from_bits(b));
        assert!(status.contains(JackStatus::from_bits(b)));
        assert!(status.contains(JackStatus::from_bits(a)));
    }
}

#[test]
fn register_indices_are_dense() {
    assert_eq!(Reg::LDetEn.index(), 0);
    assert_eq!(Reg::EfuseTrimRightHigh.index(), Reg::COUNT - 1);
}
