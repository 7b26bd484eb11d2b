//! Property tests for the attribute merge policy.

use annohub::merge::{merge, merge_seq, Patch};
use proptest::prelude::*;

fn patch_strategy() -> impl Strategy<Value = Patch<String>> {
    prop_oneof![
        Just(Patch::Unspecified),
        Just(Patch::Clear),
        ".{0,8}".prop_map(Patch::Value),
    ]
}

fn slot_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(".{0,8}")
}

proptest! {
    /// Applying the same patch a second time never changes the slot
    /// and always reports not-applied.
    #[test]
    fn merge_is_idempotent(slot in slot_strategy(), patch in patch_strategy()) {
        let mut once = slot.clone();
        merge("field", &mut once, patch.clone());

        let mut twice = once.clone();
        let reapplied = merge("field", &mut twice, patch);
        prop_assert!(!reapplied);
        prop_assert_eq!(twice, once);
    }

    /// A populated slot never becomes empty: no patch can clear or
    /// blank a field that already carries a non-empty value.
    #[test]
    fn merge_never_empties_a_populated_slot(
        current in ".{1,8}",
        patch in patch_strategy(),
    ) {
        let mut slot = Some(current);
        merge("field", &mut slot, patch);
        prop_assert!(matches!(&slot, Some(s) if !s.is_empty()));
    }

    /// `Unspecified` is inert against any slot state.
    #[test]
    fn merge_unspecified_is_inert(slot in slot_strategy()) {
        let mut after = slot.clone();
        let applied = merge("field", &mut after, Patch::Unspecified);
        prop_assert!(!applied);
        prop_assert_eq!(after, slot);
    }

    /// The applied flag tells the truth: the slot changed iff the
    /// merge reported applied.
    #[test]
    fn merge_reports_changes_faithfully(
        slot in slot_strategy(),
        patch in patch_strategy(),
    ) {
        let before = slot.clone();
        let mut after = slot;
        let applied = merge("field", &mut after, patch);
        prop_assert_eq!(applied, after != before);
    }

    /// Same guarantees for required collection slots.
    #[test]
    fn merge_seq_is_idempotent(
        slot in proptest::collection::vec(".{0,4}", 0..4),
        items in proptest::option::of(proptest::collection::vec(".{0,4}", 0..4)),
    ) {
        let patch = items.map_or(Patch::Clear, Patch::Value);

        let mut once = slot.clone();
        merge_seq("field", &mut once, patch.clone());

        let mut twice = once.clone();
        merge_seq("field", &mut twice, patch);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn merge_seq_never_empties_a_populated_slot(
        slot in proptest::collection::vec(".{1,4}", 1..4),
        items in proptest::option::of(proptest::collection::vec(".{0,4}", 0..4)),
    ) {
        let patch = items.map_or(Patch::Clear, Patch::Value);
        let mut after = slot;
        merge_seq("field", &mut after, patch);
        prop_assert!(!after.is_empty());
    }
}
