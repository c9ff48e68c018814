use proptest::prelude::*;

use client_export::export::skill_caps::{CapMode, EffectiveSkillCap, SkillCapAggregator};
use client_export::test_utils::fixtures::MemorySkillCaps;

fn source_strategy() -> impl Strategy<Value = MemorySkillCaps> {
    prop::collection::vec((1u8..=4, 0u8..=5, 1u8..=20, 0u32..300), 0..40).prop_map(|entries| {
        let mut source = MemorySkillCaps::new();
        for (class_id, skill_id, level, cap) in entries {
            source.insert(class_id, skill_id, level, cap);
        }
        source
    })
}

fn aggregate(source: &MemorySkillCaps, mode: CapMode, max_level: u8) -> Vec<EffectiveSkillCap> {
    SkillCapAggregator::new(source, mode, max_level)
        .collect()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_caps_never_decrease(source in source_strategy(), max_level in 1u8..=30, multiclass in any::<bool>()) {
        let mode = if multiclass { CapMode::Multiclass } else { CapMode::Legacy };
        let rows = aggregate(&source, mode, max_level);
        for pair in rows.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if prev.class_id == next.class_id && prev.skill_id == next.skill_id {
                prop_assert_eq!(next.level, prev.level + 1);
                prop_assert!(next.cap >= prev.cap);
            }
        }
    }

    #[test]
    fn test_only_usable_pairs_emitted(source in source_strategy(), max_level in 1u8..=30, multiclass in any::<bool>()) {
        let mode = if multiclass { CapMode::Multiclass } else { CapMode::Legacy };
        let rows = aggregate(&source, mode, max_level);
        for row in &rows {
            prop_assert!(source.defines(row.class_id, row.skill_id));
        }
        for class_id in 1u8..=16 {
            for skill_id in 0u8..=77 {
                let count = rows
                    .iter()
                    .filter(|row| row.class_id == class_id && row.skill_id == skill_id)
                    .count();
                let expected = if source.defines(class_id, skill_id) { usize::from(max_level) } else { 0 };
                prop_assert_eq!(count, expected);
            }
        }
    }

    #[test]
    fn test_rows_sorted_by_class_skill_level(source in source_strategy(), max_level in 1u8..=30) {
        let rows = aggregate(&source, CapMode::Legacy, max_level);
        let keys: Vec<(u8, u8, u8)> = rows.iter().map(|row| (row.class_id, row.skill_id, row.level)).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(keys, sorted);
    }

    #[test]
    fn test_legacy_is_running_maximum_of_own_caps(source in source_strategy(), max_level in 1u8..=30) {
        let rows = aggregate(&source, CapMode::Legacy, max_level);
        for row in &rows {
            let expected = (1..=row.level)
                .filter_map(|level| {
                    use client_export::export::skill_caps::SkillCapSource;
                    source.cap_at(row.skill_id, row.class_id, level).unwrap()
                })
                .max()
                .unwrap_or(0);
            prop_assert_eq!(row.cap, expected);
        }
    }

    #[test]
    fn test_multiclass_never_below_legacy(source in source_strategy(), max_level in 1u8..=30) {
        let legacy = aggregate(&source, CapMode::Legacy, max_level);
        let multiclass = aggregate(&source, CapMode::Multiclass, max_level);
        prop_assert_eq!(legacy.len(), multiclass.len());
        for (own, shared) in legacy.iter().zip(&multiclass) {
            prop_assert_eq!(
                (own.class_id, own.skill_id, own.level),
                (shared.class_id, shared.skill_id, shared.level)
            );
            prop_assert!(shared.cap >= own.cap);
        }
    }
}
