use super::{DisplacementIndex, DisplacementSet};
use itertools::Itertools;
use proptest::prelude::*;

#[test]
pub fn four_displacements_are_padded() {
    let set = DisplacementSet::new("POSCAR-", 3, 4);

    assert_eq!(set.indices().join(","), "001,002,003,004");
}

#[test]
pub fn single_displacement_keeps_padding() {
    let set = DisplacementSet::new("POSCAR-", 3, 1);

    assert_eq!(set.indices().map(|index| index.to_string()).collect_vec(), ["001"]);
    assert_eq!(set.input_name(set.index(1)), "POSCAR-001");
}

#[test]
pub fn twelve_displacements_end_at_012() {
    let set = DisplacementSet::new("POSCAR-", 3, 12);

    assert_eq!(set.first().map(|i| i.to_string()).as_deref(), Some("001"));
    assert_eq!(set.last().map(|i| i.to_string()).as_deref(), Some("012"));
}

#[test]
pub fn capacity_follows_width() {
    assert_eq!(DisplacementSet::capacity(3), 999);
    assert_eq!(DisplacementSet::capacity(1), 9);
    assert_eq!(DisplacementSet::capacity(10), u64::from(u32::MAX));
    assert_eq!(DisplacementSet::capacity(40), u64::from(u32::MAX));
}

#[test]
pub fn index_display_wider_than_width_is_not_truncated() {
    assert_eq!(DisplacementIndex::new(1234, 3).to_string(), "1234");
}

proptest! {
    #[test]
    fn indices_cover_exactly_one_to_count(count in 1u32..=999) {
        let set = DisplacementSet::new("POSCAR-", 3, count);
        let indices = set.indices().collect_vec();

        prop_assert_eq!(indices.len() as u32, count);
        prop_assert_eq!(indices[0].value(), 1);
        prop_assert_eq!(indices[indices.len() - 1].value(), count);
        for index in indices {
            prop_assert_eq!(index.to_string().len(), 3);
            prop_assert_ne!(index.to_string(), "000");
        }
    }
}
