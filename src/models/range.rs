//! Identifier ranges that can be fetched from the detail API.

use std::ops::Range;

/// Half-open identifier intervals served by the detail endpoint.
///
/// Identifiers from 500000 upward belong to the OT platform; their detail
/// lookups always fail, so they are left out.
pub const FETCHABLE_RANGES: [Range<u32>; 3] = [10_001..98_000, 99_000..112_290, 117_291..500_000];

/// Whether `id` falls inside one of [`FETCHABLE_RANGES`].
pub fn is_fetchable(id: u32) -> bool {
    FETCHABLE_RANGES.iter().any(|range| range.contains(&id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        let cases = [
            (0, false),
            (10_000, false),
            (10_001, true),
            (97_999, true),
            (98_000, false),
            (98_999, false),
            (99_000, true),
            (112_289, true),
            (112_290, false),
            (117_290, false),
            (117_291, true),
            (499_999, true),
            (500_000, false),
            (u32::MAX, false),
        ];

        for (id, expected) in cases {
            assert_eq!(is_fetchable(id), expected, "id {id}");
        }
    }

    #[test]
    fn test_ranges_are_disjoint_and_ordered() {
        for pair in FETCHABLE_RANGES.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }
}
