//! Size-class bucketing.
//!
//! The supported domain `1..=1024` bytes is partitioned into 24 canonical
//! block sizes across five tiers with progressively wider steps: small
//! sizes get fine-grained classes to bound absolute waste, while large
//! sizes tolerate wider steps since relative waste stays bounded.

/// Smallest class size, and the quantization step of the lookup table.
pub const MIN_BLOCK_SIZE_STEP: usize = 8;

/// Largest block size served from the bucket/page system. Anything above
/// goes straight to the system allocator.
pub const MAX_BLOCK_SIZE: usize = 1024;

/// Number of canonical size classes.
pub const CLASS_COUNT: usize = 24;

/// One lookup slot per quantized size in the domain.
const SLOT_COUNT: usize = MAX_BLOCK_SIZE / MIN_BLOCK_SIZE_STEP;

/// Class geometry: (classes in tier, step, lookup slots per class).
const TIERS: [(usize, usize, usize); 5] = [
    (8, 8, 1),   //    8..=64
    (4, 16, 2),  //   80..=128
    (4, 32, 4),  //  160..=256
    (4, 64, 8),  //  320..=512
    (4, 128, 16), // 640..=1024
];

/// Maps any size in `1..=MAX_BLOCK_SIZE` to its class ordinal in O(1).
#[derive(Debug)]
pub(crate) struct SizeClassTable {
    /// Quantized size -> class ordinal.
    class_of: [u8; SLOT_COUNT],
    /// Class ordinal -> canonical block size.
    sizes: [u16; CLASS_COUNT],
}

impl SizeClassTable {
    /// Builds the five-tier table.
    pub(crate) fn new() -> Self {
        let mut class_of = [0u8; SLOT_COUNT];
        let mut sizes = [0u16; CLASS_COUNT];

        let mut class = 0;
        let mut slot = 0;
        let mut size = MIN_BLOCK_SIZE_STEP;
        for (count, step, span) in TIERS {
            for _ in 0..count {
                sizes[class] = size as u16;
                for _ in 0..span {
                    class_of[slot] = class as u8;
                    slot += 1;
                }
                class += 1;
                size += step;
            }
            // One extra step between tiers: the next tier starts a full
            // (wider) step above the last class, not adjacent to it.
            size += step;
        }
        debug_assert_eq!(class, CLASS_COUNT);
        debug_assert_eq!(slot, SLOT_COUNT);
        debug_assert_eq!(sizes[CLASS_COUNT - 1] as usize, MAX_BLOCK_SIZE);

        Self { class_of, sizes }
    }

    /// Class ordinal `c` such that `class_size(c) >= size` and no smaller
    /// configured class satisfies that bound.
    ///
    /// Defined for `1..=MAX_BLOCK_SIZE`; callers pre-filter larger sizes.
    /// Zero is debug-asserted and clamps to class 0 in release.
    #[inline]
    pub(crate) fn classify(&self, size: usize) -> usize {
        debug_assert!(size >= 1, "zero-size request");
        debug_assert!(size <= MAX_BLOCK_SIZE, "oversized request not pre-filtered");
        self.class_of[size.saturating_sub(1) / MIN_BLOCK_SIZE_STEP] as usize
    }

    /// Canonical block size of `class`.
    #[inline]
    pub(crate) fn class_size(&self, class: usize) -> usize {
        self.sizes[class] as usize
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn tier_boundaries() {
        let table = SizeClassTable::new();

        // First tier: one class per 8-byte step.
        assert_eq!(table.classify(1), 0);
        assert_eq!(table.classify(8), 0);
        assert_eq!(table.classify(9), 1);
        assert_eq!(table.classify(64), 7);
        assert_eq!(table.class_size(0), 8);
        assert_eq!(table.class_size(7), 64);

        // Tier seams: 64 -> 80, 128 -> 160, 256 -> 320, 512 -> 640.
        assert_eq!(table.class_size(table.classify(65)), 80);
        assert_eq!(table.class_size(table.classify(128)), 128);
        assert_eq!(table.class_size(table.classify(129)), 160);
        assert_eq!(table.class_size(table.classify(257)), 320);
        assert_eq!(table.class_size(table.classify(513)), 640);

        // Top of the domain.
        assert_eq!(table.classify(1024), CLASS_COUNT - 1);
        assert_eq!(table.class_size(CLASS_COUNT - 1), MAX_BLOCK_SIZE);
    }

    #[test]
    fn class_sizes_are_strictly_increasing_word_multiples() {
        let table = SizeClassTable::new();
        for class in 0..CLASS_COUNT {
            assert_eq!(table.class_size(class) % MIN_BLOCK_SIZE_STEP, 0);
            if class > 0 {
                assert!(table.class_size(class) > table.class_size(class - 1));
            }
        }
    }

    proptest! {
        #[test]
        fn classify_is_monotonic_and_minimal(size in 1usize..=MAX_BLOCK_SIZE) {
            let table = SizeClassTable::new();
            let class = table.classify(size);

            // Covering: the class fits the request.
            prop_assert!(table.class_size(class) >= size);
            // Minimal: no smaller class would have.
            if class > 0 {
                prop_assert!(table.class_size(class - 1) < size);
            }
            // Monotonic in the request size.
            if size < MAX_BLOCK_SIZE {
                prop_assert!(table.classify(size + 1) >= class);
            }
        }
    }
}
