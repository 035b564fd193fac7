//! Progress arithmetic for the job readout.
//!
//! Progress is derived, never authoritative: every value here is a pure
//! function of the phase counters, so a caller can recompute it from the
//! Job record at any checkpoint. The three phase weights sum to exactly
//! 100 and each phase's floor equals the previous phase's cap, which makes
//! the reported sequence non-decreasing by construction.

/// Share of the overall job occupied by the extraction phase.
pub const EXTRACTION_WEIGHT: u8 = 15;
/// Share occupied by text generation.
pub const GENERATION_WEIGHT: u8 = 77;
/// Share occupied by image rendering.
pub const IMAGING_WEIGHT: u8 = 8;

pub const COMPLETE: u8 = 100;

/// Checkpoint reached once extraction has succeeded.
pub fn after_extraction() -> u8 {
    EXTRACTION_WEIGHT
}

/// Progress during the generation phase. A zero-task plan counts as a fully
/// settled phase.
pub fn during_generation(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return EXTRACTION_WEIGHT + GENERATION_WEIGHT;
    }
    let band = completed as u64 * GENERATION_WEIGHT as u64 / total as u64;
    EXTRACTION_WEIGHT + band as u8
}

/// Progress during the imaging phase.
pub fn during_imaging(completed: u32, total: u32) -> u8 {
    let base = EXTRACTION_WEIGHT + GENERATION_WEIGHT;
    if total == 0 {
        return base + IMAGING_WEIGHT;
    }
    let band = completed as u64 * IMAGING_WEIGHT as u64 / total as u64;
    base + band as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_cover_the_full_range() {
        assert_eq!(
            EXTRACTION_WEIGHT + GENERATION_WEIGHT + IMAGING_WEIGHT,
            COMPLETE
        );
    }

    #[test]
    fn generation_progress_is_monotonic() {
        let total = 23;
        let mut last = after_extraction();
        for completed in 0..=total {
            let p = during_generation(completed, total);
            assert!(p >= last, "progress went backwards at {completed}");
            last = p;
        }
        assert_eq!(last, EXTRACTION_WEIGHT + GENERATION_WEIGHT);
    }

    #[test]
    fn imaging_progress_spans_its_band() {
        assert_eq!(during_imaging(0, 4), 92);
        assert_eq!(during_imaging(2, 4), 96);
        assert_eq!(during_imaging(4, 4), COMPLETE);
    }

    #[test]
    fn phases_never_overlap() {
        // The last generation value equals the first imaging value.
        assert_eq!(during_generation(10, 10), during_imaging(0, 99));
        // Extraction checkpoint is below any generation value.
        assert!(after_extraction() <= during_generation(0, 10));
    }

    #[test]
    fn zero_totals_settle_their_phase() {
        assert_eq!(during_generation(0, 0), 92);
        assert_eq!(during_imaging(0, 0), COMPLETE);
    }
}
