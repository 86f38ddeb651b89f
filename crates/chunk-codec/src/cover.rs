use crate::key::ChunkRange;

/// One chunk selected by [`plan_read`], referenced by its position in the
/// caller's original slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    /// Leading lines of the chunk body to discard before streaming.
    pub skip_lines: u64,
}

/// An ordered set of chunks that, streamed in order (skipping each segment's
/// leading `skip_lines`), yields lines `offset + 1 ..= watermark` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    segments: Vec<Segment>,
}

impl ReadPlan {
    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}

/// The stored chunk set does not form a contiguous cover of
/// `[1..=watermark]`. Surfaced to operators as `corrupted_state`.
#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("no chunk covers line 1, earliest stored chunk starts at {first_stored}")]
    MissingHead { first_stored: u64 },
    #[error("gap in chunk cover: expected a chunk starting at {expected}, found {found}")]
    Gap { expected: u64, found: u64 },
    #[error("chunk {range} partially overlaps the cover ending at {covered}")]
    Overlap { covered: u64, range: ChunkRange },
    #[error("chunk cover ends at {covered}, watermark is {watermark}")]
    TailShort { covered: u64, watermark: u64 },
    #[error("chunk {range} extends past the watermark {watermark}")]
    TailOverrun { watermark: u64, range: ChunkRange },
}

/// Validates that `ranges` contiguously cover `[1..=watermark]` and selects
/// the chunks needed to stream lines starting at `line_offset + 1`.
///
/// A chunk whose range is already fully covered is a superseded leftover (an
/// object written durably whose watermark update was lost, then re-sent with
/// a wider range) and is skipped. Chunks starting past the watermark are
/// in-flight uploads and ignored. Any other irregularity is an error: the
/// watermark row is authoritative and a listing that cannot reproduce it is
/// corruption, never silently truncated.
pub fn plan_read(
    ranges: &[ChunkRange],
    watermark: u64,
    line_offset: u64,
) -> Result<ReadPlan, CoverError> {
    let mut order: Vec<usize> = (0..ranges.len()).collect();
    order.sort_by_key(|&i| (ranges[i].first(), std::cmp::Reverse(ranges[i].last())));

    let mut segments = Vec::new();
    let mut covered = 0_u64;

    for index in order {
        if covered >= watermark {
            break;
        }

        let range = ranges[index];

        if range.last() <= covered {
            // superseded by a wider chunk that sorted ahead of it
            continue;
        }

        if range.first() > covered + 1 {
            if covered == 0 {
                return Err(CoverError::MissingHead {
                    first_stored: range.first(),
                });
            }
            return Err(CoverError::Gap {
                expected: covered + 1,
                found: range.first(),
            });
        }

        if range.first() <= covered {
            return Err(CoverError::Overlap { covered, range });
        }

        if range.last() > watermark {
            return Err(CoverError::TailOverrun { watermark, range });
        }

        covered = range.last();

        if range.last() <= line_offset {
            continue;
        }

        segments.push(Segment {
            index,
            skip_lines: line_offset.saturating_sub(range.first() - 1),
        });
    }

    if covered < watermark {
        return Err(CoverError::TailShort { covered, watermark });
    }

    Ok(ReadPlan { segments })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(first: u64, last: u64) -> ChunkRange {
        ChunkRange::new(first, last).unwrap()
    }

    #[test]
    fn contiguous_cover_from_line_one() {
        let ranges = [range(1, 3), range(4, 4), range(5, 9)];
        let plan = plan_read(&ranges, 9, 0).unwrap();

        let picked: Vec<_> = plan.segments().iter().map(|s| (s.index, s.skip_lines)).collect();
        assert_eq!(picked, vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn empty_file_is_an_empty_plan() {
        assert!(plan_read(&[], 0, 0).unwrap().is_empty());
    }

    #[test]
    fn offset_drops_whole_chunks_and_skips_within_the_next() {
        let ranges = [range(1, 3), range(4, 6), range(7, 9)];
        let plan = plan_read(&ranges, 9, 4).unwrap();

        let picked: Vec<_> = plan.segments().iter().map(|s| (s.index, s.skip_lines)).collect();
        // output starts at line 5: chunk [4..6] skipping one line, then [7..9]
        assert_eq!(picked, vec![(1, 1), (2, 0)]);
    }

    #[test]
    fn offset_at_or_past_watermark_is_empty() {
        let ranges = [range(1, 3)];
        assert!(plan_read(&ranges, 3, 3).unwrap().is_empty());
        assert!(plan_read(&ranges, 3, 10).unwrap().is_empty());
    }

    #[test]
    fn superseded_leftover_is_skipped() {
        // crash left [4..6]; the re-send persisted [4..8] and the watermark
        let ranges = [range(1, 3), range(4, 6), range(4, 8)];
        let plan = plan_read(&ranges, 8, 0).unwrap();

        let picked: Vec<_> = plan.segments().iter().map(|s| s.index).collect();
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn orphan_past_the_watermark_is_ignored() {
        // object landed, watermark update lost: readers still see [1..3]
        let ranges = [range(1, 3), range(4, 6)];
        let plan = plan_read(&ranges, 3, 0).unwrap();

        let picked: Vec<_> = plan.segments().iter().map(|s| s.index).collect();
        assert_eq!(picked, vec![0]);
    }

    #[test]
    fn missing_head_is_an_error() {
        let err = plan_read(&[range(2, 5)], 5, 0).unwrap_err();
        assert!(matches!(err, CoverError::MissingHead { first_stored: 2 }));
    }

    #[test]
    fn gap_is_an_error() {
        let err = plan_read(&[range(1, 3), range(5, 6)], 6, 0).unwrap_err();
        assert!(matches!(err, CoverError::Gap { expected: 4, found: 5 }));
    }

    #[test]
    fn partial_overlap_is_an_error() {
        let err = plan_read(&[range(1, 5), range(3, 9)], 9, 0).unwrap_err();
        assert!(matches!(err, CoverError::Overlap { covered: 5, .. }));
    }

    #[test]
    fn short_tail_is_an_error() {
        let err = plan_read(&[range(1, 3)], 5, 0).unwrap_err();
        assert!(matches!(err, CoverError::TailShort { covered: 3, watermark: 5 }));
    }

    #[test]
    fn chunk_past_watermark_with_unreached_cover_is_an_error() {
        let err = plan_read(&[range(1, 6)], 4, 0).unwrap_err();
        assert!(matches!(err, CoverError::TailOverrun { watermark: 4, .. }));
    }

    #[test]
    fn no_chunks_under_a_positive_watermark_is_an_error() {
        let err = plan_read(&[], 3, 0).unwrap_err();
        assert!(matches!(err, CoverError::TailShort { covered: 0, watermark: 3 }));
    }
}
