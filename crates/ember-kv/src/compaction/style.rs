/// Which of the three compaction strategies a column family uses to decide when and what
/// to compact.
///
/// See [`crate::compaction::CompactionPicker`] for the triggering and selection rules of
/// each style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CompactionStyle {
    /// Classic per-level size- and file-count-triggered compaction. Non-zero levels are kept
    /// disjoint and geometrically sized.
    Leveled,
    /// Sorted runs of L0 files are merged by age, bounded by a size ratio and amplification
    /// budget, without necessarily promoting data to higher levels.
    Universal,
    /// No merging: the oldest files are dropped once the column family's total size or a
    /// file's age exceeds a configured bound.
    Fifo,
}

impl Default for CompactionStyle {
    #[inline]
    fn default() -> Self {
        Self::Leveled
    }
}
