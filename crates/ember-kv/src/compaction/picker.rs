//! Compaction triggering and input selection.
//!
//! The three styles share one shape: given a cheap per-level summary of the current
//! [`crate::version::Version`] (file counts, byte totals, oldest-file age), decide whether a
//! compaction is warranted and, if so, which files participate. Actually opening and
//! merge-iterating the chosen files is [`crate::compaction`]'s caller's job (the flush/compaction
//! job), kept separate so the picking logic can be exercised without a real `Version`.
//!
//! This mirrors `Version::compute_size_compaction`'s scoring for the leveled style (see
//! `version/version_struct.rs`), re-expressed as a pure function over summaries so that
//! [`Compaction::Universal`] and [`Compaction::Fifo`] can be decided by the same interface.

use std::time::Duration;

use crate::config_constants::{
    L0_COMPACTION_TRIGGER, MAX_BYTES_FOR_L1, MAX_BYTES_MULTIPLIER, NUM_LEVELS_USIZE,
};
use crate::file_tracking::Level;
use crate::format::FileNumber;
use super::style::CompactionStyle;


/// A cheap, per-level summary of a [`crate::version::Version`], used to decide whether and what
/// to compact without needing access to the files themselves.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LevelSummary {
    pub file_count:  usize,
    pub total_bytes: u64,
}

/// A file in L0, described just enough for universal/FIFO picking: its identity, size, and age.
///
/// `file_number` doubles as a recency order: table files are numbered in strictly increasing
/// order as they're created, so sorting by `file_number` sorts oldest-to-newest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileAge {
    pub file_number: FileNumber,
    pub size:        u64,
    pub age:         Duration,
}

/// Inputs chosen by a [`CompactionPicker::pick`] call.
#[derive(Debug, Clone)]
pub(crate) enum PickedInputs {
    /// Leveled: one file at `input_level` (the oldest not already under compaction, per the
    /// level's compaction pointer) plus every overlapping file at `input_level`'s next level.
    /// The caller resolves the actual file list; the picker only identifies the levels.
    Leveled {
        input_level:  Level,
        output_level: Level,
    },
    /// Universal: a contiguous, oldest-first run of L0 files (by index into the age-sorted
    /// slice given to `pick`), merged down to a single output run.
    Universal {
        start:        usize,
        end_exclusive: usize,
        output_level: Level,
        trivial_move: bool,
    },
    /// FIFO: a "deletion compaction" -- the named files are dropped outright, unmerged.
    Fifo {
        file_numbers: Vec<FileNumber>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Compaction {
    pub style:  CompactionStyle,
    pub inputs: PickedInputs,
}

/// Tunables for the universal-compaction trigger and selection rules (§4.9).
#[derive(Debug, Clone, Copy)]
pub(crate) struct UniversalOptions {
    /// An L0 file count at or above this triggers a check, independent of size ratios.
    pub level0_file_num_compaction_trigger: usize,
    /// A run is eligible to merge into its predecessor if its size is at most this percent
    /// of the predecessor's size (the "size ratio" bound).
    pub size_ratio_percent:                 u32,
    /// Minimum number of consecutive runs a merge must include.
    pub min_merge_width:                     usize,
    /// Maximum number of consecutive runs a merge may include.
    pub max_merge_width:                     usize,
    /// If `total_size / newest_file_size * 100` exceeds this, a full merge is forced regardless
    /// of size ratios (bounds space amplification).
    pub max_size_amplification_percent:      u32,
    pub allow_trivial_move:                  bool,
}

impl Default for UniversalOptions {
    fn default() -> Self {
        Self {
            level0_file_num_compaction_trigger: usize::from(L0_COMPACTION_TRIGGER),
            size_ratio_percent:                  1,
            min_merge_width:                     2,
            max_merge_width:                     usize::MAX,
            max_size_amplification_percent:      200,
            allow_trivial_move:                  true,
        }
    }
}

/// Tunables for the FIFO-compaction trigger (§4.9).
#[derive(Debug, Clone, Copy)]
pub(crate) struct FifoOptions {
    pub max_table_files_size: u64,
    pub ttl:                  Option<Duration>,
}

pub(crate) struct CompactionPicker {
    style:     CompactionStyle,
    universal: UniversalOptions,
    fifo:      FifoOptions,
}

impl CompactionPicker {
    #[must_use]
    pub fn new(style: CompactionStyle, universal: UniversalOptions, fifo: FifoOptions) -> Self {
        Self { style, universal, fifo }
    }

    #[must_use]
    pub const fn style(&self) -> CompactionStyle {
        self.style
    }

    /// Cheap check of whether `pick` would currently return `Some`. Separated from `pick` so a
    /// background worker can poll without paying for file-list bookkeeping on every iteration.
    #[must_use]
    pub fn needs_compaction(
        &self,
        levels:    &[LevelSummary; NUM_LEVELS_USIZE],
        l0_by_age: &[FileAge],
    ) -> bool {
        match self.style {
            CompactionStyle::Leveled   => leveled_score(levels).is_some(),
            CompactionStyle::Universal => universal_trigger(&self.universal, l0_by_age).is_some(),
            CompactionStyle::Fifo      => fifo_trigger(&self.fifo, l0_by_age).is_some(),
        }
    }

    /// Decide whether and what to compact. `l0_by_age` must be sorted oldest-first (ascending
    /// `file_number`); this is true of any correctly-maintained `Version`.
    #[must_use]
    pub fn pick(
        &self,
        levels:    &[LevelSummary; NUM_LEVELS_USIZE],
        l0_by_age: &[FileAge],
    ) -> Option<Compaction> {
        match self.style {
            CompactionStyle::Leveled => {
                let (level, _score) = leveled_score(levels)?;
                let output_level = if level == Level::ZERO {
                    level.next_level().unwrap_or(Level::ZERO)
                } else {
                    level.next_level().unwrap_or(level)
                };
                Some(Compaction {
                    style:  self.style,
                    inputs: PickedInputs::Leveled { input_level: level, output_level },
                })
            }
            CompactionStyle::Universal => {
                let (start, end_exclusive) = universal_trigger(&self.universal, l0_by_age)?;
                let trivial_move = self.universal.allow_trivial_move
                    && end_exclusive - start == 1;
                Some(Compaction {
                    style:  self.style,
                    inputs: PickedInputs::Universal {
                        start,
                        end_exclusive,
                        output_level: Level::ZERO,
                        trivial_move,
                    },
                })
            }
            CompactionStyle::Fifo => {
                let file_numbers = fifo_trigger(&self.fifo, l0_by_age)?;
                Some(Compaction {
                    style:  self.style,
                    inputs: PickedInputs::Fifo { file_numbers },
                })
            }
        }
    }
}

/// Re-expression of `Version::compute_size_compaction`'s score as a pure function: level 0 is
/// scored by file count against `L0_COMPACTION_TRIGGER`; levels 1+ are scored by total byte size
/// against a geometrically-growing budget. The highest-scoring level over 1.0 is returned, if any.
#[must_use]
fn leveled_score(levels: &[LevelSummary; NUM_LEVELS_USIZE]) -> Option<(Level, f64)> {
    #![expect(
        clippy::as_conversions, clippy::cast_precision_loss, clippy::float_arithmetic,
        reason = "precision is not critical for a heuristic, mirrors Version::compute_size_compaction",
    )]

    let mut best: Option<(Level, f64)> = None;
    let l0 = levels[0];
    let l0_score = (l0.file_count as f64) / f64::from(L0_COMPACTION_TRIGGER);
    if l0_score > 1.0 {
        best = Some((Level::ZERO, l0_score));
    }

    let mut max_bytes_for_level = MAX_BYTES_FOR_L1;
    for level in Level::nonzero_levels() {
        #[expect(clippy::indexing_slicing, reason = "`level.inner() < NUM_LEVELS_USIZE`")]
        let summary = levels[usize::from(level.inner())];
        let score = (summary.total_bytes as f64) / max_bytes_for_level;

        if score > 1.0 && best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((level, score));
        }

        max_bytes_for_level *= MAX_BYTES_MULTIPLIER;
    }

    best
}

/// Returns the half-open `[start, end)` range (indices into `l0_by_age`) of the oldest eligible
/// run to merge, or `None` if no merge is currently warranted.
fn universal_trigger(opts: &UniversalOptions, l0_by_age: &[FileAge]) -> Option<(usize, usize)> {
    if l0_by_age.len() < opts.level0_file_num_compaction_trigger.max(opts.min_merge_width) {
        return None;
    }

    let total_size: u64 = l0_by_age.iter().map(|f| f.size).sum();
    #[expect(clippy::indexing_slicing, reason = "just checked l0_by_age is nonempty above")]
    let newest_size = l0_by_age[l0_by_age.len() - 1].size.max(1);
    #[expect(clippy::as_conversions, clippy::cast_precision_loss, clippy::float_arithmetic)]
    let amplification_percent = ((total_size - newest_size) as f64 / newest_size as f64) * 100.0;

    #[expect(clippy::as_conversions, clippy::cast_precision_loss)]
    if amplification_percent >= f64::from(opts.max_size_amplification_percent) {
        // Space amplification is too high: merge everything.
        return Some((0, l0_by_age.len()));
    }

    // Otherwise, look for the widest oldest-first run whose running total stays within the
    // configured size-ratio bound of the file immediately following the run.
    let mut end = opts.min_merge_width.min(l0_by_age.len());
    let mut running_total: u64 = l0_by_age[..end].iter().map(|f| f.size).sum();

    while end < l0_by_age.len() && end < opts.max_merge_width {
        #[expect(clippy::indexing_slicing, reason = "`end < l0_by_age.len()` was just checked")]
        let next = l0_by_age[end];
        #[expect(clippy::as_conversions, clippy::cast_precision_loss, clippy::float_arithmetic)]
        let ratio_percent = (next.size as f64 / running_total.max(1) as f64) * 100.0;

        if ratio_percent > f64::from(100 + opts.size_ratio_percent) {
            break;
        }

        running_total += next.size;
        end += 1;
    }

    if end >= opts.min_merge_width.max(1) && end > 0 {
        Some((0, end))
    } else {
        None
    }
}

/// Returns the file numbers to delete outright, oldest-first, or `None` if neither the size cap
/// nor the TTL bound is currently exceeded.
fn fifo_trigger(opts: &FifoOptions, l0_by_age: &[FileAge]) -> Option<Vec<FileNumber>> {
    let total_size: u64 = l0_by_age.iter().map(|f| f.size).sum();
    let mut to_delete = Vec::new();

    if let Some(ttl) = opts.ttl {
        for file in l0_by_age {
            if file.age >= ttl {
                to_delete.push(file.file_number);
            } else {
                break;
            }
        }
    }

    if total_size > opts.max_table_files_size {
        let mut remaining = total_size;
        for file in l0_by_age {
            if remaining <= opts.max_table_files_size {
                break;
            }
            if !to_delete.contains(&file.file_number) {
                to_delete.push(file.file_number);
            }
            remaining = remaining.saturating_sub(file.size);
        }
    }

    (!to_delete.is_empty()).then_some(to_delete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_levels() -> [LevelSummary; NUM_LEVELS_USIZE] {
        [LevelSummary::default(); NUM_LEVELS_USIZE]
    }

    #[test]
    fn leveled_triggers_on_l0_file_count() {
        let mut levels = empty_levels();
        levels[0].file_count = usize::from(L0_COMPACTION_TRIGGER);

        let picker = CompactionPicker::new(
            CompactionStyle::Leveled, UniversalOptions::default(), FifoOptions {
                max_table_files_size: u64::MAX, ttl: None,
            },
        );
        assert!(picker.needs_compaction(&levels, &[]));
        let compaction = picker.pick(&levels, &[]).expect("should pick");
        match compaction.inputs {
            PickedInputs::Leveled { input_level, output_level } => {
                assert_eq!(input_level, Level::ZERO);
                assert_eq!(output_level, Level::try_from(1_u8).unwrap());
            }
            _ => panic!("expected a leveled compaction"),
        }
    }

    #[test]
    fn leveled_does_not_trigger_when_under_thresholds() {
        let levels = empty_levels();
        let picker = CompactionPicker::new(
            CompactionStyle::Leveled, UniversalOptions::default(), FifoOptions {
                max_table_files_size: u64::MAX, ttl: None,
            },
        );
        assert!(!picker.needs_compaction(&levels, &[]));
        assert!(picker.pick(&levels, &[]).is_none());
    }

    #[test]
    fn universal_merges_everything_under_high_amplification() {
        let files: Vec<FileAge> = (0..5).map(|n| FileAge {
            file_number: FileNumber(n),
            size:        1000,
            age:         Duration::from_secs(0),
        }).collect();
        // newest file is tiny, so (total - newest)/newest blows past the amplification bound
        let mut files = files;
        files.push(FileAge { file_number: FileNumber(5), size: 1, age: Duration::ZERO });

        let picker = CompactionPicker::new(
            CompactionStyle::Universal, UniversalOptions::default(), FifoOptions {
                max_table_files_size: u64::MAX, ttl: None,
            },
        );
        let levels = empty_levels();
        let compaction = picker.pick(&levels, &files).expect("should pick");
        match compaction.inputs {
            PickedInputs::Universal { start, end_exclusive, .. } => {
                assert_eq!(start, 0);
                assert_eq!(end_exclusive, files.len());
            }
            _ => panic!("expected a universal compaction"),
        }
    }

    #[test]
    fn fifo_drops_oldest_files_past_size_cap() {
        let files: Vec<FileAge> = (0..4).map(|n| FileAge {
            file_number: FileNumber(n),
            size:        100,
            age:         Duration::from_secs(0),
        }).collect();

        let picker = CompactionPicker::new(
            CompactionStyle::Fifo, UniversalOptions::default(), FifoOptions {
                max_table_files_size: 250, ttl: None,
            },
        );
        let levels = empty_levels();
        let compaction = picker.pick(&levels, &files).expect("should pick");
        match compaction.inputs {
            PickedInputs::Fifo { file_numbers } => {
                // total is 400; dropping the two oldest (200 bytes) brings it to 200 <= 250.
                assert_eq!(file_numbers, vec![FileNumber(0), FileNumber(1)]);
            }
            _ => panic!("expected a fifo compaction"),
        }
    }

    #[test]
    fn fifo_drops_expired_files_by_ttl() {
        let files = vec![
            FileAge { file_number: FileNumber(0), size: 10, age: Duration::from_secs(1000) },
            FileAge { file_number: FileNumber(1), size: 10, age: Duration::from_secs(10) },
        ];
        let picker = CompactionPicker::new(
            CompactionStyle::Fifo, UniversalOptions::default(), FifoOptions {
                max_table_files_size: u64::MAX, ttl: Some(Duration::from_secs(500)),
            },
        );
        let levels = empty_levels();
        let compaction = picker.pick(&levels, &files).expect("should pick");
        match compaction.inputs {
            PickedInputs::Fifo { file_numbers } => assert_eq!(file_numbers, vec![FileNumber(0)]),
            _ => panic!("expected a fifo compaction"),
        }
    }
}
