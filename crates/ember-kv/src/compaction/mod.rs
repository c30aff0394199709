mod compaction_pointer;
mod picker;
mod style;


pub(crate) use self::{
    compaction_pointer::{CompactionPointer, OptionalCompactionPointer},
    picker::{Compaction, CompactionPicker, LevelSummary, PickedInputs},
    style::CompactionStyle,
};
