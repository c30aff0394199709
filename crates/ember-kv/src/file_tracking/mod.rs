mod file_metadata;
mod level;
mod sorted_files;


pub(crate) use self::{
    file_metadata::{
        FileMetadata, MaybeSeekCompaction, RefcountedFileMetadata,
        SeeksBetweenCompactionOptions, SeeksRemaining,
    },
    level::{IndexLevel, Level},
    sorted_files::{
        file_is_before_lower_bound, OwnedSortedFiles, SortedFiles, upper_bound_is_before_file,
    },
};
