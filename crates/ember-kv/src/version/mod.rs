mod edit;
mod version_struct;
mod version_builder;
mod version_tracking;
mod set;
mod set_builder;

mod file_iter;
mod level_iter;


pub(crate) use self::{
    edit::VersionEdit,
    level_iter::DisjointLevelIter,
    set_builder::VersionSetBuilder,
};
pub(crate) use self::{
    set::{InstallToken, LogToken, ManifestLogError, VersionSet},
    version_struct::{RefcountedVersion, Version},
    version_tracking::{CurrentVersion, NeedsSeekCompaction, OldVersions},
};
