//! Git integration
//!
//! - `gateway.rs` - VCS command boundary and derived queries
//! - `stager.rs` - per-cycle change staging with failure classification

mod gateway;
mod stager;

pub use gateway::{
    is_repository, repository_root, ChangeStatus, ChangedPath, GitError, GitGateway,
    ProcessRunner, VcsRunner,
};
pub use stager::{
    ChangeStager, SkipReason, SkippableFailure, StageOutcome, StagePolicy, StagingError,
};
