//! # savepoint-core
//!
//! Core runtime for Savepoint: the version-control gateway (a thin command
//! boundary over git) and the change stager that turns working-tree state
//! into a staged set for one commit cycle.

pub mod git;

pub use git::{
    is_repository, repository_root, ChangeStager, ChangeStatus, ChangedPath, GitError, GitGateway,
    ProcessRunner, SkipReason, SkippableFailure, StageOutcome, StagePolicy, StagingError,
    VcsRunner,
};
