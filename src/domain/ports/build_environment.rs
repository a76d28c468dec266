//! Build Environment Port
//!
//! Where build provenance comes from: the local machine, the clock and the
//! version-control working copy.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::domain::entities::VcsInfo;

pub trait BuildEnvironment {
    fn hostname(&self) -> String;

    fn username(&self) -> String;

    /// Local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// VCS state of `root`, or `None` when it is not inside a working copy
    /// or the VCS tool is unavailable.
    fn vcs_info(&self, root: &Path) -> Option<VcsInfo>;
}
