//! Project Stager Port

use std::path::Path;

use crate::domain::entities::ProjectSnapshot;
use crate::error::StagingError;

/// Produces a filtered, frozen snapshot of a project tree.
pub trait ProjectStager {
    fn stage(&self, project_root: &Path) -> Result<ProjectSnapshot, StagingError>;
}
