//! Requirements Source Port

use std::path::Path;

use crate::domain::entities::DeclaredRequirements;
use crate::error::RequirementsError;

/// Reads the packages a project declares it needs on the controller.
pub trait RequirementsSource {
    fn load(&self, project_root: &Path) -> Result<DeclaredRequirements, RequirementsError>;
}
