//! Declared requirements readers

mod pyproject;

pub use pyproject::{
    parse_pyproject, parse_requirement, PyprojectRequirements, Requirement, PYPROJECT_FILE,
};
