//! Local Test Runner Port

use std::path::Path;

/// Runs the project's test suite on the operator machine.
pub trait LocalTestRunner {
    /// Exit status of the suite. `Err` only when it could not be started.
    fn run(&self, project_root: &Path) -> std::io::Result<i32>;
}

impl<F> LocalTestRunner for F
where
    F: Fn(&Path) -> std::io::Result<i32>,
{
    fn run(&self, project_root: &Path) -> std::io::Result<i32> {
        self(project_root)
    }
}
