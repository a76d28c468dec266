//! Local test suite runner

mod command;

pub use command::{CommandTestRunner, DEFAULT_TEST_COMMAND};
