//! Domain Services
//!
//! Stateless logic over domain entities. No I/O.

mod delta;
mod large_file_guard;

pub use delta::{compute_delta, is_bootstrap};
pub use large_file_guard::{
    LargeFile, LargeFileGuard, LargeFileReport, DEFAULT_LARGE_FILE_THRESHOLD,
};
