//! Capture logs.
//!
//! A [`Log`] is the ordered, in-memory record a wrapped driver accumulates.
//! A [`LogFile`] persists one to disk so a log can outlive the process.

mod capture;
mod file;

pub use capture::Log;
pub use file::LogFile;
