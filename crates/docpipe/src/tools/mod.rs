//! External executables.
//!
//! Only password protection leaves the process: it hands the document to
//! `qpdf`. [`locator`] finds the executable, [`runner`] runs it under a
//! timeout.

pub mod locator;
pub mod runner;

pub use locator::{SystemProbe, ToolProbe, default_candidates, locate};
pub use runner::{ToolOutput, run_tool};

/// Name of the encryption tool.
pub const QPDF: &str = "qpdf";
