//! Report generation port trait.

use std::path::{Path, PathBuf};

use crate::domain::basket::BasketReport;
use crate::domain::error::BackfolioError;

/// Port for writing basket reports.
pub trait ReportPort {
    /// Write every window of `report` under `output_dir` and return the
    /// directory that now holds it.
    fn write(&self, report: &BasketReport, output_dir: &Path) -> Result<PathBuf, BackfolioError>;
}
