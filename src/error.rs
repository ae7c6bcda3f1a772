use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the boundary loaders (workbooks and post exports).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV decode error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("workbook {} has no sheets", path.display())]
    EmptyWorkbook { path: PathBuf },
}
