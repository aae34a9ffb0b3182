use std::path::PathBuf;

use thiserror::Error;

use crate::mesh::TriangulationError;

/// Result type alias for the conversion pipeline.
pub type Result<T> = core::result::Result<T, Error>;

/// Boxed cause carried by [`Error::MalformedInput`].
pub type Cause = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Terminal failures of the load, build and write stages.
///
/// None of these are retried. Rows with missing values are not an error,
/// they are dropped by the loader with a warning.
#[derive(Debug, Error)]
pub enum Error {
    /// The input path could not be opened as a readable file.
    #[error("file not found at path {}", path.display())]
    InputNotFound {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The input could not be read as a table of numbers.
    #[error("error reading CSV file: {detail}")]
    MalformedInput {
        /// What went wrong, and where.
        detail: String,
        /// Cause reported by the CSV reader or number parser, if any.
        #[source]
        source: Option<Cause>,
    },

    /// The header names fewer than the three x, y, z columns.
    #[error("CSV file must have at least 3 columns (x, y, z), found {found}")]
    InsufficientColumns {
        /// Number of columns in the header.
        found: usize,
    },

    /// The planar triangulation could not be produced.
    #[error("error during Delaunay triangulation")]
    TriangulationFailed(#[from] TriangulationError),

    /// The output file could not be created or written.
    #[error("error writing STL file {}", path.display())]
    OutputWriteFailed {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a malformed input error without an underlying cause.
    #[must_use]
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            detail: detail.into(),
            source: None,
        }
    }

    /// Create a malformed input error wrapping `source`.
    #[must_use]
    pub fn malformed_by(
        detail: impl Into<String>,
        source: impl core::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::MalformedInput {
            detail: detail.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an output error for `path`.
    #[must_use]
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWriteFailed {
            path: path.into(),
            source,
        }
    }
}
