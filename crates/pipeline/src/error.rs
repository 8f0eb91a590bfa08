//! Error types for the siting pipeline

use havvind_colormap::RenderError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the siting pipeline
#[derive(Error, Debug)]
pub enum SitingError {
    #[error(transparent)]
    Core(#[from] havvind_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot parse configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SitingError {
    /// Missing files, unreadable data and unknown layers
    pub fn is_data_access(&self) -> bool {
        matches!(
            self,
            SitingError::Core(havvind_core::Error::DataAccess { .. })
                | SitingError::Core(havvind_core::Error::LayerNotFound { .. })
                | SitingError::Core(havvind_core::Error::Io(_))
        )
    }

    /// Invalid settings and layers whose CRS cannot be reconciled
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SitingError::Config(_)
                | SitingError::ConfigParse { .. }
                | SitingError::Core(havvind_core::Error::CrsMismatch { .. })
                | SitingError::Core(havvind_core::Error::MissingCrs(_))
                | SitingError::Core(havvind_core::Error::UnsupportedCrs(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, SitingError>;
