//=====================================================
// File: errors.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Error taxonomy for require/load resolution
// Objective: Separate "nothing found" from real I/O malfunctions and loader
//            failures, and keep the clean exit signal distinct from both
//=====================================================

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of `require`/`load`.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Every search strategy was exhausted. `name` is the name the caller
    /// asked for, never the internal search base.
    #[error("no such file to load -- {name}")]
    NotFound { name: String },
    /// The loader raised while executing the resolved unit.
    #[error("load error: {name} -- {source}")]
    LoadFailed {
        name: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// Filesystem failure other than plain absence.
    #[error("failed reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    /// The archive exists but could not be opened as an archive.
    #[error("failed opening archive '{}': {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("native extensions are disabled, can't load `{name}'")]
    NativeExtensionDisabled { name: String },
    /// Clean process exit requested by the loaded code. Never wrapped.
    #[error("exit requested with status {status}")]
    Exit { status: i32 },
}

impl LoadError {
    pub fn not_found(name: impl Into<String>) -> Self {
        LoadError::NotFound { name: name.into() }
    }

    pub(crate) fn io(path: impl fmt::Display, source: io::Error) -> Self {
        LoadError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }

    /// Name the error reports, when it reports one.
    pub fn name(&self) -> Option<&str> {
        match self {
            LoadError::NotFound { name }
            | LoadError::LoadFailed { name, .. }
            | LoadError::NativeExtensionDisabled { name } => Some(name),
            _ => None,
        }
    }
}

/// Errors a [`crate::Loader`] hands back to the service.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("exit requested with status {status}")]
    Exit { status: i32 },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Failed(#[from] Box<dyn StdError + Send + Sync>),
}

impl LoaderError {
    pub fn failed(message: impl fmt::Display) -> Self {
        LoaderError::Failed(message.to_string().into())
    }
}

/// Nested requires inside a loader keep the exit signal unwrapped.
impl From<LoadError> for LoaderError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Exit { status } => LoaderError::Exit { status },
            other => LoaderError::Failed(Box::new(other)),
        }
    }
}

/// Errors raised while reading a [`crate::LoadServiceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading configuration '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed parsing configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_reports_requested_name() {
        let err = LoadError::not_found("does_not_exist_anywhere");
        assert_eq!(
            err.to_string(),
            "no such file to load -- does_not_exist_anywhere"
        );
        assert_eq!(err.name(), Some("does_not_exist_anywhere"));
        assert!(err.is_not_found());
    }

    #[test]
    fn load_failed_keeps_cause() {
        let cause: Box<dyn StdError + Send + Sync> = "boom".into();
        let err = LoadError::LoadFailed {
            name: "greet".into(),
            source: cause,
        };
        assert!(err.to_string().contains("greet"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".into()));
    }

    #[test]
    fn nested_exit_stays_an_exit() {
        assert!(matches!(
            LoaderError::from(LoadError::Exit { status: 3 }),
            LoaderError::Exit { status: 3 }
        ));
        assert!(matches!(
            LoaderError::from(LoadError::not_found("x")),
            LoaderError::Failed(_)
        ));
    }
}

//=====================================================
// End of file
//=====================================================
