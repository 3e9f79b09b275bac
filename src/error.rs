// src/error.rs

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CifMovieError>;

#[derive(Debug, Error)]
pub enum CifMovieError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render error: {0}")]
    Render(#[from] cairo::Error),

    #[error("failed to write image: {0}")]
    Png(#[from] cairo::IoError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CifMovieError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Prefixes a malformed-input message with the file it came from.
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            Self::MalformedInput(msg) => {
                Self::MalformedInput(format!("'{}': {}", path.display(), msg))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(CifMovieError::not_found("x").to_string().starts_with("not found:"));
        assert!(CifMovieError::malformed("x")
            .to_string()
            .starts_with("malformed input:"));
        assert!(CifMovieError::encoding("x")
            .to_string()
            .starts_with("encoding error:"));
        assert!(CifMovieError::config("x")
            .to_string()
            .starts_with("configuration error:"));
    }

    #[test]
    fn in_file_only_touches_malformed_input() {
        let path = Path::new("frames/a.cif");
        let err = CifMovieError::malformed("no atoms").in_file(path);
        assert_eq!(err.to_string(), "malformed input: 'frames/a.cif': no atoms");

        let err = CifMovieError::not_found("nothing").in_file(path);
        assert_eq!(err.to_string(), "not found: nothing");
    }

    #[test]
    fn io_error_names_the_path() {
        let err = CifMovieError::io("out/img_000.png", std::io::Error::other("disk full"));
        let text = err.to_string();
        assert!(text.contains("out/img_000.png"));
        assert!(text.contains("disk full"));
    }
}
