use std::path::PathBuf;

/// Errors raised at the library boundary.
///
/// Data anomalies found while consolidating (duplicate pairs, 1 vs n
/// conflicts, rays above the horizon, ...) are logged and counted in the
/// report, never returned here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("no image files found under {0}")]
    NoImages(PathBuf),
    #[error("camera intrinsic matrix is not invertible")]
    SingularIntrinsics,
    #[error("invalid elevation grid: {0}")]
    InvalidGrid(String),
    #[error(
        "checkpoint {path} belongs to a different input \
         (expected {expected_tracks} tracks / {expected_observations} observations / \
         digest {expected_digest:016x}, found {found_tracks} / {found_observations} / \
         {found_digest:016x})"
    )]
    CheckpointMismatch {
        path: PathBuf,
        expected_tracks: usize,
        expected_observations: usize,
        found_tracks: usize,
        found_observations: usize,
        expected_digest: u64,
        found_digest: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Error {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}
