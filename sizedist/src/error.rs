use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while persisting or restoring a `SizeDistribution`.
///
/// Adding observations and querying the distribution never fail, so this
/// only shows up on the wire paths.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not encode size distribution: {0}")]
    Encode(String),

    #[error("could not decode size distribution: {0}")]
    Decode(String),

    #[error("unsupported size distribution version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("total count {declared} does not match the sum of recorded counts {summed}")]
    CountMismatch { declared: u64, summed: u64 },

    #[error("recorded counts overflow at value {value}")]
    CountOverflow { value: i32 },

    #[error("value {value} was recorded with a zero count")]
    EmptyRecord { value: i32 },

    #[error("value {value} was recorded more than once")]
    DuplicateValue { value: i32 },
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
