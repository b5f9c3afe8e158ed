use thiserror::Error;

/// A defect in the fixed reference data or in the scanner configuration.
/// Raised at construction time, never while scanning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Reference palette is empty")]
    EmptyPalette,

    #[error("Reference palette has {0} entries, expected one per color (6)")]
    WrongEntryCount(usize),

    #[error("Reference palette has no entry for {0}")]
    MissingColor(&'static str),

    #[error("Reference palette label '{0}' is used by more than one color")]
    DuplicateLabel(char),

    #[error("Reference palette labels {color} as '{label}', the solver alphabet needs '{expected}'")]
    UnsupportedLabel {
        color: &'static str,
        label: char,
        expected: char,
    },

    #[error("Reference palette vector for {0} has a non-finite component")]
    NonFiniteVector(&'static str),

    #[error("Smoothing alpha must be in (0, 1], got {0}")]
    InvalidAlpha(f64),

    #[error("Grid coverage must be in (0, 1], got {0}")]
    InvalidCoverage(f64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Cube string has {actual} characters, expected {expected}")]
    UnexpectedLength { expected: usize, actual: usize },
}

/// Refusals of the scan session and the solve hand-off.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("All six faces are already committed")]
    SessionComplete,

    #[error("Only {committed} of 6 faces are committed")]
    Incomplete { committed: usize },

    #[error("A solve is already in flight")]
    SolveInFlight,

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Solver task failed: {0}")]
    SolverTask(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
