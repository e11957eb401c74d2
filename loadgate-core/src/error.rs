use std::fmt;

/// Result type alias for loadgate core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for loadgate core operations
#[derive(Debug)]
pub enum Error {
    /// I/O errors from the input stream
    Io(std::io::Error),

    /// Structural errors in the result stream (malformed framing)
    Parse(String),

    /// Lifecycle contract violations (mutating a finished series, querying an
    /// unfinished one, querying statistics that have no samples)
    State(&'static str),

    /// Invalid argument passed to a query or check
    Argument(String),

    /// Configuration errors
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Parse(msg) => write!(f, "Parse error: {msg}"),
            Error::State(msg) => write!(f, "Invalid state: {msg}"),
            Error::Argument(msg) => write!(f, "Invalid argument: {msg}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
