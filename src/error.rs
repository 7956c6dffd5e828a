use std::fmt::{Display, Formatter};
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// A sketch was sized with zero buckets
    ZeroBuckets,
    /// Flow key too short to decode a flow id
    InvalidKey { len: usize },
    /// Any other rejected configuration value
    InvalidConfig(String),
    Io(io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ZeroBuckets => write!(f, "bucket count must be positive"),
            Error::InvalidKey { len } => {
                write!(f, "invalid flow key: {} bytes, need at least 4", len)
            }
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Error::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::ZeroBuckets.to_string(), "bucket count must be positive");
        assert_eq!(
            Error::InvalidKey { len: 0 }.to_string(),
            "invalid flow key: 0 bytes, need at least 4"
        );
    }

    #[test]
    fn io_error_converts_and_keeps_source() {
        use std::error::Error as _;
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.source().is_some());
    }
}
