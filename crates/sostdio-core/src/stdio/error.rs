//! Stream error kinds.

use crate::errno;

/// Failure reported by a stream operation.
///
/// `EndOfStream` is a terminal condition rather than a fault; it is
/// latched separately from the error indicator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StdioError {
    #[error("invalid mode string: {0:?}")]
    InvalidMode(String),
    #[error("open failed (errno {errno})")]
    OpenFailed { errno: i32 },
    #[error("out of memory allocating stream buffer")]
    OutOfMemory,
    #[error("transfer failed (errno {errno})")]
    TransferFailed { errno: i32 },
    #[error("end of stream")]
    EndOfStream,
    #[error("seek failed (errno {errno})")]
    SeekFailed { errno: i32 },
    #[error("position query failed (errno {errno})")]
    PositionQueryFailed { errno: i32 },
    #[error("close failed (errno {errno})")]
    CloseFailed { errno: i32 },
}

impl StdioError {
    /// The POSIX errno a C caller should observe for this failure.
    ///
    /// `EndOfStream` maps to 0: reaching the end sets no errno.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidMode(_) => errno::EINVAL,
            Self::OutOfMemory => errno::ENOMEM,
            Self::EndOfStream => 0,
            Self::OpenFailed { errno }
            | Self::TransferFailed { errno }
            | Self::SeekFailed { errno }
            | Self::PositionQueryFailed { errno }
            | Self::CloseFailed { errno } => *errno,
        }
    }

    /// Short stable name of the error kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::InvalidMode(_) => "InvalidMode",
            Self::OpenFailed { .. } => "OpenFailed",
            Self::OutOfMemory => "OutOfMemory",
            Self::TransferFailed { .. } => "TransferFailed",
            Self::EndOfStream => "EndOfStream",
            Self::SeekFailed { .. } => "SeekFailed",
            Self::PositionQueryFailed { .. } => "PositionQueryFailed",
            Self::CloseFailed { .. } => "CloseFailed",
        }
    }
}

impl From<StdioError> for std::io::Error {
    fn from(err: StdioError) -> Self {
        match err {
            StdioError::EndOfStream => std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            StdioError::InvalidMode(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
            }
            StdioError::OutOfMemory => std::io::Error::from(std::io::ErrorKind::OutOfMemory),
            other => std::io::Error::from_raw_os_error(other.errno()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(StdioError::InvalidMode("q".into()).errno(), errno::EINVAL);
        assert_eq!(StdioError::OutOfMemory.errno(), errno::ENOMEM);
        assert_eq!(StdioError::EndOfStream.errno(), 0);
        assert_eq!(StdioError::TransferFailed { errno: 5 }.errno(), 5);
        assert_eq!(StdioError::SeekFailed { errno: 29 }.errno(), 29);
    }

    #[test]
    fn display_names_the_mode() {
        let msg = StdioError::InvalidMode("q".into()).to_string();
        assert_eq!(msg, "invalid mode string: \"q\"");
    }

    #[test]
    fn io_error_conversion_keeps_errno() {
        let io: std::io::Error = StdioError::TransferFailed { errno: errno::EIO }.into();
        assert_eq!(io.raw_os_error(), Some(errno::EIO));
        let eof: std::io::Error = StdioError::EndOfStream.into();
        assert_eq!(eof.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
