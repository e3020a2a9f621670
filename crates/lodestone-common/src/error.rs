use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LodestoneError {
    IoError(std::io::Error),
    /// Malformed binary data: bad tag kind, bad compression scheme,
    /// truncated stream, out-of-range region offset.
    FormatError(String),
    /// Region file, chunk column, world or player does not exist.
    NotFound(String),
    /// The request's trailing extension does not match the endpoint.
    WrongExtension { requested: String, expected: String },
    /// Member-only endpoint called without membership.
    Unauthorized,
}

impl LodestoneError {
    /// HTTP status the serialization layer renders this error as.
    pub fn status(&self) -> u16 {
        match self {
            LodestoneError::IoError(_) => 500,
            LodestoneError::FormatError(_) => 500,
            LodestoneError::NotFound(_) => 404,
            LodestoneError::WrongExtension { .. } => 404,
            LodestoneError::Unauthorized => 401,
        }
    }
}

impl fmt::Display for LodestoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LodestoneError::IoError(err) => write!(f, "IO error: {}", err),
            LodestoneError::FormatError(msg) => write!(f, "format error: {}", msg),
            LodestoneError::NotFound(msg) => write!(f, "not found: {}", msg),
            LodestoneError::WrongExtension {
                requested,
                expected,
            } => write!(
                f,
                "wrong extension: requested .{}, endpoint serves .{}",
                requested, expected
            ),
            LodestoneError::Unauthorized => write!(
                f,
                "you don't have permission to access this endpoint, either because \
                 you're not a server member or because you haven't entered your API key"
            ),
        }
    }
}

impl Error for LodestoneError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LodestoneError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LodestoneError {
    fn from(err: std::io::Error) -> Self {
        // Decode errors raised while parsing binary data surface as format
        // errors so that truncated files are never reported as plain IO.
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData => {
                LodestoneError::FormatError(err.to_string())
            }
            _ => LodestoneError::IoError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(LodestoneError::Unauthorized.status(), 401);
        assert_eq!(LodestoneError::NotFound("x".to_owned()).status(), 404);
        assert_eq!(
            LodestoneError::WrongExtension {
                requested: "json".to_owned(),
                expected: "mca".to_owned(),
            }
            .status(),
            404
        );
        assert_eq!(LodestoneError::FormatError("x".to_owned()).status(), 500);
    }

    #[test]
    fn test_truncated_read_becomes_format_error() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        assert_matches::assert_matches!(
            LodestoneError::from(eof),
            LodestoneError::FormatError(_)
        );
    }

    #[test]
    fn test_other_io_stays_io() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_matches::assert_matches!(LodestoneError::from(denied), LodestoneError::IoError(_));
    }
}
