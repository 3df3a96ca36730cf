use std::{error::Error, fmt, io, string::FromUtf8Error};

/// An error occurred while reading an Aseprite file.
///
/// Any error aborts the parse; no partial document is returned.
#[derive(Debug)]
pub enum ParseError {
    /// The input ended before a structural read completed.
    ShortRead,
    /// A magic number did not match the expected value.
    BadMagic {
        /// Which record failed the check ("document header" or "frame header").
        context: &'static str,
        /// The magic number the format requires.
        expected: u16,
        /// The value found in the input.
        found: u16,
    },
    /// The header declares a color depth other than 8, 16 or 32.
    UnsupportedColorDepth(u16),
    /// A chunk header carries an unknown, non-deprecated chunk type id.
    InvalidChunkType(u16),
    /// A trailing chunk appeared without the anchor chunk it attaches to.
    BadAssociation(String),
    /// A linked cel does not resolve to a pixel-carrying cel on an earlier
    /// frame of the same layer.
    BadLink(String),
    /// A zlib stream inside a chunk was malformed.
    DecompressionFailed(String),
    /// The input was structurally readable but violates a format invariant
    /// (out-of-range tag, bad layer index, overlong palette packet, ...).
    InvariantViolation(String),
    /// The byte source failed with an I/O error other than end-of-input.
    Io(io::Error),
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ParseError::ShortRead
        } else {
            ParseError::Io(err)
        }
    }
}

impl From<FromUtf8Error> for ParseError {
    fn from(err: FromUtf8Error) -> Self {
        ParseError::InvariantViolation(format!("could not decode utf8: {}", err))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::ShortRead => {
                write!(f, "Input ended before a structural read completed")
            }
            ParseError::BadMagic {
                context,
                expected,
                found,
            } => write!(
                f,
                "Invalid magic number for {}: {:#06x} != {:#06x}",
                context, found, expected
            ),
            ParseError::UnsupportedColorDepth(depth) => {
                write!(f, "Unsupported color depth: {}", depth)
            }
            ParseError::InvalidChunkType(code) => {
                write!(f, "Invalid or unknown chunk type: {:#06x}", code)
            }
            ParseError::BadAssociation(msg) => write!(f, "Bad chunk association: {}", msg),
            ParseError::BadLink(msg) => write!(f, "Bad cel link: {}", msg),
            ParseError::DecompressionFailed(msg) => {
                write!(f, "Failed to decompress chunk data: {}", msg)
            }
            ParseError::InvariantViolation(msg) => write!(f, "Invalid Aseprite input: {}", msg),
            ParseError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::Io(err) => Some(err),
            _ => None,
        }
    }
}
