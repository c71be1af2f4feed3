use std::fmt;

/// Rejection reasons when adopting a serialized line info buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineInfoError {
    /// The buffer ends inside the length prefix.
    TruncatedPrefix,
    /// The length prefix disagrees with the payload that follows it.
    LengthMismatch { expected: u32, actual: usize },
}

impl fmt::Display for LineInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LineInfoError::TruncatedPrefix => f.write_str("truncated length prefix"),
            LineInfoError::LengthMismatch { expected, actual } => {
                write!(f, "length prefix says {expected} bytes, found {actual}")
            }
        }
    }
}
