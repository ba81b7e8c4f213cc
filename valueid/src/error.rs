use std::fmt;

use crate::datatype::Datatype;

/// Errors that can arise when constructing or reading tagged values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An index-bearing value was constructed with an index above the maximum.
    IndexTooLarge {
        datatype: Datatype,
        index: u64,
        max: u64,
    },
    /// The tag bits of a raw word do not name a datatype.
    InvalidDatatype(u8),
    /// Fewer bytes than one encoded word were available.
    ShortBuffer(usize),
    /// A date component is outside the packable range.
    InvalidDate(String),
    /// Latitude or longitude outside the valid range.
    InvalidGeoPoint(String),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::IndexTooLarge {
                datatype,
                index,
                max,
            } => write!(
                f,
                "{} index {} is bigger than the maximum index {}",
                datatype, index, max
            ),
            ValueError::InvalidDatatype(tag) => write!(f, "invalid datatype tag {}", tag),
            ValueError::ShortBuffer(n) => {
                write!(f, "need 8 bytes to read a tagged value, got {}", n)
            }
            ValueError::InvalidDate(m) => write!(f, "invalid date: {}", m),
            ValueError::InvalidGeoPoint(m) => write!(f, "invalid geo point: {}", m),
        }
    }
}

impl std::error::Error for ValueError {}

pub type Result<T> = std::result::Result<T, ValueError>;
