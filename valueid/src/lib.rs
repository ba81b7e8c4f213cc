//! valueid: one 64-bit word per bound RDF value.
//!
//! The upper four bits of a [`TaggedValue`] hold its [`Datatype`], the lower
//! sixty bits the payload: an index into one of the string tables, or an
//! inline number, boolean, date or geo point. Inline values are lossy in a
//! documented way (doubles drop four mantissa bits, integers wrap at sixty
//! bits); index values are never truncated and fail to construct instead.
//!
//! ```
//! use valueid::{Datatype, TaggedValue};
//!
//! let a = TaggedValue::from_double(-1.5);
//! let b = TaggedValue::from_int(7);
//! assert_eq!(a.datatype(), Datatype::Double);
//! assert_eq!(b.get_int(), 7);
//! assert!(a < TaggedValue::from_double(0.0));
//!
//! let bytes = b.to_bytes();
//! assert_eq!(TaggedValue::from_bytes(&bytes).unwrap(), b);
//! ```

pub mod datatype;
pub mod date;
pub mod error;
pub mod geo;
pub mod value;
pub mod xsd;

pub use datatype::{Datatype, NUM_DATA_BITS, NUM_DATATYPE_BITS};
pub use date::{DateKind, DateValue, TimeZone};
pub use error::{Result, ValueError};
pub use geo::GeoPoint;
pub use value::{ENCODED_SIZE, MAX_INDEX, MIN_POSITIVE_DOUBLE, TaggedValue};
