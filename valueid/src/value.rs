use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Read, Write};

use crate::datatype::{Datatype, NUM_DATA_BITS};
use crate::date::DateValue;
use crate::error::{Result, ValueError};
use crate::geo::GeoPoint;

/// Largest index an index-bearing value can hold.
pub const MAX_INDEX: u64 = (1 << NUM_DATA_BITS) - 1;

/// Smallest positive double that survives encoding; anything closer to zero becomes 0.
pub const MIN_POSITIVE_DOUBLE: f64 = f64::from_bits(1 << NUM_DROPPED_DOUBLE_BITS);

/// Size of one encoded value in bytes.
pub const ENCODED_SIZE: usize = 8;

const DATA_MASK: u64 = MAX_INDEX;
const NUM_DROPPED_DOUBLE_BITS: u32 = 64 - NUM_DATA_BITS;
const SIGN_BIT: u64 = 1 << 63;

const BOOL_ZERO_OR_ONE_FLAG: u64 = 1;
const BOOL_VALUE_BIT: u64 = 1 << 1;

/// One bound value in a result table: a 4-bit datatype tag over a 60-bit payload.
///
/// Equality and hashing are on the raw word. `Ord` is total and does not need
/// a vocabulary; index-bearing values compare by index there. Comparing
/// strings by their text is done by a comparator that knows the vocabularies.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaggedValue {
    bits: u64,
}

impl TaggedValue {
    fn make(datatype: Datatype, payload: u64) -> Self {
        debug_assert!(payload <= DATA_MASK);
        TaggedValue {
            bits: ((datatype as u64) << NUM_DATA_BITS) | payload,
        }
    }

    fn make_index(datatype: Datatype, index: u64) -> Result<Self> {
        if index > MAX_INDEX {
            return Err(ValueError::IndexTooLarge {
                datatype,
                index,
                max: MAX_INDEX,
            });
        }
        Ok(TaggedValue::make(datatype, index))
    }

    pub const fn undefined() -> Self {
        TaggedValue { bits: 0 }
    }

    /// Encode a double. The four lowest mantissa bits are dropped, `-0.0`
    /// becomes `0.0` and every NaN becomes the same quiet NaN.
    pub fn from_double(d: f64) -> Self {
        let raw = if d.is_nan() {
            f64::NAN.to_bits()
        } else {
            d.to_bits() & !((1 << NUM_DROPPED_DOUBLE_BITS) - 1)
        };
        // covers -0.0 and negative values that were truncated to zero
        let raw = if raw & !SIGN_BIT == 0 { 0 } else { raw };
        let key = if raw & SIGN_BIT == 0 { raw | SIGN_BIT } else { !raw };
        TaggedValue::make(Datatype::Double, key >> NUM_DROPPED_DOUBLE_BITS)
    }

    /// Encode an integer, wrapping it into 60-bit two's complement.
    pub fn from_int(i: i64) -> Self {
        TaggedValue::make(Datatype::Int, (i as u64) & DATA_MASK)
    }

    pub fn from_bool(b: bool) -> Self {
        TaggedValue::make(Datatype::Bool, if b { BOOL_VALUE_BIT } else { 0 })
    }

    /// A boolean that renders as `1` or `0` instead of `true` or `false`.
    pub fn bool_from_zero_or_one(b: bool) -> Self {
        let value = if b { BOOL_VALUE_BIT } else { 0 };
        TaggedValue::make(Datatype::Bool, value | BOOL_ZERO_OR_ONE_FLAG)
    }

    pub fn from_vocab_index(index: u64) -> Result<Self> {
        TaggedValue::make_index(Datatype::VocabIndex, index)
    }

    pub fn from_local_vocab_index(index: u64) -> Result<Self> {
        TaggedValue::make_index(Datatype::LocalVocabIndex, index)
    }

    pub fn from_text_record_index(index: u64) -> Result<Self> {
        TaggedValue::make_index(Datatype::TextRecordIndex, index)
    }

    pub fn from_word_vocab_index(index: u64) -> Result<Self> {
        TaggedValue::make_index(Datatype::WordVocabIndex, index)
    }

    pub fn from_blank_node_index(index: u64) -> Result<Self> {
        TaggedValue::make_index(Datatype::BlankNodeIndex, index)
    }

    pub fn from_date(date: DateValue) -> Self {
        TaggedValue::make(Datatype::Date, date.to_bits())
    }

    pub fn from_geo_point(point: GeoPoint) -> Self {
        TaggedValue::make(Datatype::GeoPoint, point.to_bits())
    }

    /// Rebuild a value from its raw word, rejecting unknown datatype tags.
    pub fn from_bits(bits: u64) -> Result<Self> {
        let tag = (bits >> NUM_DATA_BITS) as u8;
        Datatype::from_u8(tag).ok_or(ValueError::InvalidDatatype(tag))?;
        Ok(TaggedValue { bits })
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn datatype(&self) -> Datatype {
        // constructors and from_bits only ever store known tags
        Datatype::from_u8((self.bits >> NUM_DATA_BITS) as u8).unwrap_or(Datatype::Undefined)
    }

    pub fn is_undefined(&self) -> bool {
        self.datatype() == Datatype::Undefined
    }

    fn payload(&self) -> u64 {
        self.bits & DATA_MASK
    }

    pub fn get_double(&self) -> f64 {
        debug_assert_eq!(self.datatype(), Datatype::Double);
        let key = self.payload() << NUM_DROPPED_DOUBLE_BITS;
        let raw = if key & SIGN_BIT != 0 {
            key & !SIGN_BIT
        } else {
            !(key | ((1 << NUM_DROPPED_DOUBLE_BITS) - 1))
        };
        f64::from_bits(raw)
    }

    pub fn get_int(&self) -> i64 {
        debug_assert_eq!(self.datatype(), Datatype::Int);
        ((self.payload() << NUM_DROPPED_DOUBLE_BITS) as i64) >> NUM_DROPPED_DOUBLE_BITS
    }

    pub fn get_bool(&self) -> bool {
        debug_assert_eq!(self.datatype(), Datatype::Bool);
        self.payload() & BOOL_VALUE_BIT != 0
    }

    /// True if this boolean was built with [`TaggedValue::bool_from_zero_or_one`].
    pub fn is_zero_or_one_bool(&self) -> bool {
        self.datatype() == Datatype::Bool && self.payload() & BOOL_ZERO_OR_ONE_FLAG != 0
    }

    /// Lexical form of a boolean: `true`/`false` or `1`/`0` depending on how it was built.
    pub fn bool_literal(&self) -> &'static str {
        match (self.is_zero_or_one_bool(), self.get_bool()) {
            (false, true) => "true",
            (false, false) => "false",
            (true, true) => "1",
            (true, false) => "0",
        }
    }

    /// The index of an index-bearing value, `None` for every other datatype.
    pub fn get_index(&self) -> Option<u64> {
        self.datatype().is_index_type().then(|| self.payload())
    }

    pub fn get_date(&self) -> DateValue {
        debug_assert_eq!(self.datatype(), Datatype::Date);
        DateValue::from_bits(self.payload())
    }

    pub fn get_geo_point(&self) -> GeoPoint {
        debug_assert_eq!(self.datatype(), Datatype::GeoPoint);
        GeoPoint::from_bits(self.payload())
    }

    pub fn to_bytes(&self) -> [u8; ENCODED_SIZE] {
        self.bits.to_le_bytes()
    }

    /// Read a value from the first eight bytes of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let word: [u8; ENCODED_SIZE] = buf
            .get(..ENCODED_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(ValueError::ShortBuffer(buf.len()))?;
        TaggedValue::from_bits(u64::from_le_bytes(word))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.to_bytes())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; ENCODED_SIZE];
        r.read_exact(&mut buf)?;
        TaggedValue::from_bytes(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Default for TaggedValue {
    fn default() -> Self {
        TaggedValue::undefined()
    }
}

impl Ord for TaggedValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.datatype(), other.datatype());
        if a != b {
            return a.cmp(&b);
        }
        match a {
            Datatype::Int => self.get_int().cmp(&other.get_int()),
            // doubles store an order-preserving key, dates and points pack
            // their most significant component first
            _ => self.payload().cmp(&other.payload()),
        }
    }
}

impl PartialOrd for TaggedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dt = self.datatype();
        write!(f, "{}:", dt.short_name())?;
        match dt {
            Datatype::Undefined => write!(f, "{}", self.payload()),
            Datatype::Bool => write!(f, "{}", self.get_bool()),
            Datatype::Int => write!(f, "{}", self.get_int()),
            Datatype::Double => write!(f, "{:.6}", self.get_double()),
            Datatype::Date => write!(f, "{}", self.get_date()),
            Datatype::GeoPoint => write!(f, "{}", self.get_geo_point()),
            _ => write!(f, "{}", self.payload()),
        }
    }
}

impl fmt::Debug for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
