//! Datatype tags stored in the upper bits of a [`TaggedValue`](crate::TaggedValue).

use std::fmt;

/// Number of bits reserved for the datatype tag.
pub const NUM_DATATYPE_BITS: u32 = 4;
/// Number of payload bits below the tag.
pub const NUM_DATA_BITS: u32 = 64 - NUM_DATATYPE_BITS;

/// Enumerates the datatypes a tagged value can carry.
///
/// The discriminant is the tag stored in the word, so the declaration order
/// is also the order of the datatype classes when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Datatype {
    Undefined = 0,
    Bool = 1,
    Int = 2,
    Double = 3,
    VocabIndex = 4,
    LocalVocabIndex = 5,
    TextRecordIndex = 6,
    WordVocabIndex = 7,
    Date = 8,
    GeoPoint = 9,
    BlankNodeIndex = 10,
}

impl Datatype {
    /// All datatypes in tag order.
    pub const ALL: [Datatype; 11] = [
        Datatype::Undefined,
        Datatype::Bool,
        Datatype::Int,
        Datatype::Double,
        Datatype::VocabIndex,
        Datatype::LocalVocabIndex,
        Datatype::TextRecordIndex,
        Datatype::WordVocabIndex,
        Datatype::Date,
        Datatype::GeoPoint,
        Datatype::BlankNodeIndex,
    ];

    /// Convert a raw tag into a datatype, if recognized.
    pub fn from_u8(v: u8) -> Option<Self> {
        use Datatype::*;
        Some(match v {
            0 => Undefined,
            1 => Bool,
            2 => Int,
            3 => Double,
            4 => VocabIndex,
            5 => LocalVocabIndex,
            6 => TextRecordIndex,
            7 => WordVocabIndex,
            8 => Date,
            9 => GeoPoint,
            10 => BlankNodeIndex,
            _ => return None,
        })
    }

    /// True for the datatypes whose payload is an index into a string table
    /// that resolves to an IRI or literal (these sort by their text).
    pub fn is_string_type(self) -> bool {
        matches!(self, Datatype::VocabIndex | Datatype::LocalVocabIndex)
    }

    /// True for every datatype whose payload is a bounded unsigned index.
    pub fn is_index_type(self) -> bool {
        matches!(
            self,
            Datatype::VocabIndex
                | Datatype::LocalVocabIndex
                | Datatype::TextRecordIndex
                | Datatype::WordVocabIndex
                | Datatype::BlankNodeIndex
        )
    }

    /// Short prefix used by the debug representation of values.
    pub fn short_name(self) -> &'static str {
        match self {
            Datatype::Undefined => "U",
            Datatype::Bool => "B",
            Datatype::Int => "I",
            Datatype::Double => "D",
            Datatype::VocabIndex => "V",
            Datatype::LocalVocabIndex => "L",
            Datatype::TextRecordIndex => "T",
            Datatype::WordVocabIndex => "W",
            Datatype::Date => "DA",
            Datatype::GeoPoint => "G",
            Datatype::BlankNodeIndex => "BN",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Undefined => "Undefined",
            Datatype::Bool => "Bool",
            Datatype::Int => "Int",
            Datatype::Double => "Double",
            Datatype::VocabIndex => "VocabIndex",
            Datatype::LocalVocabIndex => "LocalVocabIndex",
            Datatype::TextRecordIndex => "TextRecordIndex",
            Datatype::WordVocabIndex => "WordVocabIndex",
            Datatype::Date => "Date",
            Datatype::GeoPoint => "GeoPoint",
            Datatype::BlankNodeIndex => "BlankNodeIndex",
        };
        f.write_str(name)
    }
}
