//! Turning encoded values back into text, and ordering them by that text.

use std::cmp::Ordering;

use log::trace;
use oxigraph::model::{Literal, NamedNode};
use valueid::xsd::{XSD_BOOLEAN, XSD_DECIMAL, XSD_INT, XSD_STRING};
use valueid::{Datatype, TaggedValue};

use crate::errors::{ExportError, Result};
use crate::local_vocab::LocalVocab;
use crate::term::LiteralOrIri;
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Return IRIs without `<>` and literals without quotes, tag or datatype.
    pub remove_quotes_and_angle_brackets: bool,
    /// Decode only values that can hold literals (vocabulary entries); IRIs
    /// and every inline value decode to `None`.
    pub only_literals: bool,
}

impl DecodeOptions {
    pub fn content_only() -> Self {
        DecodeOptions {
            remove_quotes_and_angle_brackets: true,
            only_literals: false,
        }
    }
}

/// Decoded text and, for inline values, the xsd datatype IRI.
pub type StringAndType = (String, Option<&'static str>);

pub fn identity(s: String) -> String {
    s
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        (if d > 0.0 { "INF" } else { "-INF" }).to_string()
    } else if d.fract() == 0.0 {
        format!("{:.0}", d)
    } else {
        format!("{}", d)
    }
}

/// Text and datatype of a value stored inline (numbers, booleans, dates, points).
pub fn encoded_value_to_string_and_type(value: TaggedValue) -> Option<(String, &'static str)> {
    match value.datatype() {
        Datatype::Double => Some((format_double(value.get_double()), XSD_DECIMAL)),
        Datatype::Int => Some((value.get_int().to_string(), XSD_INT)),
        Datatype::Bool => Some((value.bool_literal().to_string(), XSD_BOOLEAN)),
        Datatype::Date => Some(value.get_date().to_string_and_type()),
        Datatype::GeoPoint => Some(value.get_geo_point().to_string_and_type()),
        _ => None,
    }
}

/// Resolve a `VocabIndex` or `LocalVocabIndex` to its term.
pub fn resolve_term(
    vocab: &dyn Vocabulary,
    value: TaggedValue,
    local_vocab: &LocalVocab,
) -> Result<Option<LiteralOrIri>> {
    let Some(index) = value.get_index() else {
        return Ok(None);
    };
    match value.datatype() {
        Datatype::VocabIndex => {
            let repr = vocab.index_to_string(index).ok_or_else(|| {
                ExportError::Vocabulary(format!("vocabulary index {} is unknown", index))
            })?;
            LiteralOrIri::from_string_representation(&repr).map(Some)
        }
        Datatype::LocalVocabIndex => local_vocab
            .get_word(index)
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                ExportError::Vocabulary(format!("local vocab index {} is unknown", index))
            }),
        _ => Ok(None),
    }
}

/// Text of a `WordVocabIndex` or `TextRecordIndex`.
fn text_of(vocab: &dyn Vocabulary, value: TaggedValue) -> Result<Option<String>> {
    let (found, what) = match (value.datatype(), value.get_index()) {
        (Datatype::WordVocabIndex, Some(i)) => (vocab.word(i), "word"),
        (Datatype::TextRecordIndex, Some(i)) => (vocab.text_excerpt(i), "text record"),
        _ => return Ok(None),
    };
    found.map(|s| Some(s.into_owned())).ok_or_else(|| {
        ExportError::Vocabulary(format!("{} index {} is unknown", what, value))
    })
}

/// Decode `value` to its text and, for inline values, its xsd datatype.
///
/// `None` for undefined values and for everything excluded by `options`.
/// `escape` is applied to text that comes from a vocabulary.
pub fn id_to_string_and_type<F>(
    vocab: &dyn Vocabulary,
    value: TaggedValue,
    local_vocab: &LocalVocab,
    options: DecodeOptions,
    escape: F,
) -> Result<Option<StringAndType>>
where
    F: Fn(String) -> String,
{
    let datatype = value.datatype();
    if options.only_literals && !datatype.is_string_type() {
        return Ok(None);
    }
    match datatype {
        Datatype::Undefined => Ok(None),
        Datatype::VocabIndex | Datatype::LocalVocabIndex => {
            let Some(term) = resolve_term(vocab, value, local_vocab)? else {
                return Ok(None);
            };
            if options.only_literals && term.is_iri() {
                return Ok(None);
            }
            if let Some(label) = term.blank_node_label() {
                return Ok(Some((format!("_:{}", label), None)));
            }
            let text = if options.remove_quotes_and_angle_brackets {
                term.content().to_string()
            } else {
                term.to_string_representation()
            };
            Ok(Some((escape(text), None)))
        }
        Datatype::WordVocabIndex | Datatype::TextRecordIndex => {
            Ok(text_of(vocab, value)?.map(|t| (escape(t), None)))
        }
        Datatype::BlankNodeIndex => {
            let index = value.get_index().unwrap_or_default();
            Ok(Some((format!("_:bn{}", index), None)))
        }
        _ => {
            trace!("decoding inline value {}", value);
            Ok(encoded_value_to_string_and_type(value).map(|(s, t)| (s, Some(t))))
        }
    }
}

fn typed_literal(text: String, datatype: &str) -> Result<Literal> {
    let dt = NamedNode::new(datatype)
        .map_err(|e| ExportError::Vocabulary(format!("invalid datatype {}: {}", datatype, e)))?;
    Ok(Literal::new_typed_literal(text, dt))
}

/// Literal view of a value, as needed by string functions.
///
/// The result is always a simple literal: language tags and datatypes are
/// dropped and IRIs become their text. With `only_plain_or_xsd_string`,
/// IRIs, typed literals and inline values yield `None`.
pub fn id_to_literal(
    vocab: &dyn Vocabulary,
    value: TaggedValue,
    local_vocab: &LocalVocab,
    only_plain_or_xsd_string: bool,
) -> Result<Option<Literal>> {
    match value.datatype() {
        Datatype::VocabIndex | Datatype::LocalVocabIndex => {
            match resolve_term(vocab, value, local_vocab)? {
                Some(LiteralOrIri::Iri(_)) if only_plain_or_xsd_string => Ok(None),
                Some(LiteralOrIri::Iri(iri)) => {
                    Ok(Some(Literal::new_simple_literal(iri.into_string())))
                }
                Some(LiteralOrIri::Literal(lit)) => {
                    let plain =
                        lit.language().is_some() || lit.datatype().as_str() == XSD_STRING;
                    if only_plain_or_xsd_string && !plain {
                        return Ok(None);
                    }
                    Ok(Some(Literal::new_simple_literal(lit.value())))
                }
                None => Ok(None),
            }
        }
        Datatype::WordVocabIndex | Datatype::TextRecordIndex => {
            Ok(text_of(vocab, value)?.map(Literal::new_simple_literal))
        }
        Datatype::Undefined | Datatype::BlankNodeIndex => Ok(None),
        _ if only_plain_or_xsd_string => Ok(None),
        _ => Ok(encoded_value_to_string_and_type(value)
            .map(|(text, _)| Literal::new_simple_literal(text))),
    }
}

/// Structured term for a value; inline values become typed literals unless skipped.
pub fn id_to_literal_or_iri(
    vocab: &dyn Vocabulary,
    value: TaggedValue,
    local_vocab: &LocalVocab,
    skip_encoded_values: bool,
) -> Result<Option<LiteralOrIri>> {
    match value.datatype() {
        Datatype::VocabIndex | Datatype::LocalVocabIndex => {
            resolve_term(vocab, value, local_vocab)
        }
        Datatype::WordVocabIndex | Datatype::TextRecordIndex => {
            Ok(text_of(vocab, value)?.map(LiteralOrIri::plain))
        }
        Datatype::Undefined | Datatype::BlankNodeIndex => Ok(None),
        _ if skip_encoded_values => Ok(None),
        _ => match encoded_value_to_string_and_type(value) {
            Some((text, dt)) => Ok(Some(LiteralOrIri::Literal(typed_literal(text, dt)?))),
            None => Ok(None),
        },
    }
}

/// Orders values like `TaggedValue::cmp`, except that vocabulary and local
/// vocab entries form one class ordered by their string representation.
pub struct ValueComparator<'a> {
    vocabulary: &'a dyn Vocabulary,
    local_vocab: &'a LocalVocab,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Value(Datatype, TaggedValue),
    Text(Datatype, String),
}

impl<'a> ValueComparator<'a> {
    pub fn new(vocabulary: &'a dyn Vocabulary, local_vocab: &'a LocalVocab) -> Self {
        ValueComparator {
            vocabulary,
            local_vocab,
        }
    }

    fn class(datatype: Datatype) -> Datatype {
        if datatype.is_string_type() {
            Datatype::VocabIndex
        } else {
            datatype
        }
    }

    fn text(&self, value: TaggedValue) -> Result<String> {
        resolve_term(self.vocabulary, value, self.local_vocab)?
            .map(|t| t.to_string_representation())
            .ok_or_else(|| ExportError::Vocabulary(format!("cannot resolve {}", value)))
    }

    pub fn compare(&self, a: TaggedValue, b: TaggedValue) -> Result<Ordering> {
        let (ca, cb) = (Self::class(a.datatype()), Self::class(b.datatype()));
        if ca != cb {
            return Ok(ca.cmp(&cb));
        }
        if !a.datatype().is_string_type() || a == b {
            return Ok(a.cmp(&b));
        }
        Ok(self.text(a)?.cmp(&self.text(b)?))
    }

    fn key(&self, value: TaggedValue) -> Result<SortKey> {
        let class = Self::class(value.datatype());
        if value.datatype().is_string_type() {
            Ok(SortKey::Text(class, self.text(value)?))
        } else {
            Ok(SortKey::Value(class, value))
        }
    }

    /// Sort `values` in place, resolving every string once.
    pub fn sort(&self, values: &mut [TaggedValue]) -> Result<()> {
        let mut keyed = values
            .iter()
            .map(|v| Ok((self.key(*v)?, *v)))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(ka, va), (kb, vb)| {
            let class_order = key_class(ka).cmp(&key_class(kb));
            class_order.then_with(|| ka.cmp(kb)).then_with(|| va.cmp(vb))
        });
        for (slot, (_, v)) in values.iter_mut().zip(keyed) {
            *slot = v;
        }
        Ok(())
    }
}

fn key_class(key: &SortKey) -> Datatype {
    match key {
        SortKey::Value(c, _) | SortKey::Text(c, _) => *c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::InMemoryVocabulary;
    use valueid::{DateValue, GeoPoint, TimeZone};

    fn setup() -> (InMemoryVocabulary, LocalVocab) {
        let vocab = InMemoryVocabulary::from_terms(vec![
            LiteralOrIri::iri("http://example.org/b").unwrap(),
            LiteralOrIri::from_string_representation("\"hello\"@en").unwrap(),
            LiteralOrIri::iri("urn:x-blank-node:n1").unwrap(),
        ])
        .with_words(vec!["word, with comma".into()])
        .with_text_records(vec!["some text".into()]);
        let mut local = LocalVocab::new();
        local.get_index_and_add_if_not_contained(LiteralOrIri::iri("http://example.org/a").unwrap());
        local.get_index_and_add_if_not_contained(
            LiteralOrIri::from_string_representation(
                "\"7\"^^<http://www.w3.org/2001/XMLSchema#short>",
            )
            .unwrap(),
        );
        (vocab, local)
    }

    fn decode(
        vocab: &InMemoryVocabulary,
        local: &LocalVocab,
        v: TaggedValue,
        options: DecodeOptions,
    ) -> Option<StringAndType> {
        id_to_string_and_type(vocab, v, local, options, identity).unwrap()
    }

    #[test]
    fn inline_values() {
        let (vocab, local) = setup();
        let d = DecodeOptions::default();
        let cases = [
            (TaggedValue::from_double(42.0), "42", XSD_DECIMAL),
            (TaggedValue::from_double(-0.5), "-0.5", XSD_DECIMAL),
            (TaggedValue::from_double(f64::INFINITY), "INF", XSD_DECIMAL),
            (TaggedValue::from_double(f64::NEG_INFINITY), "-INF", XSD_DECIMAL),
            (TaggedValue::from_double(f64::NAN), "NaN", XSD_DECIMAL),
            (TaggedValue::from_int(-17), "-17", XSD_INT),
            (TaggedValue::from_bool(false), "false", XSD_BOOLEAN),
            (TaggedValue::bool_from_zero_or_one(true), "1", XSD_BOOLEAN),
        ];
        for (v, text, dt) in cases {
            assert_eq!(decode(&vocab, &local, v, d), Some((text.to_string(), Some(dt))));
        }
        let date = DateValue::date(2000, 1, 31, TimeZone::Z).unwrap();
        assert_eq!(
            decode(&vocab, &local, TaggedValue::from_date(date), d),
            Some(("2000-01-31Z".to_string(), Some(valueid::xsd::XSD_DATE)))
        );
        let point = GeoPoint::new(1.0, 2.0).unwrap();
        let (text, dt) = decode(&vocab, &local, TaggedValue::from_geo_point(point), d).unwrap();
        assert!(text.starts_with("POINT(2.0"));
        assert_eq!(dt, Some(valueid::xsd::GEO_WKT_LITERAL));
    }

    #[test]
    fn vocabulary_values() {
        let (vocab, local) = setup();
        let full = DecodeOptions::default();
        let bare = DecodeOptions::content_only();
        let hello = TaggedValue::from_vocab_index(0).unwrap();
        let b = TaggedValue::from_vocab_index(1).unwrap();
        let a = TaggedValue::from_local_vocab_index(0).unwrap();
        assert_eq!(
            decode(&vocab, &local, hello, full),
            Some(("\"hello\"@en".into(), None))
        );
        assert_eq!(decode(&vocab, &local, hello, bare), Some(("hello".into(), None)));
        assert_eq!(
            decode(&vocab, &local, b, full),
            Some(("<http://example.org/b>".into(), None))
        );
        assert_eq!(
            decode(&vocab, &local, a, bare),
            Some(("http://example.org/a".into(), None))
        );
    }

    #[test]
    fn blank_nodes_and_text() {
        let (vocab, local) = setup();
        let d = DecodeOptions::default();
        let bn_iri = TaggedValue::from_vocab_index(2).unwrap();
        assert_eq!(decode(&vocab, &local, bn_iri, d), Some(("_:n1".into(), None)));
        let bn = TaggedValue::from_blank_node_index(27).unwrap();
        assert_eq!(decode(&vocab, &local, bn, d), Some(("_:bn27".into(), None)));
        let word = TaggedValue::from_word_vocab_index(0).unwrap();
        let escaped = id_to_string_and_type(&vocab, word, &local, d, crate::util::escape_for_csv)
            .unwrap()
            .unwrap();
        assert_eq!(escaped.0, "\"word, with comma\"");
        let text = TaggedValue::from_text_record_index(0).unwrap();
        assert_eq!(decode(&vocab, &local, text, d), Some(("some text".into(), None)));
    }

    #[test]
    fn only_literals() {
        let (vocab, local) = setup();
        let opts = DecodeOptions {
            remove_quotes_and_angle_brackets: false,
            only_literals: true,
        };
        assert_eq!(decode(&vocab, &local, TaggedValue::from_int(1), opts), None);
        let iri = TaggedValue::from_vocab_index(1).unwrap();
        assert_eq!(decode(&vocab, &local, iri, opts), None);
        let lit = TaggedValue::from_vocab_index(0).unwrap();
        assert!(decode(&vocab, &local, lit, opts).is_some());
    }

    #[test]
    fn undefined_and_unknown() {
        let (vocab, local) = setup();
        let d = DecodeOptions::default();
        assert_eq!(decode(&vocab, &local, TaggedValue::undefined(), d), None);
        let missing = TaggedValue::from_local_vocab_index(99).unwrap();
        let err = id_to_string_and_type(&vocab, missing, &local, d, identity).unwrap_err();
        assert!(matches!(err, ExportError::Vocabulary(_)));
    }

    #[test]
    fn literal_views() {
        let (vocab, local) = setup();
        let iri = TaggedValue::from_vocab_index(1).unwrap();
        let lit = id_to_literal(&vocab, iri, &local, false).unwrap().unwrap();
        assert_eq!(lit, Literal::new_simple_literal("http://example.org/b"));
        assert!(id_to_literal(&vocab, iri, &local, true).unwrap().is_none());

        let hello = TaggedValue::from_vocab_index(0).unwrap();
        for only_plain in [false, true] {
            let lit = id_to_literal(&vocab, hello, &local, only_plain).unwrap().unwrap();
            assert_eq!(lit, Literal::new_simple_literal("hello"));
            assert!(lit.language().is_none());
        }

        let short = TaggedValue::from_local_vocab_index(1).unwrap();
        assert!(id_to_literal(&vocab, short, &local, true).unwrap().is_none());
        let lit = id_to_literal(&vocab, short, &local, false).unwrap().unwrap();
        assert_eq!(lit, Literal::new_simple_literal("7"));

        let int = TaggedValue::from_int(5);
        assert!(id_to_literal(&vocab, int, &local, true).unwrap().is_none());
        let lit = id_to_literal(&vocab, int, &local, false).unwrap().unwrap();
        assert_eq!(lit, Literal::new_simple_literal("5"));
        assert_eq!(lit.datatype().as_str(), XSD_STRING);

        assert!(id_to_literal_or_iri(&vocab, int, &local, true).unwrap().is_none());
        let term = id_to_literal_or_iri(&vocab, iri, &local, true).unwrap().unwrap();
        assert!(term.is_iri());
    }

    #[test]
    fn mixed_sort_follows_class_then_value() {
        let (vocab, local) = setup();
        let cmp = ValueComparator::new(&vocab, &local);
        let v = |i| TaggedValue::from_vocab_index(i).unwrap();
        let l = |i| TaggedValue::from_local_vocab_index(i).unwrap();
        let date = TaggedValue::from_date(DateValue::date(1999, 12, 31, TimeZone::Z).unwrap());
        let text = TaggedValue::from_text_record_index(0).unwrap();
        let bnode = TaggedValue::from_blank_node_index(4).unwrap();

        assert_eq!(
            cmp.compare(TaggedValue::from_double(-0.0), TaggedValue::from_double(0.0))
                .unwrap(),
            Ordering::Equal
        );

        let mut values = vec![
            bnode,
            TaggedValue::from_double(f64::NAN),
            v(2),
            TaggedValue::from_int(10),
            l(0),
            TaggedValue::from_double(0.0),
            date,
            TaggedValue::from_bool(true),
            v(0),
            TaggedValue::from_double(f64::NEG_INFINITY),
            text,
            TaggedValue::from_int(-4),
            l(1),
            TaggedValue::undefined(),
            TaggedValue::from_double(-0.0),
            v(1),
            TaggedValue::from_double(2.5),
            TaggedValue::from_double(f64::INFINITY),
        ];
        cmp.sort(&mut values).unwrap();
        assert_eq!(
            values,
            vec![
                TaggedValue::undefined(),
                TaggedValue::from_bool(true),
                TaggedValue::from_int(-4),
                TaggedValue::from_int(10),
                TaggedValue::from_double(f64::NEG_INFINITY),
                TaggedValue::from_double(0.0),
                TaggedValue::from_double(0.0),
                TaggedValue::from_double(2.5),
                TaggedValue::from_double(f64::INFINITY),
                TaggedValue::from_double(f64::NAN),
                // "7"^^xsd:short < "hello"@en < <http://example.org/a> < ...b> < <urn:...>
                l(1),
                v(0),
                l(0),
                v(1),
                v(2),
                text,
                date,
                bnode,
            ]
        );
    }

    #[test]
    fn strings_sort_by_text_across_vocabularies() {
        let (vocab, local) = setup();
        let cmp = ValueComparator::new(&vocab, &local);
        let local_a = TaggedValue::from_local_vocab_index(0).unwrap();
        let vocab_b = TaggedValue::from_vocab_index(1).unwrap();
        // by tag the vocab value would come first
        assert!(vocab_b < local_a);
        assert_eq!(cmp.compare(local_a, vocab_b).unwrap(), Ordering::Less);

        let mut values = vec![
            vocab_b,
            TaggedValue::from_int(3),
            local_a,
            TaggedValue::undefined(),
            TaggedValue::from_double(1.5),
        ];
        cmp.sort(&mut values).unwrap();
        assert_eq!(
            values,
            vec![
                TaggedValue::undefined(),
                TaggedValue::from_int(3),
                TaggedValue::from_double(1.5),
                local_a,
                vocab_b,
            ]
        );
    }
}
