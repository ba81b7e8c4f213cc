use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use valueid::{Datatype, DateValue, GeoPoint, TaggedValue, TimeZone};

#[test]
fn random_doubles_sort_numerically() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut doubles: Vec<f64> = (0..5_000)
        .map(|i| match i % 3 {
            0 => rng.random_range(-1e3..1e3),
            1 => rng.random_range(-1e-300..1e-300),
            _ => rng.random_range(-1e300..1e300),
        })
        .collect();
    doubles.extend([0.0, -0.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);
    doubles.shuffle(&mut rng);

    let mut encoded: Vec<TaggedValue> = doubles.iter().map(|d| TaggedValue::from_double(*d)).collect();
    encoded.sort();
    let decoded: Vec<f64> = encoded.iter().map(|v| v.get_double()).collect();

    assert_eq!(decoded[decoded.len() - 2], f64::INFINITY);
    assert!(decoded[decoded.len() - 1].is_nan());
    assert_eq!(decoded[0], f64::NEG_INFINITY);
    for pair in decoded[..decoded.len() - 1].windows(2) {
        assert!(pair[0] <= pair[1], "{} > {}", pair[0], pair[1]);
    }
}

#[test]
fn encoding_never_moves_doubles_by_more_than_dropped_bits() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..10_000 {
        let d: f64 = rng.random_range(-1e12..1e12);
        let back = TaggedValue::from_double(d).get_double();
        assert!(back.abs() <= d.abs());
        assert!((d - back).abs() <= d.abs() * 1e-14, "{} vs {}", d, back);
    }
}

#[test]
fn random_ints_sort_numerically() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut ints: Vec<i64> = (0..5_000)
        .map(|_| rng.random_range(-(1i64 << 59)..(1i64 << 59)))
        .collect();
    let mut encoded: Vec<TaggedValue> = ints.iter().map(|i| TaggedValue::from_int(*i)).collect();
    encoded.sort();
    ints.sort();
    let decoded: Vec<i64> = encoded.iter().map(|v| v.get_int()).collect();
    assert_eq!(decoded, ints);
}

#[test]
fn mixed_datatypes_group_by_tag_with_undefined_first() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut values = vec![
        TaggedValue::from_vocab_index(5).unwrap(),
        TaggedValue::from_int(-3),
        TaggedValue::undefined(),
        TaggedValue::from_double(2.5),
        TaggedValue::from_bool(true),
        TaggedValue::from_blank_node_index(1).unwrap(),
        TaggedValue::from_date(DateValue::year(1999, TimeZone::Z).unwrap()),
        TaggedValue::from_geo_point(GeoPoint::new(1.0, 2.0).unwrap()),
        TaggedValue::from_local_vocab_index(0).unwrap(),
        TaggedValue::undefined(),
    ];
    values.shuffle(&mut rng);
    values.sort();
    assert!(values[0].is_undefined() && values[1].is_undefined());
    let tags: Vec<Datatype> = values.iter().map(|v| v.datatype()).collect();
    let mut sorted_tags = tags.clone();
    sorted_tags.sort();
    assert_eq!(tags, sorted_tags);
}

#[test]
fn dates_sort_chronologically() {
    let a = DateValue::parse_xsd("1990-05-01", valueid::xsd::XSD_DATE).unwrap();
    let b = DateValue::parse_xsd("1990-05-01T08:00:00Z", valueid::xsd::XSD_DATE_TIME).unwrap();
    let c = DateValue::parse_xsd("2001", valueid::xsd::XSD_G_YEAR).unwrap();
    let mut v = vec![
        TaggedValue::from_date(c),
        TaggedValue::from_date(b),
        TaggedValue::from_date(a),
    ];
    v.sort();
    assert_eq!(v[0].get_date(), a);
    assert_eq!(v[1].get_date(), b);
    assert_eq!(v[2].get_date(), c);
}
