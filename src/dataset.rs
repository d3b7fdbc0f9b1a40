//! The fixed table of fixture datasets

use crate::prim::{PrimArray, PrimKind, PrimValue};

/// What a dataset serializes to
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A primitive array, e.g. `double[]`
    Array(PrimArray),
    /// A single value boxed in its wrapper class, e.g. `java.lang.Double`
    Boxed(PrimValue),
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub label: &'static str,
    pub payload: Payload,
    /// Written by a default generation run. Inert datasets are only written on request.
    pub persist: bool,
}

impl Dataset {
    const fn persisted(label: &'static str, payload: Payload) -> Self {
        Self {
            label,
            payload,
            persist: true,
        }
    }

    const fn inert(label: &'static str, payload: Payload) -> Self {
        Self {
            label,
            payload,
            persist: false,
        }
    }

    pub fn kind(&self) -> PrimKind {
        match &self.payload {
            Payload::Array(arr) => arr.kind(),
            Payload::Boxed(val) => val.kind(),
        }
    }

    /// Name of the artifact file, `<label>.ser`
    pub fn file_name(&self) -> String {
        format!("{}.ser", self.label)
    }

    /// Number of elements, 1 for a boxed value
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::Array(arr) => arr.len(),
            Payload::Boxed(_) => 1,
        }
    }

    /// Java type of the serialized value, e.g. `double[]` or `java.lang.Double`
    pub fn type_name(&self) -> String {
        match &self.payload {
            Payload::Array(_) => format!("{}[]", self.kind().label()),
            Payload::Boxed(_) => crate::classes::wrapper_class(self.kind()).name.to_string(),
        }
    }
}

/// Every dataset, in generation order.
///
/// Some "signed" and "unsigned" datasets hold identical values. Readers of the fixtures
/// depend on the exact bytes, so they are kept that way.
pub fn table() -> Vec<Dataset> {
    use {Dataset as D, Payload::Array as A, PrimArray as P};
    vec![
        // int
        D::inert("int_array_unsigned", A(P::Int(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]))),
        D::inert(
            "int_array_signed",
            A(P::Int(vec![0, -1, -2, -3, -4, -5, -6, -7, -8, -9])),
        ),
        D::inert("int_array_limits", A(P::Int(vec![i32::MAX, 0, i32::MIN]))),
        // float
        D::inert("float_array_signed", A(P::Float(vec![-3.45, -34.55, -23.3]))),
        D::inert("float_array_unsigned", A(P::Float(vec![3.45, 34.55, 23.3]))),
        D::inert("float_array_limits", A(P::Float(float_limits()))),
        // double
        D::persisted(
            "double_array_signed",
            A(P::Double(vec![
                -0.2343134,
                -1234132.3431,
                -312431.3,
                0.0,
                -1.1234,
            ])),
        ),
        D::persisted(
            "double_array_unsigned",
            A(P::Double(vec![0.2343134, 1234132.3431, 312431.3, 0.0, 1.1234])),
        ),
        D::persisted(
            "double_array_limits",
            A(P::Double(vec![
                DOUBLE_MIN_VALUE,
                0.0,
                f64::MAX,
                f64::NEG_INFINITY,
                f64::INFINITY,
            ])),
        ),
        D::persisted("double_array_empty", A(P::Double(vec![]))),
        D::persisted("double_array_new", A(PrimArray::zeroed(PrimKind::Double, 300))),
        // byte
        D::inert("byte_array_signed", A(P::Byte(vec![]))),
        D::inert("byte_array_unsigned", A(P::Byte(vec![]))),
        D::persisted("byte_array_limits", A(P::Byte(vec![i8::MAX, 0, i8::MAX]))),
        D::persisted("byte_array_empty", A(P::Byte(vec![]))),
        D::persisted("byte_array_new", A(PrimArray::zeroed(PrimKind::Byte, 500))),
        // char
        D::inert("char_array_signed", A(P::Char(vec![]))),
        D::inert("char_array_unsigned", A(P::Char(vec![]))),
        D::inert("char_array_limits", A(P::Char(vec![u16::MAX, 0, u16::MIN]))),
        // long
        D::persisted("long_array_signed", A(P::Long(long_literals()))),
        D::persisted("long_array_unsigned", A(P::Long(long_literals()))),
        D::persisted("long_array_limits", A(P::Long(vec![i64::MAX, i64::MIN, 0]))),
        // short
        D::persisted("short_array_signed", A(P::Short(vec![]))),
        D::persisted("short_array_unsigned", A(P::Short(vec![]))),
        D::persisted(
            "short_array_limits",
            A(P::Short(vec![i16::MAX, 0, i16::MIN])),
        ),
        D::persisted("short_array_new", A(PrimArray::zeroed(PrimKind::Short, 10000))),
        D::persisted("short_array_empty", A(P::Short(vec![]))),
        // boolean
        D::persisted("boolean_array_true", A(P::Boolean(vec![true; 6]))),
        D::persisted("boolean_array_false", A(P::Boolean(vec![false]))),
        D::persisted(
            "boolean_array_mixed",
            A(P::Boolean(vec![true, false, true, true, false])),
        ),
        // wrapper
        D::persisted("double_wrapper", Payload::Boxed(PrimValue::Double(10.0))),
    ]
}

/// Smallest positive subnormal double, 2^-1074
const DOUBLE_MIN_VALUE: f64 = f64::from_bits(1);

fn long_literals() -> Vec<i64> {
    vec![-97609, -906987806, -79855734652564357, -987809]
}

/// `{0, (float)3.4^38, -(float)3.4^38}`, rounded from double like a Java cast
#[expect(
    clippy::cast_possible_truncation,
    reason = "Narrowing to float is the point"
)]
fn float_limits() -> Vec<f32> {
    let big = 3.4f64.powf(38.0) as f32;
    vec![0.0, big, -big]
}

/// Look up a dataset by label
pub fn find(label: &str) -> Option<Dataset> {
    table().into_iter().find(|ds| ds.label == label)
}

#[test]
fn test_labels_are_unique() {
    let table = table();
    let mut labels: Vec<_> = table.iter().map(|ds| ds.label).collect();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), table.len());
}

#[test]
fn test_persisted_set() {
    let persisted: Vec<_> = table()
        .into_iter()
        .filter(|ds| ds.persist)
        .map(|ds| ds.label)
        .collect();
    assert_eq!(
        persisted,
        [
            "double_array_signed",
            "double_array_unsigned",
            "double_array_limits",
            "double_array_empty",
            "double_array_new",
            "byte_array_limits",
            "byte_array_empty",
            "byte_array_new",
            "long_array_signed",
            "long_array_unsigned",
            "long_array_limits",
            "short_array_signed",
            "short_array_unsigned",
            "short_array_limits",
            "short_array_new",
            "short_array_empty",
            "boolean_array_true",
            "boolean_array_false",
            "boolean_array_mixed",
            "double_wrapper",
        ]
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_signed_unsigned_long_are_identical() {
    assert_eq!(
        find("long_array_signed").unwrap().payload,
        find("long_array_unsigned").unwrap().payload
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_zero_filled_datasets() {
    for (label, kind, len) in [
        ("double_array_new", PrimKind::Double, 300),
        ("byte_array_new", PrimKind::Byte, 500),
        ("short_array_new", PrimKind::Short, 10000),
    ] {
        let ds = find(label).unwrap();
        assert_eq!(ds.kind(), kind);
        assert_eq!(ds.payload, Payload::Array(PrimArray::zeroed(kind, len)));
    }
}

#[test]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
fn test_limits() {
    let Payload::Array(PrimArray::Double(limits)) = find("double_array_limits").unwrap().payload
    else {
        panic!("double_array_limits is not a double array");
    };
    assert_eq!(limits[0].to_bits(), 1);
    assert!(limits[0] > 0.0);
    assert_eq!(limits[2], (2.0 - 2f64.powi(-52)) * 2f64.powi(1023));
    assert_eq!(limits[3], f64::NEG_INFINITY);
    assert_eq!(limits[4], f64::INFINITY);
    assert_eq!(
        find("long_array_limits").unwrap().payload,
        Payload::Array(PrimArray::Long(vec![
            9223372036854775807,
            -9223372036854775808,
            0
        ]))
    );
    let ds = find("double_wrapper").unwrap();
    assert_eq!(ds.type_name(), "java.lang.Double");
    assert_eq!(ds.len(), 1);
}
