//! Class descriptors known to the writer: primitive array classes and the
//! `java.lang` wrappers of the primitive types

use {
    crate::{
        prim::PrimKind,
        stream::SC_SERIALIZABLE,
    },
    constcat::concat,
};

/// Static description of a serializable class, as written in a `TC_CLASSDESC`
#[derive(Debug)]
pub struct ClassSpec {
    pub name: &'static str,
    pub suid: i64,
    pub flags: u8,
    /// Primitive fields, in the order the JVM sorts them (primitives first, then by name)
    pub fields: &'static [FieldSpec],
    pub super_class: Option<&'static ClassSpec>,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub kind: PrimKind,
    pub name: &'static str,
}

/// Name of the single field every primitive wrapper class declares
pub const VALUE_FIELD: &str = "value";

const JAVA_LANG: &str = "java.lang.";

macro_rules! array_classes {
    ($($static:ident => $kind:ident,)*) => {
        $(
            static $static: ClassSpec = ClassSpec {
                name: PrimKind::$kind.array_class_name(),
                suid: PrimKind::$kind.array_suid(),
                flags: SC_SERIALIZABLE,
                fields: &[],
                super_class: None,
            };
        )*

        /// Class descriptor of the one dimensional array of `kind`
        pub fn array_class(kind: PrimKind) -> &'static ClassSpec {
            match kind {
                $(PrimKind::$kind => &$static,)*
            }
        }
    };
}

array_classes! {
    BYTE_ARRAY => Byte,
    CHAR_ARRAY => Char,
    DOUBLE_ARRAY => Double,
    FLOAT_ARRAY => Float,
    INT_ARRAY => Int,
    LONG_ARRAY => Long,
    SHORT_ARRAY => Short,
    BOOLEAN_ARRAY => Boolean,
}

#[expect(clippy::cast_possible_wrap, reason = "UIDs are signed 64 bit values")]
pub static NUMBER: ClassSpec = ClassSpec {
    name: concat!(JAVA_LANG, "Number"),
    suid: 0x86AC_951D_0B94_E08B_u64 as i64,
    flags: SC_SERIALIZABLE,
    fields: &[],
    super_class: None,
};

macro_rules! wrapper_classes {
    ($($static:ident $class:literal => $kind:ident $suid:literal $super:expr,)*) => {
        $(
            #[expect(clippy::cast_possible_wrap, reason = "UIDs are signed 64 bit values")]
            pub static $static: ClassSpec = ClassSpec {
                name: concat!(JAVA_LANG, $class),
                suid: $suid as i64,
                flags: SC_SERIALIZABLE,
                fields: &[FieldSpec {
                    kind: PrimKind::$kind,
                    name: VALUE_FIELD,
                }],
                super_class: $super,
            };
        )*

        /// Wrapper class boxing values of `kind`, e.g. `java.lang.Double`
        pub fn wrapper_class(kind: PrimKind) -> &'static ClassSpec {
            match kind {
                $(PrimKind::$kind => &$static,)*
            }
        }

        /// Primitive kind boxed by the wrapper class `name`, if it is one
        pub fn wrapped_kind(name: &str) -> Option<PrimKind> {
            match name {
                $(n if n == $static.name => Some(PrimKind::$kind),)*
                _ => None,
            }
        }
    };
}

wrapper_classes! {
    BYTE "Byte" => Byte 0x9C4E_6084_EE50_F51C_u64 Some(&NUMBER),
    CHARACTER "Character" => Char 0x348B_47D9_6B1A_2678_u64 None,
    DOUBLE "Double" => Double 0x80B3_C24A_296B_FB04_u64 Some(&NUMBER),
    FLOAT "Float" => Float 0xDAED_C9A2_DB3C_F0EC_u64 Some(&NUMBER),
    INTEGER "Integer" => Int 0x12E2_A0A4_F781_8738_u64 Some(&NUMBER),
    LONG "Long" => Long 0x3B8B_E490_CC8F_23DF_u64 Some(&NUMBER),
    SHORT "Short" => Short 0x684D_3713_3460_DA52_u64 Some(&NUMBER),
    BOOLEAN "Boolean" => Boolean 0xCD20_7280_D59C_FAEE_u64 None,
}

#[test]
fn test_wrapper_lookup() {
    use strum::IntoEnumIterator;
    for kind in PrimKind::iter() {
        let class = wrapper_class(kind);
        assert_eq!(wrapped_kind(class.name), Some(kind));
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].kind, kind);
        assert_eq!(array_class(kind).name, kind.array_class_name());
    }
    assert_eq!(DOUBLE.name, "java.lang.Double");
    assert_eq!(DOUBLE.suid, -9172774392245257468);
    assert_eq!(NUMBER.suid, -8742448824652078965);
    assert!(BOOLEAN.super_class.is_none());
    assert_eq!(wrapped_kind("java.lang.Number"), None);
    assert_eq!(wrapped_kind("java.lang.String"), None);
}
