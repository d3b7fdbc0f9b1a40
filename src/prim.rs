use {
    crate::reader::DecodeError,
    num_traits::ToBytes,
    std::io::{Read, Write},
    strum::EnumIter,
};

/// Element kind of a Java primitive array or boxed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum PrimKind {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl PrimKind {
    /// Field descriptor type code (`B`, `C`, `D`, ...)
    pub const fn type_code(self) -> u8 {
        match self {
            Self::Byte => b'B',
            Self::Char => b'C',
            Self::Double => b'D',
            Self::Float => b'F',
            Self::Int => b'I',
            Self::Long => b'J',
            Self::Short => b'S',
            Self::Boolean => b'Z',
        }
    }

    pub const fn from_type_code(code: u8) -> Option<Self> {
        Some(match code {
            b'B' => Self::Byte,
            b'C' => Self::Char,
            b'D' => Self::Double,
            b'F' => Self::Float,
            b'I' => Self::Int,
            b'J' => Self::Long,
            b'S' => Self::Short,
            b'Z' => Self::Boolean,
            _ => return None,
        })
    }

    /// Encoded size of one element in bytes
    pub const fn byte_len(self) -> usize {
        match self {
            Self::Byte | Self::Boolean => 1,
            Self::Char | Self::Short => 2,
            Self::Float | Self::Int => 4,
            Self::Double | Self::Long => 8,
        }
    }

    /// Java keyword for the kind
    pub const fn label(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
        }
    }

    /// Class name of the one dimensional array of this kind, e.g. `[D`
    pub const fn array_class_name(self) -> &'static str {
        match self {
            Self::Byte => "[B",
            Self::Char => "[C",
            Self::Double => "[D",
            Self::Float => "[F",
            Self::Int => "[I",
            Self::Long => "[J",
            Self::Short => "[S",
            Self::Boolean => "[Z",
        }
    }

    /// serialVersionUID the JVM computes for the array class
    #[expect(clippy::cast_possible_wrap, reason = "UIDs are signed 64 bit values")]
    pub const fn array_suid(self) -> i64 {
        match self {
            Self::Byte => 0xACF3_17F8_0608_54E0_u64 as i64,
            Self::Char => 0xB026_66B0_E25D_84AC_u64 as i64,
            Self::Double => 0x3EA6_8C14_AB63_5A1E,
            Self::Float => 0x0B9C_8189_22E0_0C42,
            Self::Int => 0x4DBA_6026_76EA_B2A5,
            Self::Long => 0x7820_04B5_12B1_7593,
            Self::Short => 0xEF83_2E06_E55D_B0FA_u64 as i64,
            Self::Boolean => 0x578F_2039_14B8_5DE2,
        }
    }

    /// Kind of a one dimensional primitive array class name
    pub fn from_array_class_name(name: &str) -> Option<Self> {
        match name.as_bytes() {
            [b'[', code] => Self::from_type_code(*code),
            _ => None,
        }
    }
}

/// A single primitive value
#[derive(Debug, Clone, Copy)]
pub enum PrimValue {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
}

impl PrimValue {
    pub const fn kind(&self) -> PrimKind {
        match self {
            Self::Byte(_) => PrimKind::Byte,
            Self::Char(_) => PrimKind::Char,
            Self::Double(_) => PrimKind::Double,
            Self::Float(_) => PrimKind::Float,
            Self::Int(_) => PrimKind::Int,
            Self::Long(_) => PrimKind::Long,
            Self::Short(_) => PrimKind::Short,
            Self::Boolean(_) => PrimKind::Boolean,
        }
    }

    pub fn write_be<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        match *self {
            Self::Byte(v) => v.write_be(w),
            Self::Char(v) => v.write_be(w),
            Self::Double(v) => v.write_be(w),
            Self::Float(v) => v.write_be(w),
            Self::Int(v) => v.write_be(w),
            Self::Long(v) => v.write_be(w),
            Self::Short(v) => v.write_be(w),
            Self::Boolean(v) => v.write_be(w),
        }
    }

    pub fn read_be<R: Read>(kind: PrimKind, r: &mut R) -> Result<Self, DecodeError> {
        Ok(match kind {
            PrimKind::Byte => Self::Byte(JavaPrimitive::read_be(r)?),
            PrimKind::Char => Self::Char(JavaPrimitive::read_be(r)?),
            PrimKind::Double => Self::Double(JavaPrimitive::read_be(r)?),
            PrimKind::Float => Self::Float(JavaPrimitive::read_be(r)?),
            PrimKind::Int => Self::Int(JavaPrimitive::read_be(r)?),
            PrimKind::Long => Self::Long(JavaPrimitive::read_be(r)?),
            PrimKind::Short => Self::Short(JavaPrimitive::read_be(r)?),
            PrimKind::Boolean => Self::Boolean(JavaPrimitive::read_be(r)?),
        })
    }
}

/// Values compare by bit pattern, so `-0.0 != 0.0` and equal NaNs are equal
impl PartialEq for PrimValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for PrimValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Byte(v) => v.fmt(f),
            Self::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) if !c.is_control() => write!(f, "{c:?}"),
                _ => write!(f, "'\\u{v:04x}'"),
            },
            // Debug keeps the fraction and prints extremes in exponent form
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Int(v) => v.fmt(f),
            Self::Long(v) => v.fmt(f),
            Self::Short(v) => v.fmt(f),
            Self::Boolean(v) => v.fmt(f),
        }
    }
}

/// A homogeneous array of Java primitives
#[derive(Debug, Clone)]
pub enum PrimArray {
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Double(Vec<f64>),
    Float(Vec<f32>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Short(Vec<i16>),
    Boolean(Vec<bool>),
}

macro_rules! each_array {
    ($self:expr, $v:ident => $e:expr) => {
        match $self {
            PrimArray::Byte($v) => $e,
            PrimArray::Char($v) => $e,
            PrimArray::Double($v) => $e,
            PrimArray::Float($v) => $e,
            PrimArray::Int($v) => $e,
            PrimArray::Long($v) => $e,
            PrimArray::Short($v) => $e,
            PrimArray::Boolean($v) => $e,
        }
    };
}

impl PrimArray {
    pub const fn kind(&self) -> PrimKind {
        match self {
            Self::Byte(_) => PrimKind::Byte,
            Self::Char(_) => PrimKind::Char,
            Self::Double(_) => PrimKind::Double,
            Self::Float(_) => PrimKind::Float,
            Self::Int(_) => PrimKind::Int,
            Self::Long(_) => PrimKind::Long,
            Self::Short(_) => PrimKind::Short,
            Self::Boolean(_) => PrimKind::Boolean,
        }
    }

    pub fn len(&self) -> usize {
        each_array!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An array of `len` default (zero/false) values, like `new double[len]`
    pub fn zeroed(kind: PrimKind, len: usize) -> Self {
        match kind {
            PrimKind::Byte => Self::Byte(vec![0; len]),
            PrimKind::Char => Self::Char(vec![0; len]),
            PrimKind::Double => Self::Double(vec![0.0; len]),
            PrimKind::Float => Self::Float(vec![0.0; len]),
            PrimKind::Int => Self::Int(vec![0; len]),
            PrimKind::Long => Self::Long(vec![0; len]),
            PrimKind::Short => Self::Short(vec![0; len]),
            PrimKind::Boolean => Self::Boolean(vec![false; len]),
        }
    }

    pub fn get(&self, idx: usize) -> Option<PrimValue> {
        Some(match self {
            Self::Byte(v) => PrimValue::Byte(*v.get(idx)?),
            Self::Char(v) => PrimValue::Char(*v.get(idx)?),
            Self::Double(v) => PrimValue::Double(*v.get(idx)?),
            Self::Float(v) => PrimValue::Float(*v.get(idx)?),
            Self::Int(v) => PrimValue::Int(*v.get(idx)?),
            Self::Long(v) => PrimValue::Long(*v.get(idx)?),
            Self::Short(v) => PrimValue::Short(*v.get(idx)?),
            Self::Boolean(v) => PrimValue::Boolean(*v.get(idx)?),
        })
    }

    pub fn values(&self) -> impl Iterator<Item = PrimValue> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Index of the first element that differs from `other`, or the shorter length
    /// when one is a prefix of the other. `None` if both are equal.
    pub fn first_difference(&self, other: &Self) -> Option<usize> {
        let common = self.len().min(other.len());
        (0..common)
            .find(|&i| self.get(i) != other.get(i))
            .or((self.len() != other.len()).then_some(common))
    }

    /// Write the elements (without length prefix) in big endian
    pub fn write_elements<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        match self {
            Self::Byte(v) => write_all_be(w, v),
            Self::Char(v) => write_all_be(w, v),
            Self::Int(v) => write_all_be(w, v),
            Self::Long(v) => write_all_be(w, v),
            Self::Short(v) => write_all_be(w, v),
            Self::Double(v) => v.iter().try_for_each(|d| d.write_be(w)),
            Self::Float(v) => v.iter().try_for_each(|f| f.write_be(w)),
            Self::Boolean(v) => v.iter().try_for_each(|b| b.write_be(w)),
        }
    }

    /// Read `len` big endian elements of `kind`
    pub fn read_elements<R: Read>(
        kind: PrimKind,
        len: usize,
        r: &mut R,
    ) -> Result<Self, DecodeError> {
        fn read_n<T: JavaPrimitive, R: Read>(
            len: usize,
            cap: usize,
            r: &mut R,
        ) -> Result<Vec<T>, DecodeError> {
            let mut v = Vec::with_capacity(cap);
            for _ in 0..len {
                v.push(T::read_be(r)?);
            }
            Ok(v)
        }
        // Length comes from the stream, don't trust it for preallocation
        let cap = len.min(MAX_PREALLOC_BYTES / kind.byte_len());
        Ok(match kind {
            PrimKind::Byte => Self::Byte(read_n(len, cap, r)?),
            PrimKind::Char => Self::Char(read_n(len, cap, r)?),
            PrimKind::Double => Self::Double(read_n(len, cap, r)?),
            PrimKind::Float => Self::Float(read_n(len, cap, r)?),
            PrimKind::Int => Self::Int(read_n(len, cap, r)?),
            PrimKind::Long => Self::Long(read_n(len, cap, r)?),
            PrimKind::Short => Self::Short(read_n(len, cap, r)?),
            PrimKind::Boolean => Self::Boolean(read_n(len, cap, r)?),
        })
    }
}

const MAX_PREALLOC_BYTES: usize = 1 << 19;

/// Arrays compare element-wise with [`PrimValue`] semantics
impl PartialEq for PrimArray {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.first_difference(other).is_none()
    }
}

fn write_all_be<W: Write, T: ToBytes>(w: &mut W, items: &[T]) -> std::io::Result<()> {
    for item in items {
        w.write_all(item.to_be_bytes().as_ref())?;
    }
    Ok(())
}

/// A Rust type that maps onto one Java primitive type
pub trait JavaPrimitive: Copy + Sized {
    fn write_be<W: Write>(self, w: &mut W) -> std::io::Result<()>;
    fn read_be<R: Read>(r: &mut R) -> Result<Self, DecodeError>;
}

macro_rules! impl_java_prim {
    ($($prim:ident)*) => {
        $(
            impl JavaPrimitive for $prim {
                fn write_be<W: Write>(self, w: &mut W) -> std::io::Result<()> {
                    w.write_all(&self.to_be_bytes())
                }

                fn read_be<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
                    let mut buf = [0; size_of::<$prim>()];
                    r.read_exact(&mut buf)?;
                    Ok($prim::from_be_bytes(buf))
                }
            }
        )*
    }
}

// u32 and u64 carry the raw bits of f32 and f64
impl_java_prim!(i8 u16 i16 i32 i64 u32 u64);

// Java writes floats through `floatToIntBits`/`doubleToLongBits`, which collapse every NaN
// into one canonical pattern
const CANONICAL_NAN_F32: u32 = 0x7FC0_0000;
const CANONICAL_NAN_F64: u64 = 0x7FF8_0000_0000_0000;

impl JavaPrimitive for f32 {
    fn write_be<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        let bits = if self.is_nan() {
            CANONICAL_NAN_F32
        } else {
            self.to_bits()
        };
        w.write_all(&bits.to_be_bytes())
    }

    fn read_be<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        Ok(f32::from_bits(u32::read_be(r)?))
    }
}

impl JavaPrimitive for f64 {
    fn write_be<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        let bits = if self.is_nan() {
            CANONICAL_NAN_F64
        } else {
            self.to_bits()
        };
        w.write_all(&bits.to_be_bytes())
    }

    fn read_be<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        Ok(f64::from_bits(u64::read_be(r)?))
    }
}

impl JavaPrimitive for bool {
    fn write_be<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&[u8::from(self)])
    }

    fn read_be<R: Read>(r: &mut R) -> Result<Self, DecodeError> {
        let mut buf = [0];
        r.read_exact(&mut buf)?;
        match buf[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBoolean(other)),
        }
    }
}

#[test]
fn test_type_codes_round_trip() {
    use strum::IntoEnumIterator;
    for kind in PrimKind::iter() {
        assert_eq!(PrimKind::from_type_code(kind.type_code()), Some(kind));
        assert_eq!(
            PrimKind::from_array_class_name(kind.array_class_name()),
            Some(kind)
        );
        assert_eq!(PrimArray::zeroed(kind, 3).kind(), kind);
    }
    assert_eq!(PrimKind::from_type_code(b'L'), None);
    assert_eq!(PrimKind::from_array_class_name("[Ljava.lang.String;"), None);
    assert_eq!(PrimKind::from_array_class_name("[[I"), None);
}

#[test]
fn test_array_equality_is_bitwise() {
    assert_ne!(PrimArray::Double(vec![0.0]), PrimArray::Double(vec![-0.0]));
    assert_eq!(
        PrimArray::Float(vec![f32::NAN]),
        PrimArray::Float(vec![f32::NAN])
    );
    assert_ne!(PrimArray::Int(vec![]), PrimArray::Long(vec![]));
    assert_eq!(PrimArray::zeroed(PrimKind::Short, 2), PrimArray::Short(vec![0, 0]));
}

#[test]
fn test_first_difference() {
    let a = PrimArray::Long(vec![1, 2, 3]);
    assert_eq!(a.first_difference(&PrimArray::Long(vec![1, 2, 3])), None);
    assert_eq!(a.first_difference(&PrimArray::Long(vec![1, 5, 3])), Some(1));
    assert_eq!(a.first_difference(&PrimArray::Long(vec![1, 2])), Some(2));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_element_encoding_is_big_endian() {
    let mut buf = Vec::new();
    PrimArray::Short(vec![0x0102, -1])
        .write_elements(&mut buf)
        .unwrap();
    assert_eq!(buf, [0x01, 0x02, 0xFF, 0xFF]);
    buf.clear();
    PrimArray::Double(vec![f64::from_bits(0x7FF8_0000_0000_0001)])
        .write_elements(&mut buf)
        .unwrap();
    assert_eq!(buf, [0x7F, 0xF8, 0, 0, 0, 0, 0, 0]);
    buf.clear();
    PrimArray::Boolean(vec![true, false])
        .write_elements(&mut buf)
        .unwrap();
    assert_eq!(buf, [1, 0]);
}

#[test]
fn test_read_rejects_bad_boolean() {
    let mut src: &[u8] = &[1, 2];
    let err = PrimArray::read_elements(PrimKind::Boolean, 2, &mut src);
    assert!(matches!(err, Err(DecodeError::InvalidBoolean(2))));
}
