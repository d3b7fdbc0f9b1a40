use {
    crate::{
        classes::{ClassSpec, array_class, wrapper_class},
        prim::{PrimArray, PrimValue},
        stream::{
            BASE_HANDLE, STREAM_MAGIC, STREAM_VERSION, TC_ARRAY, TC_CLASSDESC, TC_ENDBLOCKDATA,
            TC_NULL, TC_OBJECT, TC_REFERENCE, encode_modified_utf8,
        },
    },
    std::{
        collections::HashMap,
        io::{self, Write},
    },
};

/// Writes a Java object serialization stream, byte compatible with `ObjectOutputStream`
/// for the content it supports.
///
/// Handles are assigned in the same order the JVM assigns them, so class descriptors
/// written more than once are replaced by `TC_REFERENCE`s.
pub struct ObjectWriter<W: Write> {
    out: W,
    next_handle: u32,
    class_handles: HashMap<&'static str, u32>,
}

impl<W: Write> ObjectWriter<W> {
    /// Write the stream header and return a writer positioned for the first content
    pub fn new(mut out: W) -> io::Result<Self> {
        out.write_all(&STREAM_MAGIC.to_be_bytes())?;
        out.write_all(&STREAM_VERSION.to_be_bytes())?;
        Ok(Self {
            out,
            next_handle: BASE_HANDLE,
            class_handles: HashMap::new(),
        })
    }

    pub fn write_null(&mut self) -> io::Result<()> {
        self.out.write_all(&[TC_NULL])
    }

    /// Write `arr` as a `TC_ARRAY` of its primitive array class
    pub fn write_prim_array(&mut self, arr: &PrimArray) -> io::Result<()> {
        self.out.write_all(&[TC_ARRAY])?;
        self.write_class_desc(array_class(arr.kind()))?;
        self.assign_handle();
        let len = i32::try_from(arr.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("array of {} elements is too long for a Java array", arr.len()),
            )
        })?;
        self.out.write_all(&len.to_be_bytes())?;
        arr.write_elements(&mut self.out)
    }

    /// Write `value` boxed in its `java.lang` wrapper class, like `writeObject(Double.valueOf(v))`
    pub fn write_boxed(&mut self, value: PrimValue) -> io::Result<()> {
        let class = wrapper_class(value.kind());
        self.out.write_all(&[TC_OBJECT])?;
        self.write_class_desc(class)?;
        self.assign_handle();
        // Class data goes from the topmost superclass down. The superclasses of the wrappers
        // (`Number`) have no fields, so only the `value` field of the wrapper itself remains.
        value.write_be(&mut self.out)
    }

    /// Flush and give back the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn assign_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn write_reference(&mut self, handle: u32) -> io::Result<()> {
        self.out.write_all(&[TC_REFERENCE])?;
        self.out.write_all(&handle.to_be_bytes())
    }

    fn write_class_desc(&mut self, class: &'static ClassSpec) -> io::Result<()> {
        if let Some(&handle) = self.class_handles.get(class.name) {
            return self.write_reference(handle);
        }
        self.out.write_all(&[TC_CLASSDESC])?;
        self.write_utf(class.name)?;
        self.out.write_all(&class.suid.to_be_bytes())?;
        // The descriptor is registered before its fields and superclass are written
        let handle = self.assign_handle();
        self.class_handles.insert(class.name, handle);
        self.out.write_all(&[class.flags])?;
        let n_fields = u16::try_from(class.fields.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many fields"))?;
        self.out.write_all(&n_fields.to_be_bytes())?;
        for field in class.fields {
            self.out.write_all(&[field.kind.type_code()])?;
            self.write_utf(field.name)?;
        }
        // `annotateClass` writes nothing
        self.out.write_all(&[TC_ENDBLOCKDATA])?;
        match class.super_class {
            Some(sup) => self.write_class_desc(sup),
            None => self.write_null(),
        }
    }

    /// `writeUTF`: u16 length and modified UTF-8, for names that must fit a short length
    fn write_utf(&mut self, s: &str) -> io::Result<()> {
        let utf = encode_modified_utf8(s);
        let len = u16::try_from(utf.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "UTF string too long"))?;
        self.out.write_all(&len.to_be_bytes())?;
        self.out.write_all(&utf)
    }
}

/// Encode a single top level content into a complete stream
pub fn to_vec(
    f: impl FnOnce(&mut ObjectWriter<Vec<u8>>) -> io::Result<()>,
) -> io::Result<Vec<u8>> {
    let mut writer = ObjectWriter::new(Vec::new())?;
    f(&mut writer)?;
    writer.finish()
}

#[cfg(test)]
const DOUBLE_ARRAY_PREFIX: [u8; 27] = [
    0xAC, 0xED, 0x00, 0x05, // magic, version
    0x75, 0x72, // TC_ARRAY TC_CLASSDESC
    0x00, 0x02, b'[', b'D', // class name
    0x3E, 0xA6, 0x8C, 0x14, 0xAB, 0x63, 0x5A, 0x1E, // serialVersionUID
    0x02, 0x00, 0x00, // SC_SERIALIZABLE, no fields
    0x78, 0x70, // TC_ENDBLOCKDATA TC_NULL
    0x00, 0x00, 0x00, 0x02, // length
];

#[test]
#[allow(clippy::unwrap_used)]
fn test_double_array_matches_object_output_stream() {
    let bytes = to_vec(|w| w.write_prim_array(&PrimArray::Double(vec![1.0, f64::NEG_INFINITY])))
        .unwrap();
    assert_eq!(bytes[..27], DOUBLE_ARRAY_PREFIX);
    assert_eq!(
        bytes[27..],
        [
            0x3F, 0xF0, 0, 0, 0, 0, 0, 0, //
            0xFF, 0xF0, 0, 0, 0, 0, 0, 0,
        ]
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_empty_array_is_header_and_zero_length() {
    let bytes = to_vec(|w| w.write_prim_array(&PrimArray::Boolean(Vec::new()))).unwrap();
    assert_eq!(bytes.len(), 27);
    assert_eq!(&bytes[6..10], &[0x00, 0x02, b'[', b'Z']);
    assert_eq!(&bytes[23..], &[0, 0, 0, 0]);
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_boxed_double_matches_object_output_stream() {
    let bytes = to_vec(|w| w.write_boxed(PrimValue::Double(10.0))).unwrap();
    let mut expected = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72, 0x00, 0x10];
    expected.extend_from_slice(b"java.lang.Double");
    expected.extend_from_slice(&[0x80, 0xB3, 0xC2, 0x4A, 0x29, 0x6B, 0xFB, 0x04]);
    expected.extend_from_slice(&[0x02, 0x00, 0x01, b'D', 0x00, 0x05]);
    expected.extend_from_slice(b"value");
    expected.extend_from_slice(&[0x78, 0x72, 0x00, 0x10]);
    expected.extend_from_slice(b"java.lang.Number");
    expected.extend_from_slice(&[0x86, 0xAC, 0x95, 0x1D, 0x0B, 0x94, 0xE0, 0x8B]);
    expected.extend_from_slice(&[0x02, 0x00, 0x00, 0x78, 0x70]);
    expected.extend_from_slice(&[0x40, 0x24, 0, 0, 0, 0, 0, 0]);
    assert_eq!(bytes, expected);
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_repeated_class_uses_reference() {
    let bytes = to_vec(|w| {
        w.write_prim_array(&PrimArray::Int(vec![7]))?;
        w.write_prim_array(&PrimArray::Int(vec![]))
    })
    .unwrap();
    // First array: 23 bytes header+desc, 4 length, 4 element
    let second = &bytes[31..];
    // Class descriptor got 0x7E0000, the first array 0x7E0001
    assert_eq!(second, [0x75, 0x71, 0x00, 0x7E, 0x00, 0x00, 0, 0, 0, 0]);
}
