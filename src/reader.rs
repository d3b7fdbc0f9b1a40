use {
    crate::{
        classes::{VALUE_FIELD, wrapped_kind},
        prim::{PrimArray, PrimKind, PrimValue},
        stream::{
            BASE_HANDLE, SC_BLOCK_DATA, SC_EXTERNALIZABLE, SC_SERIALIZABLE, SC_WRITE_METHOD,
            STREAM_MAGIC, STREAM_VERSION, TC_ARRAY, TC_BLOCKDATA, TC_BLOCKDATALONG, TC_CLASS,
            TC_CLASSDESC, TC_ENDBLOCKDATA, TC_ENUM, TC_EXCEPTION, TC_LONGSTRING, TC_NULL,
            TC_OBJECT, TC_PROXYCLASSDESC, TC_REFERENCE, TC_RESET, TC_STRING,
            decode_modified_utf8,
        },
    },
    gamedebug_core::per,
    std::{io::Read, rc::Rc},
};

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad stream magic {0:#06x}")]
    BadMagic(u16),
    #[error("Unsupported stream version {0}")]
    BadVersion(u16),
    #[error("Unexpected type code {found:#04x} while reading {context}")]
    UnexpectedTypeCode { found: u8, context: &'static str },
    #[error("Unknown handle {0:#x}")]
    UnknownHandle(u32),
    #[error("Handle {handle:#x} does not refer to a {expected}")]
    HandleKind { handle: u32, expected: &'static str },
    #[error("Invalid field type code {0:#04x}")]
    FieldTypeCode(u8),
    #[error("Class {0:?} is not an array class")]
    NotArrayClass(String),
    #[error("Invalid length {0}")]
    InvalidLength(i64),
    #[error("Malformed modified UTF-8 string")]
    Utf8,
    #[error("Invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),
    #[error("Externalizable class {0} was written without block data")]
    ExternalContents(String),
    #[error("Stream contains a serialized exception")]
    Exception,
    #[error("Reset below the top level of the stream")]
    UnexpectedReset,
    #[error("Contents nested deeper than {0} levels")]
    TooDeep(usize),
}

/// One decoded content item of a stream
#[derive(Debug, Clone)]
pub enum Content {
    Null,
    String(Rc<str>),
    Array(Rc<Array>),
    Object(Rc<Object>),
    /// A `java.lang.Class` object
    Class(Rc<ClassDesc>),
    ClassDesc(Rc<ClassDesc>),
    Enum(Rc<EnumConstant>),
    BlockData(Rc<[u8]>),
    /// Reference to an object whose contents were still being read when it was referenced.
    /// Only occurs in cyclic object graphs.
    BackRef(u32),
}

#[derive(Debug)]
pub struct ClassDesc {
    /// Empty for proxy classes
    pub name: String,
    pub suid: i64,
    pub flags: u8,
    pub fields: Vec<FieldDesc>,
    /// Interface names of a proxy class descriptor
    pub proxy_interfaces: Vec<String>,
    pub annotations: Vec<Content>,
    pub super_class: Option<Rc<ClassDesc>>,
    pub handle: u32,
}

impl ClassDesc {
    pub fn is_proxy(&self) -> bool {
        self.name.is_empty() && !self.proxy_interfaces.is_empty()
    }

    /// This class followed by its superclasses
    pub fn hierarchy(&self) -> impl Iterator<Item = &ClassDesc> {
        std::iter::successors(Some(self), |c| c.super_class.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Prim(PrimKind),
    /// Object or array field with its JVM type signature, e.g. `Ljava/lang/String;`
    Object(String),
}

#[derive(Debug)]
pub enum FieldValue {
    Prim(PrimValue),
    Object(Content),
}

/// Field values and annotations written for one class of an object's hierarchy
#[derive(Debug)]
pub struct ClassData {
    pub class_name: String,
    pub values: Vec<(String, FieldValue)>,
    pub annotations: Vec<Content>,
}

#[derive(Debug)]
pub struct Object {
    pub class_desc: Rc<ClassDesc>,
    /// Ordered from the topmost serializable superclass down to the object's class.
    /// Externalizable objects have a single entry for their own class.
    pub class_data: Vec<ClassData>,
    pub handle: u32,
}

impl Object {
    /// Look up a field by name, searching from the object's own class upwards
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.class_data
            .iter()
            .rev()
            .flat_map(|data| data.values.iter())
            .find_map(|(field, value)| (field == name).then_some(value))
    }
}

#[derive(Debug)]
pub enum ArrayData {
    Prim(PrimArray),
    Objects(Vec<Content>),
}

#[derive(Debug)]
pub struct Array {
    pub class_desc: Rc<ClassDesc>,
    pub data: ArrayData,
    pub handle: u32,
}

#[derive(Debug)]
pub struct EnumConstant {
    pub class_desc: Rc<ClassDesc>,
    pub name: Rc<str>,
    pub handle: u32,
}

impl Content {
    /// The primitive array this content holds, if it is one
    pub fn as_prim_array(&self) -> Option<&PrimArray> {
        match self {
            Self::Array(arr) => match &arr.data {
                ArrayData::Prim(prim) => Some(prim),
                ArrayData::Objects(_) => None,
            },
            _ => None,
        }
    }

    /// The primitive value boxed by a `java.lang` wrapper object (`Double`, `Integer`, ...)
    pub fn as_boxed(&self) -> Option<PrimValue> {
        let Self::Object(obj) = self else {
            return None;
        };
        let kind = wrapped_kind(&obj.class_desc.name)?;
        match obj.field(VALUE_FIELD)? {
            FieldValue::Prim(value) if value.kind() == kind => Some(*value),
            _ => None,
        }
    }

    /// Short description of the content's type, for messages
    pub fn type_label(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::String(_) => "string".into(),
            Self::Array(arr) => format!("array {}", arr.class_desc.name),
            Self::Object(obj) => format!("object {}", obj.class_desc.name),
            Self::Class(desc) => format!("class {}", desc.name),
            Self::ClassDesc(desc) => format!("class descriptor {}", desc.name),
            Self::Enum(e) => format!("enum {}", e.class_desc.name),
            Self::BlockData(_) => "block data".into(),
            Self::BackRef(handle) => format!("back reference {handle:#x}"),
        }
    }
}

/// Decodes a Java object serialization stream
pub struct ObjectReader<R: Read> {
    src: R,
    /// Indexed by `handle - BASE_HANDLE`. `None` while the object is still being read.
    handles: Vec<Option<Content>>,
    /// Nesting level of the content being read
    depth: usize,
}

// Stream lengths are not trusted for preallocation
const MAX_PREALLOC: usize = 1 << 16;

/// Nesting limit of contents and class descriptors, so hostile streams can't exhaust the stack
pub const MAX_DEPTH: usize = 512;

impl<R: Read> ObjectReader<R> {
    /// Read and validate the stream header
    pub fn new(mut src: R) -> Result<Self, DecodeError> {
        let magic = read_u16(&mut src)?;
        if magic != STREAM_MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }
        let version = read_u16(&mut src)?;
        if version != STREAM_VERSION {
            return Err(DecodeError::BadVersion(version));
        }
        Ok(Self {
            src,
            handles: Vec::new(),
            depth: 0,
        })
    }

    /// Read the next top level content. Returns `None` at a clean end of stream.
    pub fn read_content(&mut self) -> Result<Option<Content>, DecodeError> {
        loop {
            let mut tc = [0];
            if self.src.read(&mut tc)? == 0 {
                return Ok(None);
            }
            if tc[0] == TC_RESET {
                per!("reset with {} handles", self.handles.len());
                self.handles.clear();
                continue;
            }
            return self.content_for(tc[0]).map(Some);
        }
    }

    /// Read every remaining top level content
    pub fn read_all(&mut self) -> Result<Vec<Content>, DecodeError> {
        let mut contents = Vec::new();
        while let Some(content) = self.read_content()? {
            contents.push(content);
        }
        Ok(contents)
    }

    fn read_tc(&mut self) -> Result<u8, DecodeError> {
        let mut tc = [0];
        self.src.read_exact(&mut tc)?;
        Ok(tc[0])
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_DEPTH`]
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn content_for(&mut self, tc: u8) -> Result<Content, DecodeError> {
        self.nested(|r| r.read_content_body(tc))
    }

    fn read_content_body(&mut self, tc: u8) -> Result<Content, DecodeError> {
        match tc {
            TC_NULL => Ok(Content::Null),
            TC_REFERENCE => {
                let handle = read_u32(&mut self.src)?;
                self.lookup(handle)
            }
            TC_STRING => {
                let len = usize::from(read_u16(&mut self.src)?);
                self.read_string_body(len)
            }
            TC_LONGSTRING => {
                let len = read_i64(&mut self.src)?;
                let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
                self.read_string_body(len)
            }
            TC_CLASSDESC | TC_PROXYCLASSDESC => {
                let desc = self.class_desc_for(tc)?;
                Ok(Content::ClassDesc(desc))
            }
            TC_ARRAY => self.read_array(),
            TC_OBJECT => self.read_object(),
            TC_CLASS => {
                let desc = self.read_class_desc_required("class")?;
                let content = Content::Class(desc);
                self.push_handle(content.clone());
                Ok(content)
            }
            TC_ENUM => self.read_enum(),
            TC_BLOCKDATA => {
                let mut len = [0];
                self.src.read_exact(&mut len)?;
                self.read_block(usize::from(len[0]))
            }
            TC_BLOCKDATALONG => {
                let len = read_i32(&mut self.src)?;
                let len =
                    usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len.into()))?;
                self.read_block(len)
            }
            TC_EXCEPTION => Err(DecodeError::Exception),
            // Only valid between top level contents, handled by `read_content`
            TC_RESET => Err(DecodeError::UnexpectedReset),
            found => Err(DecodeError::UnexpectedTypeCode {
                found,
                context: "content",
            }),
        }
    }

    fn reserve_handle(&mut self) -> u32 {
        self.handles.push(None);
        handle_at(self.handles.len() - 1)
    }

    fn fill_handle(&mut self, handle: u32, content: Content) {
        if let Some(slot) = self.handles.get_mut((handle - BASE_HANDLE) as usize) {
            *slot = Some(content);
        }
    }

    fn push_handle(&mut self, content: Content) -> u32 {
        self.handles.push(Some(content));
        handle_at(self.handles.len() - 1)
    }

    fn lookup(&self, handle: u32) -> Result<Content, DecodeError> {
        let slot = handle
            .checked_sub(BASE_HANDLE)
            .and_then(|idx| self.handles.get(idx as usize))
            .ok_or(DecodeError::UnknownHandle(handle))?;
        Ok(slot.clone().unwrap_or(Content::BackRef(handle)))
    }

    fn read_block(&mut self, len: usize) -> Result<Content, DecodeError> {
        let bytes = read_bytes(&mut self.src, len)?;
        Ok(Content::BlockData(bytes.into()))
    }

    fn read_string_body(&mut self, len: usize) -> Result<Content, DecodeError> {
        let bytes = read_bytes(&mut self.src, len)?;
        let s: Rc<str> = decode_modified_utf8(&bytes).ok_or(DecodeError::Utf8)?.into();
        let content = Content::String(s);
        self.push_handle(content.clone());
        Ok(content)
    }

    /// A string object in a position where only a string may appear (field signatures)
    fn read_string_object(&mut self) -> Result<Rc<str>, DecodeError> {
        let tc = self.read_tc()?;
        match tc {
            TC_STRING | TC_LONGSTRING | TC_REFERENCE => match self.content_for(tc)? {
                Content::String(s) => Ok(s),
                _ => Err(DecodeError::UnexpectedTypeCode {
                    found: tc,
                    context: "string",
                }),
            },
            found => Err(DecodeError::UnexpectedTypeCode {
                found,
                context: "string",
            }),
        }
    }

    fn read_utf(&mut self) -> Result<String, DecodeError> {
        let len = usize::from(read_u16(&mut self.src)?);
        let bytes = read_bytes(&mut self.src, len)?;
        decode_modified_utf8(&bytes).ok_or(DecodeError::Utf8)
    }

    /// `classDesc` production: new descriptor, reference, or null
    fn read_class_desc(&mut self) -> Result<Option<Rc<ClassDesc>>, DecodeError> {
        let tc = self.read_tc()?;
        match tc {
            TC_NULL => Ok(None),
            TC_CLASSDESC | TC_PROXYCLASSDESC => self.class_desc_for(tc).map(Some),
            TC_REFERENCE => {
                let handle = read_u32(&mut self.src)?;
                match self.lookup(handle)? {
                    Content::ClassDesc(desc) => Ok(Some(desc)),
                    _ => Err(DecodeError::HandleKind {
                        handle,
                        expected: "class descriptor",
                    }),
                }
            }
            found => Err(DecodeError::UnexpectedTypeCode {
                found,
                context: "class descriptor",
            }),
        }
    }

    fn read_class_desc_required(
        &mut self,
        context: &'static str,
    ) -> Result<Rc<ClassDesc>, DecodeError> {
        self.read_class_desc()?
            .ok_or(DecodeError::UnexpectedTypeCode {
                found: TC_NULL,
                context,
            })
    }

    fn class_desc_for(&mut self, tc: u8) -> Result<Rc<ClassDesc>, DecodeError> {
        self.nested(|r| r.read_class_desc_body(tc))
    }

    fn read_class_desc_body(&mut self, tc: u8) -> Result<Rc<ClassDesc>, DecodeError> {
        let mut desc = if tc == TC_PROXYCLASSDESC {
            self.read_proxy_class_desc_info()?
        } else {
            self.read_class_desc_info()?
        };
        per!("class descriptor {:?} at handle {:#x}", desc.name, desc.handle);
        desc.annotations = self.read_annotations()?;
        desc.super_class = self.read_class_desc()?;
        let desc = Rc::new(desc);
        self.fill_handle(desc.handle, Content::ClassDesc(desc.clone()));
        Ok(desc)
    }

    fn read_class_desc_info(&mut self) -> Result<ClassDesc, DecodeError> {
        let name = self.read_utf()?;
        let suid = read_i64(&mut self.src)?;
        let handle = self.reserve_handle();
        let mut flags = [0];
        self.src.read_exact(&mut flags)?;
        let n_fields = usize::from(read_u16(&mut self.src)?);
        let mut fields = Vec::with_capacity(n_fields);
        for _ in 0..n_fields {
            fields.push(self.read_field_desc()?);
        }
        Ok(ClassDesc {
            name,
            suid,
            flags: flags[0],
            fields,
            proxy_interfaces: Vec::new(),
            annotations: Vec::new(),
            super_class: None,
            handle,
        })
    }

    fn read_proxy_class_desc_info(&mut self) -> Result<ClassDesc, DecodeError> {
        let handle = self.reserve_handle();
        let count = read_i32(&mut self.src)?;
        let count = usize::try_from(count).map_err(|_| DecodeError::InvalidLength(count.into()))?;
        let mut proxy_interfaces = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            proxy_interfaces.push(self.read_utf()?);
        }
        Ok(ClassDesc {
            name: String::new(),
            suid: 0,
            flags: SC_SERIALIZABLE,
            fields: Vec::new(),
            proxy_interfaces,
            annotations: Vec::new(),
            super_class: None,
            handle,
        })
    }

    fn read_field_desc(&mut self) -> Result<FieldDesc, DecodeError> {
        let mut code = [0];
        self.src.read_exact(&mut code)?;
        let name = self.read_utf()?;
        let ty = match code[0] {
            b'L' | b'[' => FieldType::Object(self.read_string_object()?.to_string()),
            other => FieldType::Prim(
                PrimKind::from_type_code(other).ok_or(DecodeError::FieldTypeCode(other))?,
            ),
        };
        Ok(FieldDesc { name, ty })
    }

    /// Contents up to and including `TC_ENDBLOCKDATA`
    fn read_annotations(&mut self) -> Result<Vec<Content>, DecodeError> {
        let mut annotations = Vec::new();
        loop {
            match self.read_tc()? {
                TC_ENDBLOCKDATA => return Ok(annotations),
                tc => annotations.push(self.content_for(tc)?),
            }
        }
    }

    fn read_array(&mut self) -> Result<Content, DecodeError> {
        let class_desc = self.read_class_desc_required("array")?;
        let handle = self.reserve_handle();
        let len = read_i32(&mut self.src)?;
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len.into()))?;
        let elem = class_desc
            .name
            .strip_prefix('[')
            .ok_or_else(|| DecodeError::NotArrayClass(class_desc.name.clone()))?;
        let data = match PrimKind::from_array_class_name(&class_desc.name) {
            Some(kind) => ArrayData::Prim(PrimArray::read_elements(kind, len, &mut self.src)?),
            None if elem.starts_with(['L', '[']) => {
                let mut elems = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    let tc = self.read_tc()?;
                    elems.push(self.content_for(tc)?);
                }
                ArrayData::Objects(elems)
            }
            None => return Err(DecodeError::NotArrayClass(class_desc.name.clone())),
        };
        per!(
            "array {} of {len} elements at handle {handle:#x}",
            class_desc.name
        );
        let content = Content::Array(Rc::new(Array {
            class_desc,
            data,
            handle,
        }));
        self.fill_handle(handle, content.clone());
        Ok(content)
    }

    fn read_enum(&mut self) -> Result<Content, DecodeError> {
        let class_desc = self.read_class_desc_required("enum")?;
        let handle = self.reserve_handle();
        let name = self.read_string_object()?;
        let content = Content::Enum(Rc::new(EnumConstant {
            class_desc,
            name,
            handle,
        }));
        self.fill_handle(handle, content.clone());
        Ok(content)
    }

    fn read_object(&mut self) -> Result<Content, DecodeError> {
        let class_desc = self.read_class_desc_required("object")?;
        let handle = self.reserve_handle();
        // External data is written once, by the object's own class
        let class_data = if class_desc.flags & SC_EXTERNALIZABLE != 0 {
            vec![self.read_external_data(&class_desc)?]
        } else {
            let mut chain: Vec<&ClassDesc> = class_desc.hierarchy().collect();
            chain.reverse();
            chain
                .into_iter()
                .map(|desc| self.read_class_data(desc))
                .collect::<Result<Vec<_>, _>>()?
        };
        let content = Content::Object(Rc::new(Object {
            class_desc,
            class_data,
            handle,
        }));
        self.fill_handle(handle, content.clone());
        Ok(content)
    }

    /// `writeExternal` contents, which must be block data terminated by `TC_ENDBLOCKDATA`
    fn read_external_data(&mut self, desc: &ClassDesc) -> Result<ClassData, DecodeError> {
        if desc.flags & SC_BLOCK_DATA == 0 {
            return Err(DecodeError::ExternalContents(desc.name.clone()));
        }
        Ok(ClassData {
            class_name: desc.name.clone(),
            values: Vec::new(),
            annotations: self.read_annotations()?,
        })
    }

    fn read_class_data(&mut self, desc: &ClassDesc) -> Result<ClassData, DecodeError> {
        let mut data = ClassData {
            class_name: desc.name.clone(),
            values: Vec::with_capacity(desc.fields.len()),
            annotations: Vec::new(),
        };
        if desc.flags & SC_SERIALIZABLE != 0 {
            for field in &desc.fields {
                let value = match &field.ty {
                    FieldType::Prim(kind) => {
                        FieldValue::Prim(PrimValue::read_be(*kind, &mut self.src)?)
                    }
                    FieldType::Object(_) => {
                        let tc = self.read_tc()?;
                        FieldValue::Object(self.content_for(tc)?)
                    }
                };
                data.values.push((field.name.clone(), value));
            }
            if desc.flags & SC_WRITE_METHOD != 0 {
                data.annotations = self.read_annotations()?;
            }
        }
        Ok(data)
    }
}

/// Decode every top level content of a complete stream held in memory
pub fn from_slice(bytes: &[u8]) -> Result<Vec<Content>, DecodeError> {
    ObjectReader::new(bytes)?.read_all()
}

fn handle_at(idx: usize) -> u32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "A stream can't hold more handles than fit between the base and u32::MAX"
    )]
    let idx = idx as u32;
    BASE_HANDLE + idx
}

fn read_bytes<R: Read>(src: &mut R, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::with_capacity(len.min(MAX_PREALLOC));
    let read = src.take(len as u64).read_to_end(&mut buf)?;
    if read != len {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

macro_rules! read_be_fns {
    ($($name:ident => $t:ty,)*) => {
        $(
            fn $name<R: Read>(src: &mut R) -> Result<$t, DecodeError> {
                let mut buf = [0; size_of::<$t>()];
                src.read_exact(&mut buf)?;
                Ok(<$t>::from_be_bytes(buf))
            }
        )*
    };
}

read_be_fns! {
    read_u16 => u16,
    read_u32 => u32,
    read_i32 => i32,
    read_i64 => i64,
}

#[cfg(test)]
use crate::writer::to_vec;

#[test]
#[allow(clippy::unwrap_used)]
fn test_reads_back_prim_arrays() {
    let arrays = [
        PrimArray::Double(vec![f64::MIN_POSITIVE, -0.0, f64::INFINITY]),
        PrimArray::Char(vec![0xFFFF, 0, b'a'.into()]),
        PrimArray::Long(vec![]),
    ];
    let bytes = to_vec(|w| arrays.iter().try_for_each(|arr| w.write_prim_array(arr))).unwrap();
    let contents = from_slice(&bytes).unwrap();
    assert_eq!(contents.len(), 3);
    for (content, arr) in contents.iter().zip(&arrays) {
        assert_eq!(content.as_prim_array(), Some(arr));
    }
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_reads_boxed_with_superclass_chain() {
    let bytes = to_vec(|w| {
        w.write_boxed(PrimValue::Int(-5))?;
        w.write_boxed(PrimValue::Int(6))?;
        w.write_boxed(PrimValue::Boolean(true))
    })
    .unwrap();
    let contents = from_slice(&bytes).unwrap();
    assert_eq!(contents[0].as_boxed(), Some(PrimValue::Int(-5)));
    assert_eq!(contents[1].as_boxed(), Some(PrimValue::Int(6)));
    assert_eq!(contents[2].as_boxed(), Some(PrimValue::Boolean(true)));
    let Content::Object(obj) = &contents[0] else {
        panic!("expected object, got {}", contents[0].type_label());
    };
    let names: Vec<_> = obj.class_desc.hierarchy().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["java.lang.Integer", "java.lang.Number"]);
    assert_eq!(obj.class_data[0].class_name, "java.lang.Number");
    assert_eq!(obj.handle, BASE_HANDLE + 2);
}

#[test]
fn test_rejects_bad_header() {
    assert!(matches!(
        from_slice(&[0xCA, 0xFE, 0x00, 0x05]),
        Err(DecodeError::BadMagic(0xCAFE))
    ));
    assert!(matches!(
        from_slice(&[0xAC, 0xED, 0x00, 0x04]),
        Err(DecodeError::BadVersion(4))
    ));
    assert!(matches!(from_slice(&[0xAC]), Err(DecodeError::Io(_))));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_truncated_array_is_an_error() {
    let mut bytes = to_vec(|w| w.write_prim_array(&PrimArray::Int(vec![1, 2, 3]))).unwrap();
    bytes.truncate(bytes.len() - 2);
    let err = from_slice(&bytes).unwrap_err();
    assert!(
        matches!(&err, DecodeError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof),
        "{err}"
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_object_with_string_field_and_annotations() {
    // class Point implements Serializable { int x; String label; } with a writeObject method
    // that appends a block of 2 bytes
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, TC_OBJECT, TC_CLASSDESC, 0x00, 0x05];
    bytes.extend_from_slice(b"Point");
    bytes.extend_from_slice(&42i64.to_be_bytes());
    bytes.extend_from_slice(&[SC_SERIALIZABLE | SC_WRITE_METHOD, 0x00, 0x02]);
    bytes.extend_from_slice(&[b'I', 0x00, 0x01, b'x']);
    bytes.extend_from_slice(&[b'L', 0x00, 0x05]);
    bytes.extend_from_slice(b"label");
    bytes.extend_from_slice(&[TC_STRING, 0x00, 0x12]);
    bytes.extend_from_slice(b"Ljava/lang/String;");
    bytes.extend_from_slice(&[TC_ENDBLOCKDATA, TC_NULL]);
    // class data: x = 7, label = "p", then the writeObject block
    bytes.extend_from_slice(&7i32.to_be_bytes());
    bytes.extend_from_slice(&[TC_STRING, 0x00, 0x01, b'p']);
    bytes.extend_from_slice(&[TC_BLOCKDATA, 0x02, 0xAB, 0xCD, TC_ENDBLOCKDATA]);
    // the label again, by reference: desc 0x7E0000, signature 0x7E0001, object 0x7E0002,
    // "p" 0x7E0003
    bytes.extend_from_slice(&[TC_REFERENCE, 0x00, 0x7E, 0x00, 0x03]);

    let contents = from_slice(&bytes).unwrap();
    assert_eq!(contents.len(), 2);
    let Content::Object(obj) = &contents[0] else {
        panic!("expected object, got {}", contents[0].type_label());
    };
    assert_eq!(obj.class_desc.suid, 42);
    assert_eq!(
        obj.class_desc.fields[1].ty,
        FieldType::Object("Ljava/lang/String;".into())
    );
    assert!(matches!(
        obj.field("x"),
        Some(FieldValue::Prim(PrimValue::Int(7)))
    ));
    assert!(matches!(
        obj.field("label"),
        Some(FieldValue::Object(Content::String(s))) if &**s == "p"
    ));
    assert!(matches!(
        obj.class_data[0].annotations.as_slice(),
        [Content::BlockData(b)] if **b == [0xAB, 0xCD]
    ));
    assert!(matches!(&contents[1], Content::String(s) if &**s == "p"));
    assert_eq!(contents[0].as_boxed(), None);
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_object_array_and_self_reference() {
    // Object[] holding null and itself
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, TC_ARRAY, TC_CLASSDESC, 0x00, 0x13];
    bytes.extend_from_slice(b"[Ljava.lang.Object;");
    bytes.extend_from_slice(&[0x90, 0xCE, 0x58, 0x9F, 0x10, 0x73, 0x29, 0x6C]);
    bytes.extend_from_slice(&[SC_SERIALIZABLE, 0x00, 0x00, TC_ENDBLOCKDATA, TC_NULL]);
    bytes.extend_from_slice(&2i32.to_be_bytes());
    bytes.extend_from_slice(&[TC_NULL, TC_REFERENCE, 0x00, 0x7E, 0x00, 0x01]);

    let contents = from_slice(&bytes).unwrap();
    let Content::Array(arr) = &contents[0] else {
        panic!("expected array, got {}", contents[0].type_label());
    };
    assert!(matches!(
        &arr.data,
        ArrayData::Objects(elems)
            if matches!(elems.as_slice(), [Content::Null, Content::BackRef(0x7E_0001)])
    ));
}

#[test]
fn test_reference_to_unknown_handle() {
    let bytes = [0xAC, 0xED, 0x00, 0x05, TC_REFERENCE, 0x00, 0x7E, 0x00, 0x09];
    assert!(matches!(
        from_slice(&bytes),
        Err(DecodeError::UnknownHandle(0x7E_0009))
    ));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_reset_clears_handles() {
    let bytes = [
        0xAC, 0xED, 0x00, 0x05, TC_STRING, 0x00, 0x01, b'a', TC_RESET, TC_REFERENCE, 0x00, 0x7E,
        0x00, 0x00,
    ];
    let mut reader = ObjectReader::new(bytes.as_slice()).unwrap();
    assert!(matches!(reader.read_content(), Ok(Some(Content::String(_)))));
    assert!(matches!(
        reader.read_content(),
        Err(DecodeError::UnknownHandle(0x7E_0000))
    ));
}

#[test]
fn test_enum_and_class_contents() {
    // enum constant Color.RED, then Color.class referring to the same descriptor
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, TC_ENUM, TC_CLASSDESC, 0x00, 0x05];
    bytes.extend_from_slice(b"Color");
    bytes.extend_from_slice(&0i64.to_be_bytes());
    bytes.extend_from_slice(&[0x12, 0x00, 0x00, TC_ENDBLOCKDATA, TC_NULL]);
    bytes.extend_from_slice(&[TC_STRING, 0x00, 0x03]);
    bytes.extend_from_slice(b"RED");
    bytes.extend_from_slice(&[TC_CLASS, TC_REFERENCE, 0x00, 0x7E, 0x00, 0x00]);
    let contents = from_slice(&bytes);
    assert!(
        matches!(contents.as_deref(), Ok([Content::Enum(e), Content::Class(c)])
            if &*e.name == "RED" && c.name == "Color" && e.handle == 0x7E_0001)
    );
}

/// A class descriptor without fields or annotations, up to its superclass
#[cfg(test)]
#[allow(clippy::unwrap_used)]
fn class_desc_bytes(name: &str, flags: u8) -> Vec<u8> {
    let mut bytes = vec![TC_CLASSDESC];
    bytes.extend_from_slice(&u16::try_from(name.len()).unwrap().to_be_bytes());
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(&0i64.to_be_bytes());
    bytes.extend_from_slice(&[flags, 0x00, 0x00, TC_ENDBLOCKDATA]);
    bytes
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_externalizable_data_is_read_once_for_the_hierarchy() {
    // class B extends A, A implements Externalizable
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, TC_OBJECT];
    bytes.extend(class_desc_bytes("B", SC_EXTERNALIZABLE | SC_BLOCK_DATA));
    bytes.extend(class_desc_bytes("A", SC_EXTERNALIZABLE | SC_BLOCK_DATA));
    bytes.push(TC_NULL);
    bytes.extend_from_slice(&[TC_BLOCKDATA, 0x01, 0x2A, TC_ENDBLOCKDATA]);
    let contents = from_slice(&bytes).unwrap();
    let [Content::Object(obj)] = contents.as_slice() else {
        panic!("expected one object, got {contents:?}");
    };
    assert_eq!(obj.handle, BASE_HANDLE + 2);
    assert_eq!(obj.class_data.len(), 1);
    assert_eq!(obj.class_data[0].class_name, "B");
    assert!(matches!(
        obj.class_data[0].annotations.as_slice(),
        [Content::BlockData(block)] if **block == [0x2A]
    ));
}

#[test]
fn test_externalizable_without_block_data_is_rejected() {
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, TC_OBJECT];
    bytes.extend(class_desc_bytes("Old", SC_EXTERNALIZABLE));
    bytes.push(TC_NULL);
    assert!(matches!(
        from_slice(&bytes),
        Err(DecodeError::ExternalContents(name)) if name == "Old"
    ));
}

#[test]
fn test_nested_reset_is_rejected() {
    // class A whose annotation contains a reset, then a reference to the first handle
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05];
    let mut desc = class_desc_bytes("A", SC_SERIALIZABLE);
    desc.pop();
    bytes.extend(desc);
    bytes.extend_from_slice(&[TC_RESET, TC_STRING, 0x00, 0x01, b'x', TC_ENDBLOCKDATA, TC_NULL]);
    bytes.extend_from_slice(&[TC_REFERENCE, 0x00, 0x7E, 0x00, 0x00]);
    assert!(matches!(
        from_slice(&bytes),
        Err(DecodeError::UnexpectedReset)
    ));
}

/// Decode on a thread with the stack size of a main thread, like `dump` and `verify` do
#[cfg(test)]
#[allow(clippy::unwrap_used)]
fn decode_on_main_sized_stack(bytes: Vec<u8>) -> Result<usize, DecodeError> {
    std::thread::Builder::new()
        .stack_size(8 << 20)
        .spawn(move || from_slice(&bytes).map(|contents| contents.len()))
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_deep_superclass_chain_is_rejected() {
    let chain = |depth: usize| {
        let mut bytes = vec![0xAC, 0xED, 0x00, 0x05];
        for i in 0..depth {
            bytes.extend(class_desc_bytes(&format!("C{i}"), SC_SERIALIZABLE));
        }
        bytes.push(TC_NULL);
        bytes
    };
    assert!(matches!(decode_on_main_sized_stack(chain(100)), Ok(1)));
    assert!(matches!(
        decode_on_main_sized_stack(chain(200_000)),
        Err(DecodeError::TooDeep(MAX_DEPTH))
    ));
}

#[test]
fn test_deeply_nested_arrays_are_rejected() {
    // Object[] holding an Object[] holding an Object[] ...
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, TC_ARRAY];
    bytes.extend(class_desc_bytes("[Ljava.lang.Object;", SC_SERIALIZABLE));
    bytes.push(TC_NULL);
    bytes.extend_from_slice(&1i32.to_be_bytes());
    for _ in 0..100_000 {
        bytes.extend_from_slice(&[TC_ARRAY, TC_REFERENCE, 0x00, 0x7E, 0x00, 0x00]);
        bytes.extend_from_slice(&1i32.to_be_bytes());
    }
    bytes.push(TC_NULL);
    assert!(matches!(
        decode_on_main_sized_stack(bytes),
        Err(DecodeError::TooDeep(MAX_DEPTH))
    ));
}
