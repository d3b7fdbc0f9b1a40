//! Human readable rendering of serialization streams

use {
    crate::{
        hex_conv::{byte_to_hex_digits, hex_string},
        reader::{ArrayData, ClassDesc, Content, FieldType, FieldValue, ObjectReader},
        stream::flag_names,
        util::human_size,
    },
    anyhow::{Context as _, bail},
    gamedebug_core::per,
    itertools::Itertools as _,
    std::{
        collections::HashSet,
        fmt::{self, Write as _},
        path::Path,
    },
};

/// How `run` presents a file
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Print raw bytes instead of decoding
    pub hex: bool,
    /// Byte offset the stream starts at
    pub seek: usize,
    /// Array elements shown before the rest is elided
    pub max_elements: usize,
}

/// Dump `path` to `out` according to `opts`
pub fn run(
    path: &Path,
    opts: &DumpOptions,
    out: &mut impl std::io::Write,
) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let Some(stream) = bytes.get(opts.seek..) else {
        bail!(
            "Seek offset {:#x} is past the end of {} ({} bytes)",
            opts.seek,
            path.display(),
            bytes.len()
        );
    };
    writeln!(out, "{} ({})", path.display(), human_size(bytes.len() as u64))?;
    if opts.hex {
        write!(
            out,
            "{}",
            HexDump {
                bytes: stream,
                base_offset: opts.seek
            }
        )?;
        return Ok(());
    }
    let mut reader = ObjectReader::new(stream).context("Failed to read stream header")?;
    let mut contents = Vec::new();
    let result = loop {
        match reader.read_content() {
            Ok(Some(content)) => contents.push(content),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    per!("Decoded {} top level contents", contents.len());
    write!(
        out,
        "{}",
        Tree {
            contents: &contents,
            max_elements: opts.max_elements
        }
    )?;
    result.with_context(|| format!("Decoding stopped after {} contents", contents.len()))
}

/// Indented tree of decoded contents.
///
/// Objects and class descriptors are expanded the first time they appear and referred
/// to by handle afterwards.
///
/// `contents` must come from one reader, so shared contents are the same allocation.
pub struct Tree<'a> {
    pub contents: &'a [Content],
    pub max_elements: usize,
}

impl fmt::Display for Tree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut r = Renderer {
            out: f,
            max_elements: self.max_elements,
            seen: HashSet::new(),
        };
        for (i, content) in self.contents.iter().enumerate() {
            r.content(&format!("[{i}] "), content, 0)?;
        }
        Ok(())
    }
}

struct Renderer<'f, 'a> {
    out: &'f mut fmt::Formatter<'a>,
    max_elements: usize,
    /// Addresses of the objects, arrays and descriptors already expanded. Handles can't be
    /// used since a reset makes the stream reuse them.
    seen: HashSet<*const ()>,
}

impl Renderer<'_, '_> {
    fn line(&mut self, depth: usize, args: fmt::Arguments) -> fmt::Result {
        for _ in 0..depth {
            self.out.write_str("  ")?;
        }
        self.out.write_fmt(args)?;
        self.out.write_char('\n')
    }

    /// Whether `item` is rendered for the first time
    fn first_sight<T>(&mut self, item: &T) -> bool {
        self.seen.insert(std::ptr::from_ref(item).cast())
    }

    fn elided(&self, total: usize) -> String {
        match total.checked_sub(self.max_elements) {
            Some(rest) if rest > 0 => format!(" … {rest} more"),
            _ => String::new(),
        }
    }

    fn content(&mut self, prefix: &str, content: &Content, depth: usize) -> fmt::Result {
        match content {
            Content::Null => self.line(depth, format_args!("{prefix}null")),
            Content::String(s) => self.line(depth, format_args!("{prefix}{s:?}")),
            Content::Array(arr) => {
                let len = match &arr.data {
                    ArrayData::Prim(prim) => prim.len(),
                    ArrayData::Objects(elems) => elems.len(),
                };
                if !self.first_sight(&**arr) {
                    return self.line(
                        depth,
                        format_args!("{prefix}array {} @{:#x}", arr.class_desc.name, arr.handle),
                    );
                }
                self.line(
                    depth,
                    format_args!(
                        "{prefix}{}[{len}] @{:#x}",
                        element_type_name(&arr.class_desc.name),
                        arr.handle
                    ),
                )?;
                self.class_desc("class ", &arr.class_desc, depth + 1)?;
                match &arr.data {
                    ArrayData::Prim(prim) => {
                        if !prim.is_empty() {
                            let shown = prim.values().take(self.max_elements).join(", ");
                            let rest = self.elided(len);
                            self.line(depth + 1, format_args!("{shown}{rest}"))?;
                        }
                    }
                    ArrayData::Objects(elems) => {
                        for (i, elem) in elems.iter().take(self.max_elements).enumerate() {
                            self.content(&format!("[{i}] "), elem, depth + 1)?;
                        }
                        let rest = self.elided(len);
                        if !rest.is_empty() {
                            self.line(depth + 1, format_args!("{}", rest.trim_start()))?;
                        }
                    }
                }
                Ok(())
            }
            Content::Object(obj) => {
                if !self.first_sight(&**obj) {
                    return self.line(
                        depth,
                        format_args!("{prefix}object {} @{:#x}", obj.class_desc.name, obj.handle),
                    );
                }
                if let Some(value) = content.as_boxed() {
                    self.line(
                        depth,
                        format_args!(
                            "{prefix}{} @{:#x} = {value}",
                            obj.class_desc.name, obj.handle
                        ),
                    )?;
                    return self.class_desc("class ", &obj.class_desc, depth + 1);
                }
                self.line(
                    depth,
                    format_args!("{prefix}object {} @{:#x}", obj.class_desc.name, obj.handle),
                )?;
                self.class_desc("class ", &obj.class_desc, depth + 1)?;
                for data in &obj.class_data {
                    self.line(depth + 1, format_args!("{}:", data.class_name))?;
                    for (name, value) in &data.values {
                        match value {
                            FieldValue::Prim(v) => {
                                self.line(depth + 2, format_args!("{name} = {v}"))?;
                            }
                            FieldValue::Object(c) => {
                                self.content(&format!("{name} = "), c, depth + 2)?;
                            }
                        }
                    }
                    self.annotations(&data.annotations, depth + 2)?;
                }
                Ok(())
            }
            Content::Class(desc) => {
                self.class_desc(&format!("{prefix}java.lang.Class "), desc, depth)
            }
            Content::ClassDesc(desc) => self.class_desc(prefix, desc, depth),
            Content::Enum(e) => {
                self.line(
                    depth,
                    format_args!(
                        "{prefix}enum {}.{} @{:#x}",
                        e.class_desc.name, e.name, e.handle
                    ),
                )?;
                self.class_desc("class ", &e.class_desc, depth + 1)
            }
            Content::BlockData(bytes) => {
                let shown = hex_string(bytes.iter().copied().take(self.max_elements));
                let rest = self.elided(bytes.len());
                self.line(
                    depth,
                    format_args!("{prefix}block data [{}] {shown}{rest}", bytes.len()),
                )
            }
            Content::BackRef(handle) => {
                self.line(depth, format_args!("{prefix}reference @{handle:#x} (cycle)"))
            }
        }
    }

    fn class_desc(&mut self, prefix: &str, desc: &ClassDesc, depth: usize) -> fmt::Result {
        let name = if desc.is_proxy() {
            format!("proxy implementing {}", desc.proxy_interfaces.iter().join(", "))
        } else {
            desc.name.clone()
        };
        if !self.first_sight(desc) {
            return self.line(depth, format_args!("{prefix}{name} @{:#x}", desc.handle));
        }
        self.line(
            depth,
            format_args!(
                "{prefix}{name} @{:#x} suid {:#018x} [{}]",
                desc.handle,
                desc.suid,
                flag_names(desc.flags).join(" ")
            ),
        )?;
        for field in &desc.fields {
            let ty = match &field.ty {
                FieldType::Prim(kind) => kind.label(),
                FieldType::Object(sig) => sig.as_str(),
            };
            self.line(depth + 1, format_args!("field {ty} {}", field.name))?;
        }
        self.annotations(&desc.annotations, depth + 1)?;
        match &desc.super_class {
            Some(sup) => self.class_desc("extends ", sup, depth + 1),
            None => Ok(()),
        }
    }

    fn annotations(&mut self, annotations: &[Content], depth: usize) -> fmt::Result {
        for content in annotations {
            self.content("annotation ", content, depth)?;
        }
        Ok(())
    }
}

/// `[D` -> `double`, `[Ljava.lang.String;` -> `java.lang.String`, `[[I` -> `int[]`
fn element_type_name(array_class: &str) -> String {
    let Some(elem) = array_class.strip_prefix('[') else {
        return array_class.to_owned();
    };
    if elem.starts_with('[') {
        return format!("{}[]", element_type_name(elem));
    }
    if let Some(class) = elem.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        return class.to_owned();
    }
    elem.chars()
        .next()
        .and_then(|c| u8::try_from(c).ok())
        .and_then(crate::prim::PrimKind::from_type_code)
        .map_or_else(|| elem.to_owned(), |kind| kind.label().to_owned())
}

/// Rows of 16 bytes: offset, hex digits and printable ASCII
pub struct HexDump<'a> {
    pub bytes: &'a [u8],
    pub base_offset: usize,
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.bytes.chunks(16).enumerate() {
            write!(f, "{:08X} ", self.base_offset + row * 16)?;
            for i in 0..16 {
                match chunk.get(i) {
                    Some(&b) => {
                        let [hi, lo] = byte_to_hex_digits(b);
                        write!(f, " {hi}{lo}")?;
                    }
                    None => f.write_str("   ")?,
                }
            }
            f.write_str("  ")?;
            for &b in chunk {
                let c = if b.is_ascii_graphic() || b == b' ' {
                    char::from(b)
                } else {
                    '.'
                };
                f.write_char(c)?;
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}

#[cfg(test)]
use crate::{
    prim::{PrimArray, PrimValue},
    reader::from_slice,
    writer::to_vec,
};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
fn render(bytes: &[u8], max_elements: usize) -> String {
    let contents = from_slice(bytes).unwrap();
    Tree {
        contents: &contents,
        max_elements,
    }
    .to_string()
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_prim_array_tree() {
    let bytes = to_vec(|w| {
        w.write_prim_array(&PrimArray::Double(vec![1.0, 2.5, -0.0]))?;
        w.write_prim_array(&PrimArray::Double(vec![]))
    })
    .unwrap();
    assert_eq!(
        render(&bytes, 2),
        "\
[0] double[3] @0x7e0001
  class [D @0x7e0000 suid 0x3ea68c14ab635a1e [SC_SERIALIZABLE]
  1.0, 2.5 … 1 more
[1] double[0] @0x7e0002
  class [D @0x7e0000
"
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_boxed_tree() {
    let bytes = to_vec(|w| w.write_boxed(PrimValue::Double(10.0))).unwrap();
    assert_eq!(
        render(&bytes, 10),
        "\
[0] java.lang.Double @0x7e0002 = 10.0
  class java.lang.Double @0x7e0000 suid 0x80b3c24a296bfb04 [SC_SERIALIZABLE]
    field double value
    extends java.lang.Number @0x7e0001 suid 0x86ac951d0b94e08b [SC_SERIALIZABLE]
"
    );
}

#[test]
fn test_element_type_names() {
    assert_eq!(element_type_name("[Z"), "boolean");
    assert_eq!(element_type_name("[[I"), "int[]");
    assert_eq!(element_type_name("[Ljava.lang.String;"), "java.lang.String");
}

#[test]
fn test_hex_dump() {
    let bytes: Vec<u8> = (0x3Eu8..0x52).collect();
    let dump = HexDump {
        bytes: &bytes,
        base_offset: 0x10,
    }
    .to_string();
    let lines: Vec<_> = dump.lines().collect();
    assert_eq!(
        lines,
        [
            "00000010  3E 3F 40 41 42 43 44 45 46 47 48 49 4A 4B 4C 4D  >?@ABCDEFGHIJKLM",
            "00000020  4E 4F 50 51                                      NOPQ",
        ]
    );
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_run_seek_and_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("padded.ser");
    let mut bytes = vec![0xFF; 3];
    bytes.extend(to_vec(|w| w.write_prim_array(&PrimArray::Short(vec![7, -7]))).unwrap());
    std::fs::write(&path, &bytes).unwrap();
    let mut opts = DumpOptions {
        hex: false,
        seek: 3,
        max_elements: 16,
    };
    let mut out = Vec::new();
    run(&path, &opts, &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("[0] short[2] @0x7e0001"), "{out}");
    assert!(out.contains("  7, -7\n"), "{out}");

    opts.seek = 0;
    assert!(run(&path, &opts, &mut Vec::new()).is_err());
    opts.seek = bytes.len() + 1;
    assert!(run(&path, &opts, &mut Vec::new()).is_err());
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_run_reports_partial_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.ser");
    let mut bytes = to_vec(|w| {
        w.write_prim_array(&PrimArray::Int(vec![1]))?;
        w.write_prim_array(&PrimArray::Int(vec![1, 2, 3]))
    })
    .unwrap();
    bytes.truncate(bytes.len() - 2);
    std::fs::write(&path, &bytes).unwrap();
    let opts = DumpOptions {
        hex: false,
        seek: 0,
        max_elements: 16,
    };
    let mut out = Vec::new();
    let err = run(&path, &opts, &mut out).unwrap_err();
    assert!(err.to_string().contains("after 1 contents"), "{err}");
    assert!(String::from_utf8(out).unwrap().contains("[0] int[1]"));
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_handles_reused_after_reset_are_expanded() {
    let first = to_vec(|w| w.write_prim_array(&PrimArray::Int(vec![1]))).unwrap();
    let second = to_vec(|w| w.write_prim_array(&PrimArray::Int(vec![2, 3]))).unwrap();
    let mut bytes = first;
    bytes.push(crate::stream::TC_RESET);
    bytes.extend_from_slice(&second[4..]);
    let tree = render(&bytes, 16);
    assert!(
        tree.ends_with(
            "\
[1] int[2] @0x7e0001
  class [I @0x7e0000 suid 0x4dba602676eab2a5 [SC_SERIALIZABLE]
  2, 3
"
        ),
        "{tree}"
    );
}
