//! Constants of the Java Object Serialization Stream Protocol

pub const STREAM_MAGIC: u16 = 0xACED;
pub const STREAM_VERSION: u16 = 5;

/// First handle assigned in a stream. Handles increase by one per introduced object.
pub const BASE_HANDLE: u32 = 0x7E_0000;

pub const TC_NULL: u8 = 0x70;
pub const TC_REFERENCE: u8 = 0x71;
pub const TC_CLASSDESC: u8 = 0x72;
pub const TC_OBJECT: u8 = 0x73;
pub const TC_STRING: u8 = 0x74;
pub const TC_ARRAY: u8 = 0x75;
pub const TC_CLASS: u8 = 0x76;
pub const TC_BLOCKDATA: u8 = 0x77;
pub const TC_ENDBLOCKDATA: u8 = 0x78;
pub const TC_RESET: u8 = 0x79;
pub const TC_BLOCKDATALONG: u8 = 0x7A;
pub const TC_EXCEPTION: u8 = 0x7B;
pub const TC_LONGSTRING: u8 = 0x7C;
pub const TC_PROXYCLASSDESC: u8 = 0x7D;
pub const TC_ENUM: u8 = 0x7E;

pub const SC_WRITE_METHOD: u8 = 0x01;
pub const SC_SERIALIZABLE: u8 = 0x02;
pub const SC_EXTERNALIZABLE: u8 = 0x04;
pub const SC_BLOCK_DATA: u8 = 0x08;
pub const SC_ENUM: u8 = 0x10;

/// Human readable names of class descriptor flags that are set in `flags`
pub fn flag_names(flags: u8) -> Vec<&'static str> {
    [
        (SC_WRITE_METHOD, "SC_WRITE_METHOD"),
        (SC_SERIALIZABLE, "SC_SERIALIZABLE"),
        (SC_EXTERNALIZABLE, "SC_EXTERNALIZABLE"),
        (SC_BLOCK_DATA, "SC_BLOCK_DATA"),
        (SC_ENUM, "SC_ENUM"),
    ]
    .into_iter()
    .filter_map(|(bit, name)| (flags & bit != 0).then_some(name))
    .collect()
}

/// Encode `s` as the "modified UTF-8" used by `DataOutput.writeUTF`.
///
/// NUL is encoded as two bytes and supplementary characters as two
/// three-byte surrogates.
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8. Returns `None` on malformed input.
///
/// Unpaired surrogates, which Java strings may contain, are replaced with U+FFFD.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b >> 4 {
            0x0..=0x7 => {
                units.push(u16::from(b));
                i += 1;
            }
            0xC | 0xD => {
                let b2 = *bytes.get(i + 1)?;
                if b2 & 0xC0 != 0x80 {
                    return None;
                }
                units.push((u16::from(b & 0x1F) << 6) | u16::from(b2 & 0x3F));
                i += 2;
            }
            0xE => {
                let b2 = *bytes.get(i + 1)?;
                let b3 = *bytes.get(i + 2)?;
                if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                    return None;
                }
                units.push(
                    (u16::from(b & 0x0F) << 12)
                        | (u16::from(b2 & 0x3F) << 6)
                        | u16::from(b3 & 0x3F),
                );
                i += 3;
            }
            _ => return None,
        }
    }
    Some(String::from_utf16_lossy(&units))
}

#[test]
fn test_modified_utf8_nul_and_supplementary() {
    assert_eq!(encode_modified_utf8("a\0b"), [b'a', 0xC0, 0x80, b'b']);
    // U+1F980 becomes the surrogate pair D83E DD80, each as three bytes
    let crab = encode_modified_utf8("\u{1F980}");
    assert_eq!(crab, [0xED, 0xA0, 0xBE, 0xED, 0xB6, 0x80]);
    assert_eq!(decode_modified_utf8(&crab).as_deref(), Some("\u{1F980}"));
    assert_eq!(
        decode_modified_utf8(&encode_modified_utf8("java.lang.Double")).as_deref(),
        Some("java.lang.Double")
    );
}

#[test]
fn test_modified_utf8_rejects_truncated_sequence() {
    assert_eq!(decode_modified_utf8(&[0xE0, 0x80]), None);
    assert_eq!(decode_modified_utf8(&[0xC3, 0x41]), None);
    assert_eq!(decode_modified_utf8(&[0xF0, 0x80, 0x80, 0x80]), None);
}

#[test]
fn test_flag_names() {
    assert_eq!(flag_names(0x02), ["SC_SERIALIZABLE"]);
    assert_eq!(
        flag_names(SC_SERIALIZABLE | SC_WRITE_METHOD),
        ["SC_WRITE_METHOD", "SC_SERIALIZABLE"]
    );
    assert!(flag_names(0).is_empty());
}
