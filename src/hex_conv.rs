const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// The two uppercase hex digits of `byte`
pub fn byte_to_hex_digits(byte: u8) -> [char; 2] {
    [
        char::from(DIGITS[usize::from(byte >> 4)]),
        char::from(DIGITS[usize::from(byte & 0x0F)]),
    ]
}

/// Hex digits of each byte, separated by spaces
pub fn hex_string(bytes: impl IntoIterator<Item = u8>) -> String {
    let mut out = String::new();
    for (i, byte) in bytes.into_iter().enumerate() {
        if i != 0 {
            out.push(' ');
        }
        out.extend(byte_to_hex_digits(byte));
    }
    out
}

#[test]
fn test_byte_to_hex_digits() {
    let pairs = [
        (255, ['F', 'F']),
        (0, ['0', '0']),
        (15, ['0', 'F']),
        (16, ['1', '0']),
        (154, ['9', 'A']),
        (0xAC, ['A', 'C']),
        (0xED, ['E', 'D']),
    ];
    for (byte, hex) in pairs {
        assert_eq!(byte_to_hex_digits(byte), hex);
    }
}

#[test]
fn test_hex_string() {
    assert_eq!(hex_string([0xAC, 0xED, 0x00, 0x05]), "AC ED 00 05");
    assert_eq!(hex_string([]), "");
}
