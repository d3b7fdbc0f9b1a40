use num_traits::Num;

/// Parse a number, treating it as hex if it starts with `0x` or contains hex letters
pub fn parse_guess_radix<T: Num>(input: &str) -> Result<T, <T as Num>::FromStrRadixErr> {
    if let Some(stripped) = input.strip_prefix("0x") {
        T::from_str_radix(stripped, 16)
    } else if input.contains(['a', 'b', 'c', 'd', 'e', 'f']) {
        T::from_str_radix(input, 16)
    } else {
        T::from_str_radix(input, 10)
    }
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_parse_guess_radix() {
    assert_eq!(parse_guess_radix::<usize>("0x1f").unwrap(), 31);
    assert_eq!(parse_guess_radix::<usize>("1f").unwrap(), 31);
    assert_eq!(parse_guess_radix::<usize>("10").unwrap(), 10);
    assert!(parse_guess_radix::<usize>("0xzz").is_err());
}
