/// Uppercase letters and digits without the look-alikes `I`, `O`, `0` and `1`.
///
/// Codes are read aloud and typed from printed certificates and invite emails.
pub const CODE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Generates a random code of `len` characters from [`CODE_ALPHABET`].
#[must_use]
pub fn random_code(len: usize) -> String {
    if len == 0 {
        return String::new();
    }
    nanoid::nanoid!(len, &CODE_ALPHABET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_no_ambiguous_characters() {
        for ambiguous in ['I', 'O', '0', '1'] {
            assert!(!CODE_ALPHABET.contains(&ambiguous));
        }
    }

    #[test]
    fn codes_differ() {
        assert_ne!(random_code(10), random_code(10));
    }
}
