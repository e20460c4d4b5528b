//! Reduce text to the character subset the PDF fonts can show.
//!
//! The report uses the standard Type1 fonts with WinAnsi encoding, and only
//! the Latin-1 printable range is emitted. Common typographic characters are
//! mapped to ASCII look-alikes; anything else becomes the placeholder.

/// Substitute for characters the output cannot represent.
pub const PLACEHOLDER: char = '-';

/// True for characters that survive sanitization unchanged.
pub fn is_representable(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7E | 0xA0..=0xFF)
}

/// Map a string into the printable Latin-1 subset.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{25CF}' | '\u{25AA}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\t' => out.push(' '),
            c if is_representable(c) => out.push(c),
            _ => out.push(PLACEHOLDER),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_typographic_characters_mapped() {
        assert_eq!(sanitize("“Prueba” – fase…"), "\"Prueba\" - fase...");
        assert_eq!(sanitize("• item\tuno"), "- item uno");
    }

    #[test]
    fn test_latin1_kept_and_others_replaced() {
        assert_eq!(sanitize("Evaluación técnica ñ"), "Evaluación técnica ñ");
        assert_eq!(sanitize("rocket 🚀 ok"), "rocket - ok");
        assert_eq!(sanitize("¿Qué?"), "¿Qué?");
    }

    proptest! {
        #[test]
        fn prop_output_is_representable(text in any::<String>()) {
            prop_assert!(sanitize(&text).chars().all(is_representable));
        }
    }
}
