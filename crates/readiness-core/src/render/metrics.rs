//! Glyph widths for the standard Helvetica faces, in 1/1000 em.
//!
//! Values for 0x20..=0x7E come from the Adobe core font metrics. Latin-1
//! letters borrow the width of an ASCII letter with the same advance.

use super::pdf::FontStyle;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// ASCII letter with the same advance as a Latin-1 letter.
fn base_letter(c: char) -> Option<char> {
    let base = match c {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'I',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(base)
}

/// Width of one character in 1/1000 em.
pub fn char_width(style: FontStyle, c: char) -> u16 {
    let table = match style {
        FontStyle::Bold => &HELVETICA_BOLD,
        FontStyle::Regular | FontStyle::Italic => &HELVETICA,
    };
    let c = base_letter(c).unwrap_or(c);
    match c as u32 {
        code @ 0x20..=0x7E => table[(code - 0x20) as usize],
        _ => 556,
    }
}

/// Width of a string in 1/1000 em.
pub fn text_width(style: FontStyle, text: &str) -> u32 {
    text.chars().map(|c| u32::from(char_width(style, c))).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(char_width(FontStyle::Regular, ' '), 278);
        assert_eq!(char_width(FontStyle::Regular, 'W'), 944);
        assert_eq!(char_width(FontStyle::Bold, 'b'), 611);
        assert_eq!(char_width(FontStyle::Italic, 'i'), 222);
    }

    #[test]
    fn test_accented_letters_use_base_width() {
        assert_eq!(
            char_width(FontStyle::Regular, 'é'),
            char_width(FontStyle::Regular, 'e')
        );
        assert_eq!(char_width(FontStyle::Bold, '¿'), 556);
        assert_eq!(text_width(FontStyle::Regular, "ab"), 1112);
    }
}
