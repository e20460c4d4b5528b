//! Text normalization helpers shared by the rubric parser and the classifier.

/// Uppercase a string and strip Spanish diacritics so keyword tests are
/// insensitive to both case and accents ("Evaluación" matches "EVALUACION").
pub fn fold_for_matching(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .map(|c| match c {
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Split folded text into alphanumeric words.
pub fn words(folded: &str) -> impl Iterator<Item = &str> {
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

/// True when `phrase` (already folded) occurs in `folded` on word boundaries.
pub fn contains_phrase(folded: &str, phrase: &str) -> bool {
    let needle: Vec<&str> = words(phrase).collect();
    if needle.is_empty() {
        return false;
    }
    let haystack: Vec<&str> = words(folded).collect();
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold_for_matching("Evaluación técnica"), "EVALUACION TECNICA");
        assert_eq!(fold_for_matching("sí, año"), "SI, ANO");
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("CUMPLE: NO VALIDADO", "NO VALIDADO"));
        assert!(contains_phrase("CUMPLE: NO VALIDADO", "NO"));
        assert!(!contains_phrase("TECNOLOGIA NORMA", "NO"));
        assert!(!contains_phrase("CONCLUSION", "SI"));
        assert!(!contains_phrase("anything", ""));
    }
}
