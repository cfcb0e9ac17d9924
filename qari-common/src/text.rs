//! Text normalization and similarity scoring for recitation transcripts
//!
//! Transcript and reference text are canonicalized with [`normalize`] before
//! comparison so that diacritics, letter variants, and punctuation never
//! affect the score. [`similarity`] is normalized Levenshtein over chars.

/// Accuracy at or above this is an "Excellent" result
pub const EXCELLENT_THRESHOLD: f64 = 0.95;

/// Accuracy at or above this (and below excellent) is "Very good"
pub const VERY_GOOD_THRESHOLD: f64 = 0.80;

/// Arabic diacritical marks stripped during normalization.
///
/// Covers the honorific signs (U+0610..U+061A), tashkeel (U+064B..U+065F),
/// superscript alef (U+0670), and the Quranic annotation block
/// (U+06D6..U+06ED). Tatweel (U+0640) is folded in with the marks since it
/// carries no letter identity.
fn is_diacritic(c: char) -> bool {
    matches!(c,
        '\u{0610}'..='\u{061A}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06ED}'
            | '\u{0640}')
}

/// Collapse historical letter variants to one canonical form.
///
/// Alef variants (madda, hamza above/below, wasla) fold to bare alef,
/// hamza carriers fold to their carrier letter, taa marbuta to haa, and
/// alef maqsura to yaa. All targets are fixed points of the mapping.
fn fold_letter(c: char) -> char {
    match c {
        'آ' | 'أ' | 'إ' | 'ٱ' => 'ا',
        'ؤ' => 'و',
        'ئ' => 'ي',
        'ى' => 'ي',
        'ة' => 'ه',
        _ => c,
    }
}

/// Punctuation stripped during normalization (Arabic and Latin sets).
fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '،' | '؛'
            | '؟'
            | '۔'
            | '.'
            | ','
            | '!'
            | '?'
            | ';'
            | ':'
            | '"'
            | '\''
            | '('
            | ')'
            | '['
            | ']'
            | '{'
            | '}'
            | '-'
            | '_'
    )
}

/// Canonicalize recitation text for comparison.
///
/// Strips diacritics, folds letter variants, strips punctuation, and
/// collapses whitespace runs to single spaces. Pure and idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .filter(|c| !is_diacritic(*c))
        .map(fold_letter)
        .filter(|c| !is_punctuation(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity between two strings as `1 - d / max(len)` where `d` is the
/// Levenshtein edit distance. Both empty compares as 1.0.
///
/// Result is in `[0, 1]`, symmetric, and 1.0 for identical inputs. Inputs
/// are compared as-is; callers comparing recitation text should normalize
/// first (or use [`score_transcript`]).
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Accuracy of a transcript against a reference text, both normalized.
pub fn score_transcript(transcript: &str, reference: &str) -> f64 {
    similarity(&normalize(transcript), &normalize(reference))
}

/// Human-readable band label for an accuracy value.
pub fn accuracy_band(accuracy: f64) -> &'static str {
    if accuracy >= EXCELLENT_THRESHOLD {
        "Excellent"
    } else if accuracy >= VERY_GOOD_THRESHOLD {
        "Very good"
    } else {
        "Good effort, keep practicing"
    }
}
