//! Language tag normalization
//!
//! Expected and detected language tags arrive in mixed shapes ("EN",
//! "en-US", "english", "iw"). Comparison happens on canonical lowercase
//! primary subtags; values that don't normalize pass through lowercased so
//! a mismatch is never reported on garbage input alone.

/// Legacy codes and English language names mapped to canonical subtags.
const ALIASES: &[(&str, &str)] = &[
    // ISO 639 legacy codes
    ("iw", "he"),
    ("ji", "yi"),
    ("in", "id"),
    // English names Whisper and intake forms occasionally emit
    ("english", "en"),
    ("hindi", "hi"),
    ("bengali", "bn"),
    ("tamil", "ta"),
    ("telugu", "te"),
    ("kannada", "kn"),
    ("malayalam", "ml"),
    ("marathi", "mr"),
    ("gujarati", "gu"),
    ("punjabi", "pa"),
    ("panjabi", "pa"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("chinese", "zh"),
    ("mandarin", "zh"),
];

/// Normalize a language tag to its canonical lowercase primary subtag.
///
/// Returns `None` for empty input. Unrecognized values pass through
/// lowercased rather than failing.
pub fn normalize_tag(value: Option<&str>) -> Option<String> {
    let raw = value?.trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }

    // Primary subtag: "en-US" / "en_US" -> "en"
    let primary = raw
        .split(['-', '_'])
        .next()
        .unwrap_or(raw.as_str())
        .to_string();

    let resolved = ALIASES
        .iter()
        .find(|(alias, _)| *alias == primary)
        .map(|(_, tag)| (*tag).to_string())
        .unwrap_or(primary);

    // A plausible subtag is 2-3 ASCII letters; anything else is passed
    // through lowercased as-is.
    if resolved.len() >= 2 && resolved.len() <= 3 && resolved.bytes().all(|b| b.is_ascii_lowercase())
    {
        Some(resolved)
    } else {
        Some(raw)
    }
}

/// Mismatch is flagged only when both tags normalize to non-empty, unequal
/// values.
pub fn is_mismatch(expected: Option<&str>, detected: Option<&str>) -> bool {
    match (normalize_tag(expected), normalize_tag(detected)) {
        (Some(e), Some(d)) => e != d,
        _ => false,
    }
}
