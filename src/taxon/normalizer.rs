//! Clean-name keys used to match and deduplicate name strings.
use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,;]").expect("valid separator punctuation regex"));

static ISOLATED_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\-()\[\]{}:&*?×]").expect("valid isolated punctuation regex")
});

static CONJUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" (and|et) ").expect("valid conjunction regex"));

static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid space run regex"));

/// Capital letters folded after ASCII lowercasing. `C` and `R` are already
/// lowercase by the time this table runs, so those two entries never match
/// anything; they stay because the harvester's key builder carries the same table.
const ACCENT_FOLDS: [(&str, &str); 35] = [
    ("À", "à"),
    ("Â", "â"),
    ("Å", "å"),
    ("Ã", "ã"),
    ("Ä", "ä"),
    ("Á", "á"),
    ("Æ", "æ"),
    ("C", "c"),
    ("Ç", "ç"),
    ("Č", "č"),
    ("É", "é"),
    ("È", "è"),
    ("Ë", "ë"),
    ("Í", "í"),
    ("Ì", "ì"),
    ("Ï", "ï"),
    ("Ň", "ň"),
    ("Ñ", "ñ"),
    ("Ó", "ó"),
    ("Ò", "ò"),
    ("Ô", "ô"),
    ("Ø", "ø"),
    ("Õ", "õ"),
    ("Ö", "ö"),
    ("Ú", "ú"),
    ("Ù", "ù"),
    ("Ü", "ü"),
    ("R", "r"),
    ("Ŕ", "ŕ"),
    ("Ř", "ř"),
    ("Ŗ", "ŗ"),
    ("Š", "š"),
    ("Ş", "ş"),
    ("Ž", "ž"),
    ("Œ", "œ"),
];

/// Builds the clean name for a raw name string.
///
/// The output must stay byte-for-byte identical to the key builder
/// that produces the same keys on the harvesting side, so every step
/// here (including the ASCII-only lowercasing) is part of that contract.
pub fn prepare_clean_name(name: &str) -> String {
    let name = SEPARATOR_PUNCTUATION.replace_all(name, " ");
    let name = ISOLATED_PUNCTUATION.replace_all(&name, " $0 ");
    let name = CONJUNCTION.replace_all(&name, " & ");
    let name = SPACE_RUN.replace_all(&name, " ");
    let mut name = name.to_ascii_lowercase();
    for (upper, lower) in ACCENT_FOLDS {
        if name.contains(upper) {
            name = name.replace(upper, lower);
        }
    }
    strip(&name).to_string()
}

/// Collapses every whitespace run to one space and trims the ends.
pub fn squish(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip(value: &str) -> &str {
    value.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c' | '\0'))
}
