//! Detection of names that are not clean single taxa (strains, hybrids, placeholders).
use once_cell::sync::Lazy;
use regex::RegexSet;

const RED_FLAG_WORDS: [&str; 27] = [
    "incertae sedis",
    "incertaesedis",
    "culture",
    "clone",
    "isolate",
    "phage",
    "sp",
    "cf",
    "uncultured",
    "DNA",
    "unclassified",
    "sect",
    "ß",
    "str",
    "biovar",
    "type",
    "strain",
    "serotype",
    "hybrid",
    "cultivar",
    "x",
    "×",
    "pop",
    "group",
    "environmental",
    "sample",
    "endosymbiont",
];

// Word boundaries are ASCII word characters only, and `^`/`$` are line anchors.
static SURROGATE_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    let red_flags = RED_FLAG_WORDS
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    RegexSet::new([
        format!(r"(?im)(^|[^0-9A-Za-z_])({red_flags})([^0-9A-Za-z_]|$)"),
        r"(?i)[0-9][a-z]".to_string(),
        r"(?i)[a-z][0-9]".to_string(),
        r"(?i)[a-z]-[0-9]".to_string(),
        r"(?m) [0-9]{1,3}$".to_string(),
        r"(?im)virus([^0-9A-Za-z_]|$)".to_string(),
    ])
    .expect("valid surrogate name patterns")
});

/// True when the string looks like a strain code, lab isolate, hybrid or
/// other placeholder rather than a taxonomic name.
pub fn is_surrogate_or_hybrid(name: &str) -> bool {
    SURROGATE_PATTERNS.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_binomials_are_not_flagged() {
        assert!(!is_surrogate_or_hybrid("Panthera leo"));
        assert!(!is_surrogate_or_hybrid("Canis lupus familiaris"));
        assert!(!is_surrogate_or_hybrid("Vernonanthura patens (Kunth) H.Rob."));
        assert!(!is_surrogate_or_hybrid(""));
    }

    #[test]
    fn red_flag_words_must_be_whole_words() {
        assert!(is_surrogate_or_hybrid("Felis sp."));
        assert!(is_surrogate_or_hybrid("Mentha × piperita"));
        assert!(is_surrogate_or_hybrid("Rosa HYBRID tea"));
        assert!(is_surrogate_or_hybrid("uncultured bacterium"));
        assert!(is_surrogate_or_hybrid("Bacteria incertae sedis"));
        // "sp" inside a longer word does not count.
        assert!(!is_surrogate_or_hybrid("Spartina alterniflora"));
        assert!(!is_surrogate_or_hybrid("Xenopus laevis"));
    }

    #[test]
    fn letter_digit_mixtures_are_flagged() {
        assert!(is_surrogate_or_hybrid("Escherichia coli K12"));
        assert!(is_surrogate_or_hybrid("Bacillus 2b"));
        assert!(is_surrogate_or_hybrid("Pseudomonas PAO-1"));
    }

    #[test]
    fn short_trailing_numbers_are_flagged() {
        assert!(is_surrogate_or_hybrid("Lactobacillus casei 393"));
        assert!(!is_surrogate_or_hybrid("Aus bus 1758 Linnaeus"));
        assert!(!is_surrogate_or_hybrid("Aus bus 1758"));
    }

    #[test]
    fn viruses_are_flagged() {
        assert!(is_surrogate_or_hybrid("Influenza virus A"));
        assert!(is_surrogate_or_hybrid("Tobacco mosaic virus"));
        assert!(is_surrogate_or_hybrid("Rotavirus"));
        assert!(!is_surrogate_or_hybrid("Virusella minor"));
    }
}
