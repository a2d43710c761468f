// src/matching/name.rs - Fuzzy name scoring on a 0-100 scale
use clap::ValueEnum;
use strsim::{jaro_winkler, normalized_levenshtein};

pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 80;

/// String-similarity measure used to compare the target with each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NameScorer {
    /// Indel ratio: `2 * LCS / (len(a) + len(b))`.
    #[default]
    Ratio,
    /// Normalized Levenshtein distance.
    Levenshtein,
    /// Jaro-Winkler similarity.
    JaroWinkler,
}

impl NameScorer {
    /// Scores `a` against `b`. Comparison is case-sensitive and unprocessed;
    /// an empty string on either side scores 0.
    pub fn score(self, a: &str, b: &str) -> u8 {
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        match self {
            NameScorer::Ratio => fuzz_ratio(a, b),
            NameScorer::Levenshtein => to_percent(normalized_levenshtein(a, b)),
            NameScorer::JaroWinkler => to_percent(jaro_winkler(a, b)),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        <NameScorer as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Edit-distance ratio where a substitution costs a deletion plus an insertion.
pub fn fuzz_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let total = a.len() + b.len();
    let common = longest_common_subsequence(&a, &b);
    to_percent(2.0 * common as f64 / total as f64)
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_names_score_100() {
        for scorer in [NameScorer::Ratio, NameScorer::Levenshtein, NameScorer::JaroWinkler] {
            assert_eq!(scorer.score("Paris", "Paris"), 100);
            assert_eq!(scorer.score("Санкт-Петербург", "Санкт-Петербург"), 100);
        }
    }

    #[test]
    fn test_disjoint_names_score_low() {
        assert_eq!(fuzz_ratio("Paris", "London"), 0);
        assert!(NameScorer::Levenshtein.score("Paris", "London") < DEFAULT_SIMILARITY_THRESHOLD);
        assert!(NameScorer::JaroWinkler.score("Paris", "London") < DEFAULT_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_fuzz_ratio_values() {
        assert_eq!(fuzz_ratio("Saint Petersburg", "St Petersburg"), 90);
        assert_eq!(fuzz_ratio("Moscow", "Moskva"), 50);
        assert_eq!(fuzz_ratio("Paris", "Parisi"), 91);
        // Case-sensitive
        assert_eq!(fuzz_ratio("paris", "PARIS"), 0);
    }

    #[test]
    fn test_ratio_counts_chars_not_bytes() {
        assert_eq!(fuzz_ratio("Zürich", "Zurich"), 83);
    }

    #[test]
    fn test_empty_names_score_zero() {
        assert_eq!(NameScorer::Ratio.score("", "Paris"), 0);
        assert_eq!(NameScorer::Levenshtein.score("Paris", ""), 0);
        assert_eq!(NameScorer::JaroWinkler.score("", ""), 0);
    }

    #[test]
    fn test_parse_scorer() {
        assert_eq!(NameScorer::parse("ratio"), Some(NameScorer::Ratio));
        assert_eq!(NameScorer::parse("Jaro-Winkler"), Some(NameScorer::JaroWinkler));
        assert_eq!(NameScorer::parse(" levenshtein "), Some(NameScorer::Levenshtein));
        assert_eq!(NameScorer::parse("soundex"), None);
    }
}
