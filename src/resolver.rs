//! Resolves the selector model's free-text table choice against the catalog.
//!
//! Matching runs in strict tiers, stopping at the first usable result:
//! exact (case-sensitive), unique case-insensitive substring, then fuzzy
//! string similarity with a 0.6 cutoff. What happens when several keys pass
//! the substring tier is configurable; the default falls through to the
//! fuzzy tier instead of hard-failing.

use crate::error::{AssistantError, Result};
use strsim::sorensen_dice;
use tracing::debug;

/// Policy for the substring tier when more than one key matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguousPolicy {
    /// Continue to the fuzzy tier.
    #[default]
    FallThrough,
    /// Report an ambiguous-match failure listing the matches.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Substring,
    Fuzzy,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub table: String,
    pub tier: MatchTier,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct TableResolver {
    /// Similarity cutoff (0.0-1.0) for the fuzzy tier.
    pub similarity_threshold: f64,
    pub ambiguous_policy: AmbiguousPolicy,
}

impl Default for TableResolver {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
            ambiguous_policy: AmbiguousPolicy::default(),
        }
    }
}

impl TableResolver {
    pub fn new(similarity_threshold: f64, ambiguous_policy: AmbiguousPolicy) -> Self {
        Self {
            similarity_threshold,
            ambiguous_policy,
        }
    }

    /// Resolve a candidate name to exactly one catalog key. Pure function
    /// over its inputs; never retries.
    pub fn resolve(&self, candidate: &str, keys: &[String]) -> Result<Resolution> {
        let candidate = candidate.trim();
        // An empty candidate is a substring of every key, so it must fail
        // outright rather than reach the substring tier.
        if candidate.is_empty() {
            return Err(AssistantError::NoTableMatch {
                candidate: String::new(),
            });
        }

        if keys.iter().any(|k| k == candidate) {
            return Ok(Resolution {
                table: candidate.to_string(),
                tier: MatchTier::Exact,
                score: 1.0,
            });
        }

        let lowered = candidate.to_lowercase();
        let substring_matches: Vec<&String> = keys
            .iter()
            .filter(|k| k.to_lowercase().contains(&lowered))
            .collect();
        match substring_matches.len() {
            1 => {
                return Ok(Resolution {
                    table: substring_matches[0].clone(),
                    tier: MatchTier::Substring,
                    score: 1.0,
                })
            }
            n if n > 1 => match self.ambiguous_policy {
                AmbiguousPolicy::Fail => {
                    return Err(AssistantError::AmbiguousTableMatch {
                        candidate: candidate.to_string(),
                        matches: substring_matches.iter().map(|k| k.to_string()).collect(),
                    })
                }
                AmbiguousPolicy::FallThrough => {
                    debug!(
                        "{} substring matches for '{}', trying fuzzy tier",
                        n, candidate
                    );
                }
            },
            _ => {}
        }

        // Strictly-greater keeps the first key on ties.
        let mut best: Option<(&String, f64)> = None;
        for key in keys {
            let score = sorensen_dice(&lowered, &key.to_lowercase());
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((key, score));
            }
        }
        match best {
            Some((key, score)) if score >= self.similarity_threshold => Ok(Resolution {
                table: key.clone(),
                tier: MatchTier::Fuzzy,
                score,
            }),
            _ => Err(AssistantError::NoTableMatch {
                candidate: candidate.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_always_wins() {
        let resolver = TableResolver::default();
        let catalog = keys(&["Decision", "DecisionMaker", "DecisionMaker2"]);
        let resolved = resolver.resolve("Decision", &catalog).unwrap();
        assert_eq!(resolved.table, "Decision");
        assert_eq!(resolved.tier, MatchTier::Exact);
    }

    #[test]
    fn unique_substring_match_resolves() {
        let resolver = TableResolver::default();
        let catalog = keys(&["Age_18_34", "Age_35_54"]);
        let resolved = resolver.resolve("18_34", &catalog).unwrap();
        assert_eq!(resolved.table, "Age_18_34");
        assert_eq!(resolved.tier, MatchTier::Substring);
    }

    #[test]
    fn substring_match_ignores_case() {
        let resolver = TableResolver::default();
        let catalog = keys(&["DecisionMaker", "Age_18_34"]);
        let resolved = resolver.resolve("decisionmaker", &catalog).unwrap();
        assert_eq!(resolved.table, "DecisionMaker");
        assert_eq!(resolved.tier, MatchTier::Substring);
    }

    #[test]
    fn ambiguous_substring_falls_through_to_fuzzy_by_default() {
        let resolver = TableResolver::default();
        let catalog = keys(&["DecisionMaker1", "DecisionMaker2"]);
        let resolved = resolver.resolve("Decision", &catalog).unwrap();
        assert_eq!(resolved.tier, MatchTier::Fuzzy);
        // Ties go to the first key in catalog order.
        assert_eq!(resolved.table, "DecisionMaker1");
        assert!(resolved.score >= 0.6);
    }

    #[test]
    fn ambiguous_substring_hard_fails_under_fail_policy() {
        let resolver = TableResolver::new(0.6, AmbiguousPolicy::Fail);
        let catalog = keys(&["DecisionMaker1", "DecisionMaker2"]);
        let err = resolver.resolve("Decision", &catalog).unwrap_err();
        match err {
            AssistantError::AmbiguousTableMatch { candidate, matches } => {
                assert_eq!(candidate, "Decision");
                assert_eq!(matches, vec!["DecisionMaker1", "DecisionMaker2"]);
            }
            other => panic!("expected ambiguous match, got {:?}", other),
        }
    }

    #[test]
    fn fuzzy_accepts_score_at_threshold() {
        let resolver = TableResolver::default();
        // Bigram overlap of "abcdxy" and "abcdef" is exactly 0.6.
        let catalog = keys(&["abcdef"]);
        let resolved = resolver.resolve("abcdxy", &catalog).unwrap();
        assert_eq!(resolved.table, "abcdef");
        assert_eq!(resolved.tier, MatchTier::Fuzzy);
        assert!((resolved.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_rejects_score_below_threshold() {
        let resolver = TableResolver::default();
        // Bigram overlap of "abcdxyz" and "abcdef" is 6/11, below 0.6.
        let catalog = keys(&["abcdef"]);
        let err = resolver.resolve("abcdxyz", &catalog).unwrap_err();
        assert!(matches!(err, AssistantError::NoTableMatch { .. }));
    }

    #[test]
    fn empty_candidate_fails_immediately() {
        let resolver = TableResolver::default();
        let catalog = keys(&["Age_18_34", "DecisionMaker"]);
        assert!(resolver.resolve("", &catalog).is_err());
        assert!(resolver.resolve("   ", &catalog).is_err());
    }

    #[test]
    fn no_keys_never_resolves() {
        let resolver = TableResolver::default();
        assert!(resolver.resolve("anything", &[]).is_err());
    }
}
