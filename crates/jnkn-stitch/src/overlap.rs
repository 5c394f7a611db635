//! Significant token overlap scoring (spec §4.3).

use std::collections::HashSet;

/// Tokens too generic to count as a signal on their own.
const DEFAULT_STOP_TOKENS: &[&str] = &["the", "db", "api"];

/// Tuning knobs for the stitcher, loaded from `stitcher.*` config keys.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub min_confidence: f32,
    pub min_overlap_tokens: usize,
    pub min_token_length: usize,
    pub weak_token_penalty: f32,
    pub stop_tokens: HashSet<String>,
    pub weak_tokens: HashSet<String>,
    pub enabled_rules: HashSet<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            min_confidence: 0.5,
            min_overlap_tokens: 1,
            min_token_length: 2,
            weak_token_penalty: 0.5,
            stop_tokens: DEFAULT_STOP_TOKENS.iter().map(|s| s.to_string()).collect(),
            weak_tokens: HashSet::new(),
            enabled_rules: [
                "env_to_infra",
                "infra_to_config",
                "infra_to_infra",
                "data_alias",
            ]
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl MatchConfig {
    pub fn rule_enabled(&self, name: &str) -> bool {
        self.enabled_rules.contains(name)
    }
}

/// Cosine-style overlap over two token sets, per spec §4.3:
///
/// ```text
/// common = distinct(a) ∩ distinct(b)
/// score  = |common| / sqrt(|distinct(a)| * |distinct(b)|)
/// ```
///
/// Stop tokens never contribute to `common`. A lone shared token that's on
/// the weak list is penalized by `config.weak_token_penalty`.
pub fn significant_token_overlap(
    tokens_a: &[String],
    tokens_b: &[String],
    config: &MatchConfig,
) -> (Vec<String>, f32) {
    let distinct_a: HashSet<&String> = tokens_a
        .iter()
        .filter(|t| t.len() >= config.min_token_length && !config.stop_tokens.contains(*t))
        .collect();
    let distinct_b: HashSet<&String> = tokens_b
        .iter()
        .filter(|t| t.len() >= config.min_token_length && !config.stop_tokens.contains(*t))
        .collect();

    if distinct_a.is_empty() || distinct_b.is_empty() {
        return (Vec::new(), 0.0);
    }

    let mut common: Vec<String> = distinct_a.intersection(&distinct_b).map(|t| (*t).clone()).collect();
    common.sort();

    if common.is_empty() {
        return (common, 0.0);
    }

    let mut score = common.len() as f32 / ((distinct_a.len() * distinct_b.len()) as f32).sqrt();

    if common.len() == 1 && config.weak_tokens.contains(&common[0]) {
        score *= config.weak_token_penalty;
    }

    (common, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize;

    #[test]
    fn exact_name_match_scores_one() {
        let config = MatchConfig::default();
        let tokens = tokenize("payment_db_host");
        let (_, score) = significant_token_overlap(&tokens, &tokens, &config);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn single_shared_significant_token_lands_around_half() {
        let config = MatchConfig::default();
        let a = tokenize("payment_db_host");
        let b = tokenize("payment_service");
        let (common, score) = significant_token_overlap(&a, &b, &config);
        assert_eq!(common, vec!["payment".to_string()]);
        assert!((0.3..0.6).contains(&score), "score was {score}");
    }

    #[test]
    fn no_overlap_scores_zero() {
        let config = MatchConfig::default();
        let a = tokenize("payment_db_host");
        let b = tokenize("unrelated_name");
        let (common, score) = significant_token_overlap(&a, &b, &config);
        assert!(common.is_empty());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn weak_single_token_match_is_penalized() {
        let mut config = MatchConfig::default();
        config.weak_tokens.insert("service".to_string());
        let a = tokenize("user-service");
        let b = tokenize("order-service");
        let (common, score) = significant_token_overlap(&a, &b, &config);
        assert_eq!(common, vec!["service".to_string()]);
        assert!(score < 0.5 * 1.0);
    }

    #[test]
    fn significant_overlap_matches_reference_example() {
        let config = MatchConfig::default();
        let t1 = vec!["a".to_string(), "very".to_string(), "long".to_string(), "token".to_string()];
        let t2 = vec!["a".to_string(), "very".to_string(), "short".to_string(), "token".to_string()];
        let (overlap, score): (HashSet<String>, f32) = {
            let (c, s) = significant_token_overlap(&t1, &t2, &config);
            (c.into_iter().collect(), s)
        };
        assert_eq!(overlap, HashSet::from(["very".to_string(), "token".to_string()]));
        assert!(score > 0.0);
    }
}
