//! Responder selection: keyword voting with a conversation-context fallback.
//!
//! A category wins only with a strictly highest, nonzero count of distinct
//! keyword hits. The query is scored first; on a tie or no hits, the last
//! four turns of history are scored the same way; failing that, the
//! catch-all category is chosen.

use std::collections::BTreeMap;

use routewise_config::{AppConfig, GENERAL_CATEGORY};
use routewise_core::message::Turn;
use serde::Serialize;

/// Number of trailing history turns consulted by the context pass.
pub const CONTEXT_WINDOW: usize = 4;

/// Which pass produced a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPhase {
    Query,
    Context,
    Fallback,
}

/// The outcome of classifying one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub category: String,
    /// Keyword counts of the last pass that ran
    pub scores: BTreeMap<String, usize>,
    pub phase: DecisionPhase,
}

#[derive(Debug, Clone)]
struct KeywordSet {
    category: String,
    keywords: Vec<String>,
}

/// Deterministic keyword-count classifier.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    categories: Vec<KeywordSet>,
    fallback: String,
}

impl SelectionPolicy {
    /// Build from `(category, keywords)` pairs. Keywords are lower-cased.
    pub fn new<I, K>(categories: I) -> Self
    where
        I: IntoIterator<Item = (String, K)>,
        K: IntoIterator<Item = String>,
    {
        Self {
            categories: categories
                .into_iter()
                .map(|(category, keywords)| KeywordSet {
                    category,
                    keywords: keywords
                        .into_iter()
                        .map(|k| k.to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect(),
                })
                .collect(),
            fallback: GENERAL_CATEGORY.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config
                .categories
                .iter()
                .map(|c| (c.id.clone(), c.keywords.clone())),
        )
    }

    /// Route `query`, consulting `history` only when the query alone has
    /// no strict winner.
    pub fn classify(&self, query: &str, history: &[Turn]) -> RoutingDecision {
        let scores = self.score(query);
        if let Some(category) = strict_winner(&scores) {
            return RoutingDecision {
                category,
                scores,
                phase: DecisionPhase::Query,
            };
        }

        if !history.is_empty() {
            let start = history.len().saturating_sub(CONTEXT_WINDOW);
            let context = history[start..]
                .iter()
                .map(|t| t.content.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let context_scores = self.score(&context);
            if let Some(category) = strict_winner(&context_scores) {
                return RoutingDecision {
                    category,
                    scores: context_scores,
                    phase: DecisionPhase::Context,
                };
            }
            return self.fall_back(context_scores);
        }

        self.fall_back(scores)
    }

    /// Distinct keyword hits per category.
    pub fn score(&self, text: &str) -> BTreeMap<String, usize> {
        let text = text.to_lowercase();
        self.categories
            .iter()
            .map(|set| {
                let hits = set
                    .keywords
                    .iter()
                    .filter(|k| text.contains(k.as_str()))
                    .count();
                (set.category.clone(), hits)
            })
            .collect()
    }

    fn fall_back(&self, scores: BTreeMap<String, usize>) -> RoutingDecision {
        RoutingDecision {
            category: self.fallback.clone(),
            scores,
            phase: DecisionPhase::Fallback,
        }
    }
}

fn strict_winner(scores: &BTreeMap<String, usize>) -> Option<String> {
    let best = scores.values().copied().max().unwrap_or(0);
    if best == 0 {
        return None;
    }
    let mut leaders = scores.iter().filter(|(_, s)| **s == best);
    let (winner, _) = leaders.next()?;
    match leaders.next() {
        Some(_) => None,
        None => Some(winner.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SelectionPolicy {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        SelectionPolicy::new(vec![
            ("general".to_string(), vec![]),
            ("alpha".to_string(), words(&["apple", "apricot", "avocado", "shared"])),
            ("beta".to_string(), words(&["banana", "blueberry", "shared"])),
        ])
    }

    #[test]
    fn strict_winner_on_query() {
        let d = policy().classify("apple apricot avocado and a banana", &[]);
        assert_eq!(d.category, "alpha");
        assert_eq!(d.phase, DecisionPhase::Query);
        assert_eq!(d.scores["alpha"], 3);
        assert_eq!(d.scores["beta"], 1);
    }

    #[test]
    fn repeated_keyword_counts_once() {
        let d = policy().classify("banana banana banana apple apricot", &[]);
        assert_eq!(d.category, "alpha");
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let d = policy().classify("BLUEBERRY pie", &[]);
        assert_eq!(d.category, "beta");
    }

    #[test]
    fn zero_hits_and_no_history_is_general() {
        let d = policy().classify("hello there", &[]);
        assert_eq!(d.category, "general");
        assert_eq!(d.phase, DecisionPhase::Fallback);
    }

    #[test]
    fn tie_with_no_history_is_general() {
        let d = policy().classify("apple banana", &[]);
        assert_eq!(d.category, "general");
    }

    #[test]
    fn shared_keyword_alone_is_a_tie() {
        let d = policy().classify("shared", &[]);
        assert_eq!(d.category, "general");
        assert_eq!(d.scores["alpha"], 1);
        assert_eq!(d.scores["beta"], 1);
    }

    #[test]
    fn tie_falls_back_to_context() {
        let history = vec![
            Turn::user("tell me about blueberry farming"),
            Turn::responder("blueberry farms need acidic soil"),
        ];
        let d = policy().classify("what about apples and bananas?", &history);
        assert_eq!(d.category, "beta");
        assert_eq!(d.phase, DecisionPhase::Context);
    }

    #[test]
    fn context_uses_only_last_four_turns() {
        let history = vec![
            Turn::user("apple apricot avocado"),
            Turn::responder("ok"),
            Turn::user("nothing"),
            Turn::responder("nothing"),
            Turn::user("banana"),
            Turn::responder("sure"),
        ];
        let d = policy().classify("and then?", &history);
        assert_eq!(d.category, "beta");
    }

    #[test]
    fn context_tie_is_general() {
        let history = vec![Turn::user("apple"), Turn::responder("banana")];
        let d = policy().classify("more please", &history);
        assert_eq!(d.category, "general");
        assert_eq!(d.phase, DecisionPhase::Fallback);
    }

    #[test]
    fn classification_is_deterministic() {
        let p = policy();
        let history = vec![Turn::user("apple"), Turn::responder("apricot")];
        let a = p.classify("shared things", &history);
        let b = p.classify("shared things", &history);
        assert_eq!(a, b);
    }

    #[test]
    fn default_config_routes_admissions_and_ai() {
        let p = SelectionPolicy::from_config(&AppConfig::default());
        assert_eq!(p.classify("What are the admission requirements?", &[]).category, "admissions");
        assert_eq!(
            p.classify("How does a neural network learn in deep learning?", &[]).category,
            "ai"
        );
        assert_eq!(p.classify("What's the capital of France?", &[]).category, "general");
    }
}
