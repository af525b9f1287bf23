//! Rule-based entry analysis.
//!
//! Everything here is a deterministic function of the entry text: sentiment
//! comes from two keyword sets, insights from a fixed ordered rule list, the
//! summary from the leading sentences, and recommendations from a table keyed
//! by sentiment. [`HeuristicEngine`] wraps [`analyze_text`] behind the
//! [`AnalysisEngine`] trait so a model-backed engine can be swapped in.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{EngineConfig, EngineKind};
use crate::diary_entry::{Analysis, Sentiment};
use crate::error::{DiaryError, Result};
use crate::remote_engine::RemoteEngine;
use crate::text_features::{contains_any, sentence_segments, word_count};

pub const POSITIVE_WORDS: &[&str] = &[
    "happy", "joy", "excited", "grateful", "love", "wonderful", "great", "excellent", "amazing",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "sad", "angry", "frustrated", "worried", "anxious", "upset", "terrible", "awful", "hate",
];

pub const FALLBACK_INSIGHT: &str = "Continue journaling to track your personal growth";
pub const NOTHING_TO_SUMMARIZE: &str = "No content to summarize";

/// Upper bound on the simulated engine latency.
pub const MAX_SIMULATED_LATENCY: Duration = Duration::from_secs(10);

const LONG_ENTRY_WORDS: usize = 100;
const SHORT_ENTRY_WORDS: usize = 30;

#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Fails with [`DiaryError::InvalidInput`] when `content` is empty.
    async fn analyze(&self, content: &str) -> Result<Analysis>;
}

pub fn classify_sentiment(content: &str) -> Sentiment {
    let positive = contains_any(content, POSITIVE_WORDS);
    let negative = contains_any(content, NEGATIVE_WORDS);

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else if positive > 0 {
        // equal and non-zero
        Sentiment::Mixed
    } else {
        Sentiment::Neutral
    }
}

struct InsightRule {
    applies: fn(&str, usize) -> bool,
    insight: &'static str,
}

fn is_long(_: &str, words: usize) -> bool {
    words > LONG_ENTRY_WORDS
}

fn is_short(_: &str, words: usize) -> bool {
    words < SHORT_ENTRY_WORDS
}

fn expresses_feelings(text: &str, _: usize) -> bool {
    contains_any(text, &["i feel", "i felt"]) > 0
}

fn mentions_recent_events(text: &str, _: usize) -> bool {
    contains_any(text, &["today", "yesterday"]) > 0
}

fn mentions_goals(text: &str, _: usize) -> bool {
    contains_any(text, &["goal", "plan"]) > 0
}

const INSIGHT_RULES: &[InsightRule] = &[
    InsightRule {
        applies: is_long,
        insight: "This is a detailed entry showing deep reflection",
    },
    InsightRule {
        applies: is_short,
        insight: "Consider expanding on your thoughts for more depth",
    },
    InsightRule {
        applies: expresses_feelings,
        insight: "You are expressing your emotions openly",
    },
    InsightRule {
        applies: mentions_recent_events,
        insight: "You are reflecting on recent events",
    },
    InsightRule {
        applies: mentions_goals,
        insight: "You are thinking about future objectives",
    },
];

/// Applies each insight rule once, in declaration order. Never returns an empty list.
pub fn generate_insights(content: &str) -> Vec<String> {
    let words = word_count(content);
    let mut insights: Vec<String> = INSIGHT_RULES
        .iter()
        .filter(|rule| (rule.applies)(content, words))
        .map(|rule| rule.insight.to_string())
        .collect();

    if insights.is_empty() {
        insights.push(FALLBACK_INSIGHT.to_string());
    }
    insights
}

pub fn summarize(content: &str) -> String {
    let sentences = sentence_segments(content);
    match sentences.len() {
        0 => NOTHING_TO_SUMMARIZE.to_string(),
        1 => content.trim().to_string(),
        n => format!("{}.", sentences[..n.min(2)].join(". ")),
    }
}

pub fn recommendations_for(sentiment: Sentiment) -> &'static [&'static str] {
    match sentiment {
        Sentiment::Positive => &[
            "Capture what made today special to revisit later",
            "Consider sharing your positive energy with others",
        ],
        Sentiment::Negative => &[
            "Remember that difficult times are temporary",
            "Consider talking to someone you trust",
            "Practice self-care activities you enjoy",
        ],
        Sentiment::Mixed => &[
            "Acknowledge both the highs and lows of your day",
            "Reflect on what you learned from today's experiences",
        ],
        Sentiment::Neutral => &[
            "Continue documenting your daily experiences",
            "Try adding more detail about your feelings",
        ],
    }
}

/// Runs the full heuristic pipeline. Sentiment is computed first since the
/// recommendations depend on it.
pub fn analyze_text(content: &str) -> Result<Analysis> {
    if content.is_empty() {
        return Err(DiaryError::InvalidInput);
    }

    let sentiment = classify_sentiment(content);
    Ok(Analysis {
        sentiment,
        insights: generate_insights(content),
        summary: summarize(content),
        recommendations: recommendations_for(sentiment)
            .iter()
            .map(|r| r.to_string())
            .collect(),
        generated_at: Utc::now(),
    })
}

/// Keyword engine with an optional artificial delay standing in for model latency.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEngine {
    latency: Duration,
}

impl HeuristicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays longer than [`MAX_SIMULATED_LATENCY`] are clamped.
    pub fn with_latency(latency: Duration) -> Self {
        HeuristicEngine {
            latency: latency.min(MAX_SIMULATED_LATENCY),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[async_trait]
impl AnalysisEngine for HeuristicEngine {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn analyze(&self, content: &str) -> Result<Analysis> {
        if content.is_empty() {
            return Err(DiaryError::InvalidInput);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let analysis = analyze_text(content)?;
        debug!(sentiment = %analysis.sentiment, insights = analysis.insights.len(), "heuristic analysis complete");
        Ok(analysis)
    }
}

/// Picks the engine named by the configuration.
///
/// A remote engine without an endpoint or API key falls back to the heuristic one.
pub fn build_engine(config: &EngineConfig) -> Arc<dyn AnalysisEngine> {
    let heuristic = || {
        Arc::new(HeuristicEngine::with_latency(Duration::from_millis(
            config.simulated_latency_ms,
        ))) as Arc<dyn AnalysisEngine>
    };

    match config.kind {
        EngineKind::Heuristic => heuristic(),
        EngineKind::Remote => match RemoteEngine::from_config(&config.remote) {
            Some(engine) => Arc::new(engine),
            None => {
                warn!("remote analysis engine is not configured, using heuristic analysis");
                heuristic()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use rstest::rstest;

    fn table(sentiment: Sentiment) -> Vec<String> {
        recommendations_for(sentiment)
            .iter()
            .map(|r| r.to_string())
            .collect()
    }

    #[test]
    fn happy_entry_is_positive() {
        let analysis =
            analyze_text("I am so happy and grateful today, what a wonderful day!").unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.recommendations, table(Sentiment::Positive));
    }

    #[test]
    fn sad_entry_is_negative_with_three_recommendations() {
        let analysis = analyze_text("I feel sad and anxious, this is terrible.").unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Negative);
        assert_eq!(analysis.recommendations.len(), 3);
        assert_eq!(analysis.recommendations, table(Sentiment::Negative));
    }

    #[test]
    fn one_match_each_is_mixed() {
        let analysis = analyze_text("I am happy but also sad about today.").unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Mixed);
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(matches!(analyze_text(""), Err(DiaryError::InvalidInput)));
    }

    #[rstest]
    #[case("happy and sad", Sentiment::Mixed)]
    #[case("happy, joyful, but angry and upset", Sentiment::Mixed)]
    #[case("happy, joyful and excited but upset", Sentiment::Positive)]
    #[case("happy but angry and upset", Sentiment::Negative)]
    #[case("The meeting ran long and the train was late", Sentiment::Neutral)]
    #[case("HAPPY happy Happy but sad", Sentiment::Mixed)]
    fn sentiment_boundaries(#[case] text: &str, #[case] expected: Sentiment) {
        assert_eq!(classify_sentiment(text), expected);
    }

    #[test]
    fn short_entry_gets_expansion_insight_only() {
        assert_eq!(
            generate_insights("Quiet evening at home"),
            vec!["Consider expanding on your thoughts for more depth"]
        );
    }

    #[test]
    fn insights_follow_rule_order() {
        let insights = generate_insights("I feel ready. My goal today is simple.");
        assert_eq!(
            insights,
            vec![
                "Consider expanding on your thoughts for more depth",
                "You are expressing your emotions openly",
                "You are reflecting on recent events",
                "You are thinking about future objectives",
            ]
        );
    }

    #[test]
    fn medium_entry_without_triggers_gets_fallback() {
        let text = "word ".repeat(50);
        assert_eq!(generate_insights(&text), vec![FALLBACK_INSIGHT]);
    }

    #[test]
    fn long_entry_is_detailed() {
        let text = "reflection ".repeat(120);
        let insights = generate_insights(&text);
        assert_eq!(insights[0], "This is a detailed entry showing deep reflection");
        assert_eq!(insights.len(), 1);
    }

    #[rstest]
    #[case("  Just one thought  ", "Just one thought")]
    #[case("One. Two! Three?", "One. Two.")]
    #[case("First part.   Second part...", "First part. Second part.")]
    #[case("...", NOTHING_TO_SUMMARIZE)]
    fn summaries(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(summarize(text), expected);
    }

    #[test]
    fn non_empty_content_always_yields_summary_and_insights() {
        for text in ["a", " ", "!!!", "x. y. z.", "I felt nothing"] {
            let analysis = analyze_text(text).unwrap();
            assert!(!analysis.summary.is_empty(), "empty summary for {text:?}");
            assert!(!analysis.insights.is_empty(), "no insights for {text:?}");
            assert!(!analysis.recommendations.is_empty());
        }
    }

    #[rstest]
    #[case(Sentiment::Positive, 2)]
    #[case(Sentiment::Negative, 3)]
    #[case(Sentiment::Mixed, 2)]
    #[case(Sentiment::Neutral, 2)]
    fn recommendation_table_sizes(#[case] sentiment: Sentiment, #[case] len: usize) {
        assert_eq!(recommendations_for(sentiment).len(), len);
        assert_eq!(recommendations_for(sentiment), recommendations_for(sentiment));
    }

    #[tokio::test]
    async fn heuristic_engine_matches_pure_pipeline() {
        let engine = HeuristicEngine::new();
        let text = "Yesterday was awful. I plan to rest.";
        let from_engine = engine.analyze(text).await.unwrap();
        let direct = analyze_text(text).unwrap();
        assert_eq!(from_engine.sentiment, direct.sentiment);
        assert_eq!(from_engine.insights, direct.insights);
        assert_eq!(from_engine.summary, direct.summary);
        assert_eq!(from_engine.recommendations, direct.recommendations);
    }

    #[tokio::test]
    async fn heuristic_engine_rejects_empty_content() {
        let result = HeuristicEngine::new().analyze("").await;
        assert!(matches!(result, Err(DiaryError::InvalidInput)));
    }

    #[test]
    fn latency_is_clamped() {
        let engine = HeuristicEngine::with_latency(Duration::from_secs(600));
        assert_eq!(engine.latency(), MAX_SIMULATED_LATENCY);
    }

    #[test]
    fn unconfigured_remote_falls_back_to_heuristic() {
        let config = EngineConfig {
            kind: EngineKind::Remote,
            simulated_latency_ms: 0,
            remote: RemoteConfig {
                endpoint: String::new(),
                api_key: String::new(),
                ..RemoteConfig::default()
            },
        };
        assert_eq!(build_engine(&config).name(), "heuristic");
    }

    #[test]
    fn configured_remote_is_selected() {
        let config = EngineConfig {
            kind: EngineKind::Remote,
            simulated_latency_ms: 0,
            remote: RemoteConfig {
                endpoint: "http://localhost:9/v1/messages".into(),
                api_key: "key".into(),
                ..RemoteConfig::default()
            },
        };
        assert_eq!(build_engine(&config).name(), "remote");
    }
}
