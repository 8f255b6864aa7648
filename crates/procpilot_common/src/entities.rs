//! Entity Extractor - typed entities from raw input
//!
//! Additive passes over the input (AI detection, identifier tokens, action
//! keywords, metric/status keywords). Deliberately permissive: surplus
//! process candidates are filtered downstream by the action detector and
//! input analyzer.

use procpilot_shared::{ActionTarget, ActionType, AiActionDetection, EntityType, ExtractedEntity};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Confidence of identifier tokens taken as process names
pub const PROCESS_CONFIDENCE: f32 = 0.7;
/// Confidence of keyword-matched actions
pub const ACTION_CONFIDENCE: f32 = 0.9;
/// Confidence of metric, status and threshold keywords
pub const KEYWORD_CONFIDENCE: f32 = 0.8;
/// AI detections at or below this are ignored
pub const AI_ENTITY_THRESHOLD: f32 = 0.5;

/// Action keyword → canonical type
pub const ACTION_KEYWORDS: &[(&str, ActionType)] = &[
    ("restart", ActionType::Restart),
    ("reboot", ActionType::Restart),
    ("reload", ActionType::Restart),
    ("relaunch", ActionType::Restart),
    ("bounce", ActionType::Restart),
    ("stop", ActionType::Stop),
    ("kill", ActionType::Stop),
    ("halt", ActionType::Stop),
    ("terminate", ActionType::Stop),
    ("shutdown", ActionType::Stop),
    ("shut down", ActionType::Stop),
    ("start", ActionType::Start),
    ("launch", ActionType::Start),
    ("spin up", ActionType::Start),
    ("status", ActionType::Status),
    ("health", ActionType::Status),
    ("state", ActionType::Status),
    ("list", ActionType::Status),
    ("logs", ActionType::Logs),
    ("log", ActionType::Logs),
    ("tail", ActionType::Logs),
    ("metrics", ActionType::Metrics),
    ("monitor", ActionType::Metrics),
    ("info", ActionType::Info),
    ("describe", ActionType::Info),
    ("details", ActionType::Info),
];

pub const METRIC_KEYWORDS: &[&str] = &["memory", "cpu", "usage", "performance", "speed"];

pub const STATUS_KEYWORDS: &[&str] = &["online", "offline", "errored", "stopped", "running"];

/// Words never taken as process names
const COMMON_WORDS: &[&str] = &[
    // articles, prepositions, conjunctions
    "a", "an", "the", "to", "for", "of", "in", "on", "at", "by", "with", "from", "about", "into",
    "over", "above", "below", "under", "and", "or", "but", "then", "than", "so", "as", "if",
    // pronouns
    "i", "me", "my", "mine", "you", "your", "it", "its", "this", "that", "these", "those", "them",
    "they", "their", "he", "she", "we", "us", "our", "one",
    // auxiliaries and question words
    "is", "are", "was", "were", "be", "been", "am", "do", "does", "did", "can", "could",
    "should", "would", "will", "has", "have", "had", "what", "why", "how", "when", "where",
    "which", "who",
    // politeness, fillers, generic nouns
    "please", "pls", "thanks", "now", "again", "just", "some", "any", "there", "here", "not",
    "no", "yes", "too", "much", "many", "very", "up", "show", "display", "get", "check", "give",
    "view", "tell", "see", "let", "keep", "keeps", "using", "process", "processes", "app", "apps",
    "service", "services",
    // session commands
    "stats", "history", "help",
    // batch words
    "all", "everything", "every",
    // symptom words
    "slow", "fast", "high", "low", "crash", "crashing", "crashed", "error", "errors", "fail",
    "failing", "failed", "broken", "down", "issue", "issues", "problem", "problems",
];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9_-]*(?:\.[A-Za-z0-9_-]+)*").unwrap());

static THRESHOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:%|mb|gb|kb)").unwrap());

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut words: HashSet<&'static str> = COMMON_WORDS.iter().copied().collect();
    words.extend(ACTION_KEYWORDS.iter().flat_map(|(kw, _)| kw.split(' ')));
    words.extend(ActionType::ALL.iter().map(ActionType::as_str));
    words.extend(METRIC_KEYWORDS.iter().copied());
    words.extend(STATUS_KEYWORDS.iter().copied());
    words
});

/// Stop-word test shared with the rest of the pipeline
pub fn is_common_word(word: &str) -> bool {
    STOP_WORDS.contains(word.to_lowercase().as_str())
}

#[derive(Debug, Clone, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn is_common_word(&self, word: &str) -> bool {
        is_common_word(word)
    }

    pub fn extract_entities(
        &self,
        input: &str,
        ai_detection: Option<&AiActionDetection>,
    ) -> Vec<ExtractedEntity> {
        let mut entities = Vec::new();

        if let Some(detection) = ai_detection {
            entities.extend(ai_entities(detection));
        }

        let thresholds = threshold_entities(input);
        entities.extend(process_entities(input, &thresholds));
        entities.extend(action_entities(input));
        entities.extend(keyword_entities(input, METRIC_KEYWORDS, EntityType::Metric));
        entities.extend(keyword_entities(input, STATUS_KEYWORDS, EntityType::Status));
        entities.extend(thresholds);

        entities
    }
}

fn ai_entities(detection: &AiActionDetection) -> Vec<ExtractedEntity> {
    let Some(action) = detection.action_above(AI_ENTITY_THRESHOLD) else {
        return Vec::new();
    };

    let mut out = vec![ExtractedEntity::new(
        EntityType::Action,
        action.as_str(),
        detection.confidence,
    )];
    if let Some(ActionTarget::Process(name)) = &detection.target {
        out.push(ExtractedEntity::new(
            EntityType::Process,
            name.clone(),
            detection.confidence,
        ));
    }
    out
}

fn process_entities(input: &str, thresholds: &[ExtractedEntity]) -> Vec<ExtractedEntity> {
    let mut seen = HashSet::new();
    IDENTIFIER
        .find_iter(input)
        .filter(|m| !is_common_word(m.as_str()))
        .filter(|m| {
            !thresholds.iter().any(|t| match t.position {
                Some((start, end)) => m.start() < end && start < m.end(),
                None => false,
            })
        })
        .filter(|m| seen.insert(m.as_str().to_string()))
        .map(|m| {
            ExtractedEntity::new(EntityType::Process, m.as_str(), PROCESS_CONFIDENCE)
                .at(m.start(), m.end())
        })
        .collect()
}

/// Keyword hits anchored at a word start, one per canonical type, in input order
fn action_entities(input: &str) -> Vec<ExtractedEntity> {
    let lower = input.to_ascii_lowercase();
    let mut hits: Vec<(usize, usize, ActionType)> = Vec::new();

    for (keyword, action_type) in ACTION_KEYWORDS {
        for (start, _) in lower.match_indices(keyword) {
            if !at_word_start(&lower, start) {
                continue;
            }
            let word = word_at(&lower, start);
            if STATUS_KEYWORDS.contains(&word) {
                continue;
            }
            hits.push((start, start + keyword.len(), *action_type));
        }
    }

    // A keyword inside a longer hit ("log" in "logs") is not reported
    let kept: Vec<(usize, usize, ActionType)> = hits
        .iter()
        .filter(|(s, e, _)| {
            !hits
                .iter()
                .any(|(os, oe, _)| *os <= *s && *oe >= *e && (oe - os) > (e - s))
        })
        .copied()
        .collect();

    let mut ordered = kept;
    ordered.sort_by_key(|(start, _, _)| *start);

    let mut emitted = HashSet::new();
    ordered
        .into_iter()
        .filter(|(_, _, action_type)| emitted.insert(*action_type))
        .map(|(start, end, action_type)| {
            ExtractedEntity::new(EntityType::Action, action_type.as_str(), ACTION_CONFIDENCE)
                .at(start, end)
        })
        .collect()
}

fn keyword_entities(input: &str, keywords: &[&str], entity_type: EntityType) -> Vec<ExtractedEntity> {
    let lower = input.to_ascii_lowercase();
    keywords
        .iter()
        .filter_map(|keyword| {
            lower
                .match_indices(keyword)
                .find(|(start, _)| {
                    at_word_start(&lower, *start) && word_at(&lower, *start) == *keyword
                })
                .map(|(start, _)| {
                    ExtractedEntity::new(entity_type, *keyword, KEYWORD_CONFIDENCE)
                        .at(start, start + keyword.len())
                })
        })
        .collect()
}

fn threshold_entities(input: &str) -> Vec<ExtractedEntity> {
    THRESHOLD
        .find_iter(input)
        .map(|m| {
            let value: String = m.as_str().split_whitespace().collect();
            ExtractedEntity::new(EntityType::Threshold, value.to_lowercase(), KEYWORD_CONFIDENCE)
                .at(m.start(), m.end())
        })
        .collect()
}

fn at_word_start(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .map(|c| !c.is_alphanumeric())
        .unwrap_or(true)
}

fn word_at(text: &str, index: usize) -> &str {
    text[index..]
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or("")
}
