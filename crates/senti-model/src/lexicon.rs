//! Offline word-list sentiment backend
//!
//! Scores text by counting positive and negative words, flipping a word's
//! polarity when it directly follows a negator. Extra words can be supplied
//! in `<cache_dir>/<model-slug>/lexicon.txt`, one per line, prefixed with `+`
//! or `-`; blank lines and lines starting with `#` are ignored.

use crate::manager::ResourceLoader;
use crate::model::SentimentModel;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use senti_core::{ModelSettings, Prediction, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// File name of the optional word list inside the model directory
pub const LEXICON_FILE: &str = "lexicon.txt";

const POSITIVE: &str = "POSITIVE";
const NEGATIVE: &str = "NEGATIVE";

/// Highest confidence reported
const MAX_SCORE: f32 = 0.9999;

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "awesome", "beautiful", "best", "brilliant", "delight", "delighted", "delightful",
    "enjoy", "enjoyed", "excellent", "fantastic", "fine", "glad", "good", "great", "happy",
    "helpful", "impressive", "like", "liked", "love", "loved", "lovely", "nice", "perfect",
    "pleasant", "pleased", "recommend", "satisfied", "superb", "terrific", "thanks", "useful",
    "win", "wonderful", "works", "worth",
];

const NEGATIVE_WORDS: &[&str] = &[
    "angry", "annoying", "awful", "bad", "boring", "broken", "disappointed", "disappointing",
    "dislike", "fail", "failed", "fails", "hate", "hated", "horrible", "poor", "problem", "sad",
    "slow", "terrible", "ugly", "unhappy", "useless", "waste", "worse", "worst", "wrong",
];

const NEGATORS: &[&str] = &["not", "no", "never", "don't", "doesn't", "isn't", "wasn't", "didn't"];

/// Word-list sentiment classifier
#[derive(Debug, Clone)]
pub struct LexiconModel {
    name: String,
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl LexiconModel {
    /// Create a model with the built-in word lists
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positive: POSITIVE_WORDS.iter().map(|w| w.to_string()).collect(),
            negative: NEGATIVE_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Merge a word list in the `+word` / `-word` format
    pub fn extend_from_str(&mut self, contents: &str) -> anyhow::Result<usize> {
        let mut added = 0;
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut chars = line.chars();
            let Some(polarity) = chars.next() else {
                continue;
            };
            let word = chars.as_str().trim().to_lowercase();
            if polarity != '+' && polarity != '-' {
                return Err(anyhow!(
                    "line {}: expected '+' or '-' prefix, found '{}'",
                    line_no + 1,
                    polarity
                ));
            }
            if word.is_empty() {
                return Err(anyhow!("line {}: missing word after '{}'", line_no + 1, polarity));
            }

            if polarity == '+' {
                self.negative.remove(&word);
                self.positive.insert(word);
            } else {
                self.positive.remove(&word);
                self.negative.insert(word);
            }
            added += 1;
        }
        Ok(added)
    }

    /// Score `text`, returning the winning label and its confidence
    fn score(&self, text: &str) -> (&'static str, f32) {
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty());

        let mut positive = 0u32;
        let mut negative = 0u32;
        let mut negated = false;

        for token in tokens {
            if NEGATORS.contains(&token) {
                negated = true;
                continue;
            }

            let polarity = if self.positive.contains(token) {
                Some(true)
            } else if self.negative.contains(token) {
                Some(false)
            } else {
                None
            };

            match polarity.map(|p| p != negated) {
                Some(true) => positive += 1,
                Some(false) => negative += 1,
                None => {}
            }
            negated = false;
        }

        let total = (positive + negative) as f32;
        let margin = (positive as f32 - negative as f32).abs();
        let confidence = (0.5 + 0.5 * margin / (total + 1.0)).min(MAX_SCORE);

        if negative > positive {
            (NEGATIVE, confidence)
        } else {
            (POSITIVE, confidence)
        }
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, text: &str) -> Result<Vec<Prediction>> {
        let (label, score) = self.score(text);
        let other = if label == POSITIVE { NEGATIVE } else { POSITIVE };

        Ok(vec![
            Prediction::new(label, score),
            Prediction::new(other, 1.0 - score),
        ])
    }
}

/// Builds a [`LexiconModel`], merging the cached word list when present
#[derive(Debug, Clone)]
pub struct LexiconLoader {
    name: String,
    lexicon_path: PathBuf,
}

impl LexiconLoader {
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            name: settings.name.clone(),
            lexicon_path: settings.model_dir().join(LEXICON_FILE),
        }
    }
}

#[async_trait]
impl ResourceLoader<dyn SentimentModel> for LexiconLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        let mut model = LexiconModel::new(&self.name);

        match tokio::fs::read_to_string(&self.lexicon_path).await {
            Ok(contents) => {
                let added = model
                    .extend_from_str(&contents)
                    .with_context(|| format!("Invalid lexicon {}", self.lexicon_path.display()))?;
                info!(path = %self.lexicon_path.display(), added, "Loaded cached lexicon");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.lexicon_path.display(), "No cached lexicon, using built-in word lists");
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read {}", self.lexicon_path.display()))
                    .into());
            }
        }

        Ok(Arc::new(model))
    }
}
