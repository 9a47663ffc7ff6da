//! Request and response types shared across senti components

use crate::config::TextLimits;
use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};

/// Body of an analyze request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRequest {
    /// Text to analyze for sentiment
    pub text: String,
}

impl SentimentRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Check the text against the configured length bounds.
    ///
    /// Lengths are counted in characters, not bytes.
    pub fn validate(&self, limits: &TextLimits) -> Result<()> {
        let len = self.text.chars().count();

        if len < limits.min_text_length {
            return Err(ServiceError::validation(format!(
                "ensure this value has at least {} character{}",
                limits.min_text_length,
                plural(limits.min_text_length)
            )));
        }

        if len > limits.max_text_length {
            return Err(ServiceError::validation(format!(
                "ensure this value has at most {} character{}",
                limits.max_text_length,
                plural(limits.max_text_length)
            )));
        }

        Ok(())
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Body of a successful analyze response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResponse {
    /// Sentiment label (POSITIVE or NEGATIVE)
    pub label: String,

    /// Confidence score between 0 and 1
    pub score: f32,

    /// Original input text
    pub text: String,

    /// Correlation id of the request that produced this result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// A single label/confidence pair produced by the inference capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    /// Build the response for `text`
    pub fn into_response(self, text: String, request_id: Option<String>) -> SentimentResponse {
        SentimentResponse {
            label: self.label,
            score: self.score,
            text,
            request_id,
        }
    }
}
