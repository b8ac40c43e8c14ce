//! Chat message types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::error::PipelineError;

/// `0001-01-01T00:00:00Z` in Unix seconds. Producers send it for "no timestamp".
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

fn is_zero_instant(timestamp: &DateTime<Utc>) -> bool {
    timestamp.timestamp() == ZERO_INSTANT_SECS && timestamp.timestamp_subsec_nanos() == 0
}

/// An inbound chat message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    bot_id: String,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message, rejecting an empty bot id or content.
    ///
    /// A missing or zero timestamp defaults to now.
    pub fn new(
        bot_id: impl Into<String>,
        content: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, PipelineError> {
        let bot_id = bot_id.into();
        let content = content.into();

        if bot_id.is_empty() || content.is_empty() {
            return Err(PipelineError::Validation(
                "bot_id and content are required".to_string(),
            ));
        }

        Ok(Self {
            bot_id,
            content,
            timestamp: timestamp
                .filter(|ts| !is_zero_instant(ts))
                .unwrap_or_else(Utc::now),
        })
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Result of sentiment analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

impl Sentiment {
    /// Label used when analysis was skipped or failed.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN, 0.0)
    }

    pub fn is_unknown(&self) -> bool {
        self.label == Self::UNKNOWN
    }
}

/// A message plus its sentiment, alive for one processing cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub sentiment: Sentiment,
}

impl EnrichedMessage {
    /// Wrap a message; sentiment starts as unknown.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            sentiment: Sentiment::unknown(),
        }
    }
}
