use serde::{Deserialize, Serialize};

use super::decision::Decision;

/// Outcome of one classification request.
///
/// Serializes to either `{"predictedType": "...", "confidence": 0.93}` or
/// `{"error": "..."}`; never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResult {
    Prediction {
        #[serde(rename = "predictedType")]
        predicted_type: String,
        confidence: f32,
    },
    Error {
        error: String,
    },
}

impl ClassificationResult {
    pub fn error(message: impl Into<String>) -> Self {
        ClassificationResult::Error {
            error: message.into(),
        }
    }

    /// Predicted label, absent on error.
    pub fn predicted_type(&self) -> Option<&str> {
        match self {
            ClassificationResult::Prediction { predicted_type, .. } => Some(predicted_type),
            ClassificationResult::Error { .. } => None,
        }
    }

    /// Confidence of the prediction, 0 on error.
    pub fn confidence(&self) -> f32 {
        match self {
            ClassificationResult::Prediction { confidence, .. } => *confidence,
            ClassificationResult::Error { .. } => 0.0,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ClassificationResult::Error { error } => Some(error),
            ClassificationResult::Prediction { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ClassificationResult::Error { .. })
    }
}

impl From<Decision> for ClassificationResult {
    fn from(decision: Decision) -> Self {
        ClassificationResult::Prediction {
            predicted_type: decision.label.to_string(),
            confidence: decision.confidence,
        }
    }
}
