use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;

/// Slug identifying one service offering (e.g. `web_development`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub String);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(pub Uuid);

impl QuestionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    pub price: Decimal,
}

/// Pricing parameters per question type.
///
/// `Range` shares the `Number` formula; its bounds only constrain the
/// answered value, they never alter the contribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    YesNo {
        base_price: Decimal,
    },
    Number {
        base_price: Decimal,
        multiplier: Decimal,
    },
    Range {
        base_price: Decimal,
        multiplier: Decimal,
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    MultipleChoice {
        options: Vec<QuestionOption>,
    },
    MultipleSelection {
        options: Vec<QuestionOption>,
    },
}

impl QuestionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::YesNo { .. } => "yes_no",
            Self::Number { .. } => "number",
            Self::Range { .. } => "range",
            Self::MultipleChoice { .. } => "multiple_choice",
            Self::MultipleSelection { .. } => "multiple_selection",
        }
    }

    pub fn expected_answer_shape(&self) -> &'static str {
        match self {
            Self::YesNo { .. } => "yes/no",
            Self::Number { .. } | Self::Range { .. } => "number",
            Self::MultipleChoice { .. } => "option label",
            Self::MultipleSelection { .. } => "list of option labels",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub service_id: ServiceId,
    pub prompt: String,
    pub order_index: i64,
    pub required: bool,
    pub kind: QuestionKind,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Checks the definition invariants: non-empty prompt, non-negative
    /// prices, choice/selection kinds carry a non-empty duplicate-free
    /// options list, range bounds are ordered.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.prompt.trim().is_empty() {
            return Err(EngineError::InvariantViolation(format!(
                "question {} has an empty prompt",
                self.id
            )));
        }

        match &self.kind {
            QuestionKind::YesNo { base_price } => {
                ensure_non_negative(&self.id, "base_price", *base_price)?;
            }
            QuestionKind::Number { base_price, multiplier } => {
                ensure_non_negative(&self.id, "base_price", *base_price)?;
                ensure_non_negative(&self.id, "price_multiplier", *multiplier)?;
            }
            QuestionKind::Range { base_price, multiplier, min, max } => {
                ensure_non_negative(&self.id, "base_price", *base_price)?;
                ensure_non_negative(&self.id, "price_multiplier", *multiplier)?;
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(EngineError::InvariantViolation(format!(
                            "question {} has range bounds out of order ({min} > {max})",
                            self.id
                        )));
                    }
                }
            }
            QuestionKind::MultipleChoice { options }
            | QuestionKind::MultipleSelection { options } => {
                if options.is_empty() {
                    return Err(EngineError::InvariantViolation(format!(
                        "question {} is {} but has no options",
                        self.id,
                        self.kind.type_name()
                    )));
                }
                let mut labels = BTreeSet::new();
                for option in options {
                    if option.label.trim().is_empty() {
                        return Err(EngineError::InvariantViolation(format!(
                            "question {} has an option with an empty label",
                            self.id
                        )));
                    }
                    ensure_non_negative(&self.id, "option price", option.price)?;
                    if !labels.insert(option.label.as_str()) {
                        return Err(EngineError::InvariantViolation(format!(
                            "question {} has duplicate option label `{}`",
                            self.id, option.label
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn ensure_non_negative(
    id: &QuestionId,
    field: &str,
    value: Decimal,
) -> Result<(), EngineError> {
    if value < Decimal::ZERO {
        return Err(EngineError::InvariantViolation(format!(
            "question {id} has a negative {field} ({value})"
        )));
    }
    Ok(())
}

/// Restores questionnaire order: `order_index` ascending, ties broken by
/// creation order, then id for full determinism.
pub fn sort_questionnaire(questions: &mut [Question]) {
    questions.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
