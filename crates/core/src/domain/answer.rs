use std::collections::{btree_map, BTreeMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::question::{Question, QuestionId, QuestionKind};
use crate::errors::EngineError;

/// One decoded answer, tagged so persisted JSON round-trips without
/// re-inspecting the question definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    YesNo(bool),
    Number(Decimal),
    Choice(String),
    Selection(Vec<String>),
}

impl AnswerValue {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::YesNo(_) => "yes/no",
            Self::Number(_) => "number",
            Self::Choice(_) => "option label",
            Self::Selection(_) => "list of option labels",
        }
    }
}

/// The verbatim answer set captured at submission time, keyed by question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet(BTreeMap<QuestionId, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &QuestionId) -> Option<&AnswerValue> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: QuestionId, value: AnswerValue) {
        self.0.insert(id, value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, QuestionId, AnswerValue> {
        self.0.iter()
    }

    /// Decodes the questionnaire wire payload: a JSON object keyed by
    /// question id, each value shaped per the question's type
    /// (`bool | number | string | string[]`).
    ///
    /// Shape mismatches fail with `InvalidAnswerType`; answers for
    /// questions that do not belong to the questionnaire fail with
    /// `InvalidAnswerValue` (stale reference). Values are decoded only;
    /// semantic checks (negative amounts, unknown labels) belong to the
    /// evaluator.
    pub fn from_wire(questions: &[Question], wire: &Value) -> Result<Self, EngineError> {
        let entries = wire.as_object().ok_or_else(|| {
            EngineError::MalformedAnswerPayload("answers must be a JSON object".to_string())
        })?;

        let mut answers = BTreeMap::new();
        for (raw_id, raw_value) in entries {
            let question_id = raw_id
                .parse()
                .map(QuestionId)
                .map_err(|_| {
                    EngineError::MalformedAnswerPayload(format!(
                        "`{raw_id}` is not a valid question id"
                    ))
                })?;
            let question =
                questions.iter().find(|question| question.id == question_id).ok_or_else(|| {
                    EngineError::InvalidAnswerValue {
                        question_id,
                        reason: "question does not belong to this questionnaire".to_string(),
                    }
                })?;

            // JSON null means "left blank"; the aggregator decides whether
            // that is acceptable based on the required flag.
            if raw_value.is_null() {
                continue;
            }

            answers.insert(question_id, decode_answer(question, raw_value)?);
        }

        Ok(Self(answers))
    }
}

impl FromIterator<(QuestionId, AnswerValue)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (QuestionId, AnswerValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn decode_answer(question: &Question, value: &Value) -> Result<AnswerValue, EngineError> {
    let mismatch = || EngineError::InvalidAnswerType {
        question_id: question.id,
        expected: question.kind.expected_answer_shape(),
        got: json_shape_name(value),
    };

    match &question.kind {
        QuestionKind::YesNo { .. } => match value {
            Value::Bool(flag) => Ok(AnswerValue::YesNo(*flag)),
            Value::String(token) => match token.trim().to_ascii_lowercase().as_str() {
                "yes" | "si" | "true" => Ok(AnswerValue::YesNo(true)),
                "no" | "false" => Ok(AnswerValue::YesNo(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        QuestionKind::Number { .. } | QuestionKind::Range { .. } => match value {
            Value::Number(number) => decode_decimal(question, number),
            _ => Err(mismatch()),
        },
        QuestionKind::MultipleChoice { .. } => match value {
            Value::String(label) => Ok(AnswerValue::Choice(label.clone())),
            _ => Err(mismatch()),
        },
        QuestionKind::MultipleSelection { .. } => match value {
            Value::Array(items) => {
                let mut labels = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(label) => labels.push(label.clone()),
                        _ => return Err(mismatch()),
                    }
                }
                Ok(AnswerValue::Selection(labels))
            }
            _ => Err(mismatch()),
        },
    }
}

fn decode_decimal(
    question: &Question,
    number: &serde_json::Number,
) -> Result<AnswerValue, EngineError> {
    if let Some(value) = number.as_i64() {
        return Ok(AnswerValue::Number(Decimal::from(value)));
    }
    if let Some(value) = number.as_u64() {
        return Ok(AnswerValue::Number(Decimal::from(value)));
    }
    let float = number.as_f64().ok_or_else(|| EngineError::InvalidAnswerValue {
        question_id: question.id,
        reason: format!("`{number}` is not a representable number"),
    })?;
    Decimal::try_from(float).map(AnswerValue::Number).map_err(|_| {
        EngineError::InvalidAnswerValue {
            question_id: question.id,
            reason: format!("`{number}` cannot be represented as a decimal amount"),
        }
    })
}

fn json_shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "yes/no",
        Value::Number(_) => "number",
        Value::String(_) => "option label",
        Value::Array(_) => "list of option labels",
        Value::Object(_) => "object",
    }
}
