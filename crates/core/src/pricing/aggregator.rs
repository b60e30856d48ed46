use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::answer::AnswerSet;
use crate::domain::question::Question;
use crate::errors::EngineError;
use crate::pricing::evaluator::evaluate;

/// Fixed tax rate applied to every subtotal (0.16).
pub const IVA_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
}

/// Folds per-question contributions into the billed figures.
///
/// Required questions are verified up front, in questionnaire order, so the
/// caller learns exactly which question is missing before anything is
/// computed. The rounding order is load-bearing: subtotal is rounded first,
/// iva derives from the rounded subtotal, and total is the plain sum of the
/// two rounded figures. Rounding is half-up, the way an invoicer rounds.
pub fn aggregate(questions: &[Question], answers: &AnswerSet) -> Result<QuoteTotals, EngineError> {
    for question in questions {
        if question.required && answers.get(&question.id).is_none() {
            return Err(EngineError::MissingRequiredAnswer(question.id));
        }
    }

    let mut sum = Decimal::ZERO;
    for question in questions {
        if let Some(answer) = answers.get(&question.id) {
            sum += evaluate(question, answer)?;
        }
    }

    let subtotal = round_money(sum);
    let iva = round_money(subtotal * IVA_RATE);
    let total = subtotal + iva;

    Ok(QuoteTotals { subtotal, iva, total })
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
