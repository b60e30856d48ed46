use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::domain::answer::AnswerValue;
use crate::domain::question::{Question, QuestionKind};
use crate::errors::EngineError;

/// Prices one answered question. Pure and total over valid inputs; every
/// rejection is an error, never a clamped value.
pub fn evaluate(question: &Question, answer: &AnswerValue) -> Result<Decimal, EngineError> {
    match (&question.kind, answer) {
        (QuestionKind::YesNo { base_price }, AnswerValue::YesNo(affirmative)) => {
            Ok(if *affirmative { *base_price } else { Decimal::ZERO })
        }
        (QuestionKind::Number { base_price, multiplier }, AnswerValue::Number(amount)) => {
            priced_amount(question, *base_price, *multiplier, *amount, None, None)
        }
        (
            QuestionKind::Range { base_price, multiplier, min, max },
            AnswerValue::Number(amount),
        ) => priced_amount(question, *base_price, *multiplier, *amount, *min, *max),
        (QuestionKind::MultipleChoice { options }, AnswerValue::Choice(label)) => options
            .iter()
            .find(|option| option.label == *label)
            .map(|option| option.price)
            .ok_or_else(|| stale_option(question, label)),
        (QuestionKind::MultipleSelection { options }, AnswerValue::Selection(labels)) => {
            // duplicate labels in the payload count once
            let selected: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
            for label in &selected {
                if !options.iter().any(|option| option.label == *label) {
                    return Err(stale_option(question, label));
                }
            }
            Ok(options
                .iter()
                .filter(|option| selected.contains(option.label.as_str()))
                .map(|option| option.price)
                .sum())
        }
        (kind, answer) => Err(EngineError::InvalidAnswerType {
            question_id: question.id,
            expected: kind.expected_answer_shape(),
            got: answer.shape_name(),
        }),
    }
}

fn priced_amount(
    question: &Question,
    base_price: Decimal,
    multiplier: Decimal,
    amount: Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<Decimal, EngineError> {
    if amount < Decimal::ZERO {
        return Err(EngineError::InvalidAnswerValue {
            question_id: question.id,
            reason: format!("amount must not be negative (got {amount})"),
        });
    }
    if let Some(min) = min {
        if amount < min {
            return Err(out_of_bounds(question, amount, Some(min), max));
        }
    }
    if let Some(max) = max {
        if amount > max {
            return Err(out_of_bounds(question, amount, min, Some(max)));
        }
    }
    Ok(base_price + multiplier * amount)
}

fn out_of_bounds(
    question: &Question,
    amount: Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> EngineError {
    let min = min.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string());
    let max = max.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string());
    EngineError::InvalidAnswerValue {
        question_id: question.id,
        reason: format!("{amount} is outside the allowed range [{min}, {max}]"),
    }
}

fn stale_option(question: &Question, label: &str) -> EngineError {
    EngineError::InvalidAnswerValue {
        question_id: question.id,
        reason: format!("option `{label}` does not exist"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::evaluate;
    use crate::domain::answer::AnswerValue;
    use crate::domain::question::{
        Question, QuestionId, QuestionKind, QuestionOption, ServiceId,
    };
    use crate::errors::EngineError;

    fn question(kind: QuestionKind) -> Question {
        Question {
            id: QuestionId::generate(),
            service_id: ServiceId("web_development".to_string()),
            prompt: "prompt".to_string(),
            order_index: 0,
            required: false,
            kind,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn affirmative_yes_no_contributes_base_price() {
        let q = question(QuestionKind::YesNo { base_price: Decimal::new(50000, 2) });

        let yes = evaluate(&q, &AnswerValue::YesNo(true)).expect("price yes");
        assert_eq!(yes, Decimal::new(50000, 2));

        let no = evaluate(&q, &AnswerValue::YesNo(false)).expect("price no");
        assert_eq!(no, Decimal::ZERO);
    }

    #[test]
    fn number_applies_base_plus_multiplier() {
        let q = question(QuestionKind::Number {
            base_price: Decimal::new(100000, 2),
            multiplier: Decimal::new(5000, 2),
        });

        let priced = evaluate(&q, &AnswerValue::Number(Decimal::from(3))).expect("price");
        assert_eq!(priced, Decimal::new(115000, 2));
    }

    #[test]
    fn range_shares_the_number_formula() {
        let number = question(QuestionKind::Number {
            base_price: Decimal::new(20000, 2),
            multiplier: Decimal::new(2500, 2),
        });
        let range = question(QuestionKind::Range {
            base_price: Decimal::new(20000, 2),
            multiplier: Decimal::new(2500, 2),
            min: None,
            max: None,
        });
        let answer = AnswerValue::Number(Decimal::from(8));

        assert_eq!(
            evaluate(&number, &answer).expect("number"),
            evaluate(&range, &answer).expect("range"),
        );
    }

    #[test]
    fn negative_amounts_are_rejected_not_clamped() {
        let q = question(QuestionKind::Number {
            base_price: Decimal::ZERO,
            multiplier: Decimal::new(5000, 2),
        });

        let error =
            evaluate(&q, &AnswerValue::Number(Decimal::from(-1))).expect_err("negative amount");
        assert!(matches!(error, EngineError::InvalidAnswerValue { .. }));
    }

    #[test]
    fn range_bounds_reject_out_of_range_amounts() {
        let q = question(QuestionKind::Range {
            base_price: Decimal::ZERO,
            multiplier: Decimal::new(10000, 2),
            min: Some(Decimal::from(1)),
            max: Some(Decimal::from(10)),
        });

        assert!(evaluate(&q, &AnswerValue::Number(Decimal::from(11))).is_err());
        assert!(evaluate(&q, &AnswerValue::Number(Decimal::ZERO)).is_err());
        assert_eq!(
            evaluate(&q, &AnswerValue::Number(Decimal::from(10))).expect("in range"),
            Decimal::new(100000, 2),
        );
    }

    #[test]
    fn choice_prices_the_matching_option() {
        let q = question(QuestionKind::MultipleChoice {
            options: vec![
                QuestionOption { label: "Landing".to_string(), price: Decimal::new(80000, 2) },
                QuestionOption { label: "E-commerce".to_string(), price: Decimal::new(250000, 2) },
            ],
        });

        let priced =
            evaluate(&q, &AnswerValue::Choice("E-commerce".to_string())).expect("price choice");
        assert_eq!(priced, Decimal::new(250000, 2));
    }

    #[test]
    fn stale_choice_label_is_rejected() {
        let q = question(QuestionKind::MultipleChoice {
            options: vec![QuestionOption {
                label: "Landing".to_string(),
                price: Decimal::new(80000, 2),
            }],
        });

        let error = evaluate(&q, &AnswerValue::Choice("Blog".to_string()))
            .expect_err("stale option reference");
        assert!(matches!(error, EngineError::InvalidAnswerValue { .. }));
    }

    #[test]
    fn duplicate_selection_labels_count_once() {
        let q = question(QuestionKind::MultipleSelection {
            options: vec![
                QuestionOption { label: "A".to_string(), price: Decimal::new(20000, 2) },
                QuestionOption { label: "B".to_string(), price: Decimal::new(30000, 2) },
            ],
        });

        let priced = evaluate(
            &q,
            &AnswerValue::Selection(vec!["A".to_string(), "B".to_string(), "A".to_string()]),
        )
        .expect("price selection");
        assert_eq!(priced, Decimal::new(50000, 2));
    }

    #[test]
    fn selection_with_unknown_label_is_rejected() {
        let q = question(QuestionKind::MultipleSelection {
            options: vec![QuestionOption {
                label: "A".to_string(),
                price: Decimal::new(20000, 2),
            }],
        });

        assert!(evaluate(&q, &AnswerValue::Selection(vec!["Z".to_string()])).is_err());
    }

    #[test]
    fn mismatched_shape_is_a_contract_violation() {
        let q = question(QuestionKind::YesNo { base_price: Decimal::new(50000, 2) });

        let error = evaluate(&q, &AnswerValue::Number(Decimal::ONE))
            .expect_err("number for yes/no question");
        assert!(matches!(
            error,
            EngineError::InvalidAnswerType { expected: "yes/no", got: "number", .. }
        ));
    }
}
