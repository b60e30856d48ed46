use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use cotiza_core::{
    Question, QuestionId, QuestionKind, QuestionOption, QuestionnaireSource, ServiceId,
    StoreError,
};

use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed question definition store.
///
/// Type-specific pricing parameters are flattened into nullable columns;
/// `options_json` holds the ordered option list for choice/selection
/// questions. Reads come back in questionnaire order.
pub struct SqlQuestionRepository {
    pool: DbPool,
}

impl SqlQuestionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, question: Question) -> Result<(), RepositoryError> {
        question
            .validate()
            .map_err(|error| RepositoryError::Invalid(error.to_string()))?;

        let (base_price, multiplier, min_value, max_value, options_json) =
            encode_kind(&question.kind)?;

        sqlx::query(
            r#"
            INSERT INTO question (
                id, service_id, prompt, question_type, required,
                base_price, price_multiplier, min_value, max_value,
                options_json, order_index, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                service_id = excluded.service_id,
                prompt = excluded.prompt,
                question_type = excluded.question_type,
                required = excluded.required,
                base_price = excluded.base_price,
                price_multiplier = excluded.price_multiplier,
                min_value = excluded.min_value,
                max_value = excluded.max_value,
                options_json = excluded.options_json,
                order_index = excluded.order_index
            "#,
        )
        .bind(question.id.to_string())
        .bind(&question.service_id.0)
        .bind(&question.prompt)
        .bind(question.kind.type_name())
        .bind(i64::from(question.required))
        .bind(base_price)
        .bind(multiplier)
        .bind(min_value)
        .bind(max_value)
        .bind(options_json)
        .bind(question.order_index)
        .bind(question.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_service(
        &self,
        service_id: &ServiceId,
    ) -> Result<Vec<Question>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, service_id, prompt, question_type, required,
                   base_price, price_multiplier, min_value, max_value,
                   options_json, order_index, created_at
            FROM question
            WHERE service_id = ?
            ORDER BY order_index ASC, created_at ASC, id ASC
            "#,
        )
        .bind(&service_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(question_from_row).collect()
    }

    pub async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM question")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: &QuestionId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM question WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl QuestionnaireSource for SqlQuestionRepository {
    async fn questionnaire(&self, service_id: &ServiceId) -> Result<Vec<Question>, StoreError> {
        self.list_for_service(service_id).await.map_err(StoreError::from)
    }
}

fn encode_kind(
    kind: &QuestionKind,
) -> Result<
    (Option<String>, Option<String>, Option<String>, Option<String>, Option<String>),
    RepositoryError,
> {
    let encoded = match kind {
        QuestionKind::YesNo { base_price } => {
            (Some(base_price.to_string()), None, None, None, None)
        }
        QuestionKind::Number { base_price, multiplier } => {
            (Some(base_price.to_string()), Some(multiplier.to_string()), None, None, None)
        }
        QuestionKind::Range { base_price, multiplier, min, max } => (
            Some(base_price.to_string()),
            Some(multiplier.to_string()),
            min.map(|value| value.to_string()),
            max.map(|value| value.to_string()),
            None,
        ),
        QuestionKind::MultipleChoice { options } | QuestionKind::MultipleSelection { options } => {
            let options_json = serde_json::to_string(options)
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;
            (None, None, None, None, Some(options_json))
        }
    };
    Ok(encoded)
}

fn question_from_row(row: &SqliteRow) -> Result<Question, RepositoryError> {
    let id_raw: String = row.try_get("id")?;
    let id = id_raw
        .parse()
        .map(QuestionId)
        .map_err(|_| RepositoryError::Decode(format!("invalid question id `{id_raw}`")))?;
    let service_id: String = row.try_get("service_id")?;
    let prompt: String = row.try_get("prompt")?;
    let question_type: String = row.try_get("question_type")?;
    let required: i64 = row.try_get("required")?;
    let order_index: i64 = row.try_get("order_index")?;
    let created_at_raw: String = row.try_get("created_at")?;
    let created_at = parse_timestamp("created_at", &created_at_raw)?;

    let kind = match question_type.as_str() {
        "yes_no" => QuestionKind::YesNo { base_price: required_decimal(row, "base_price")? },
        "number" => QuestionKind::Number {
            base_price: required_decimal(row, "base_price")?,
            multiplier: required_decimal(row, "price_multiplier")?,
        },
        "range" => QuestionKind::Range {
            base_price: required_decimal(row, "base_price")?,
            multiplier: required_decimal(row, "price_multiplier")?,
            min: optional_decimal(row, "min_value")?,
            max: optional_decimal(row, "max_value")?,
        },
        "multiple_choice" => QuestionKind::MultipleChoice { options: decode_options(row)? },
        "multiple_selection" => QuestionKind::MultipleSelection { options: decode_options(row)? },
        other => {
            return Err(RepositoryError::Decode(format!("unknown question type `{other}`")));
        }
    };

    Ok(Question {
        id,
        service_id: ServiceId(service_id),
        prompt,
        order_index,
        required: required != 0,
        kind,
        created_at,
    })
}

fn decode_options(row: &SqliteRow) -> Result<Vec<QuestionOption>, RepositoryError> {
    let options_json: Option<String> = row.try_get("options_json")?;
    let options_json = options_json
        .ok_or_else(|| RepositoryError::Decode("choice question without options_json".into()))?;
    serde_json::from_str(&options_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid options_json: {error}")))
}

fn required_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    optional_decimal(row, column)?
        .ok_or_else(|| RepositoryError::Decode(format!("column `{column}` is unexpectedly NULL")))
}

fn optional_decimal(row: &SqliteRow, column: &str) -> Result<Option<Decimal>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        Decimal::from_str(&value).map_err(|error| {
            RepositoryError::Decode(format!("invalid decimal in `{column}`: {error}"))
        })
    })
    .transpose()
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {error}")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cotiza_core::{
        Question, QuestionId, QuestionKind, QuestionOption, QuestionnaireSource, ServiceId,
    };
    use rust_decimal::Decimal;

    use super::SqlQuestionRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    // each test owns a service slug: the shared-cache test database is
    // visible to every test in the process
    fn question(service: &str, order_index: i64, kind: QuestionKind) -> Question {
        Question {
            id: QuestionId::generate(),
            service_id: ServiceId(service.to_string()),
            prompt: format!("question {order_index}"),
            order_index,
            required: order_index == 0,
            kind,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn questions_round_trip_with_their_kind() {
        let pool = setup_pool().await;
        let repo = SqlQuestionRepository::new(pool.clone());

        let saved = vec![
            question("svc-roundtrip", 0, QuestionKind::YesNo { base_price: Decimal::new(50000, 2) }),
            question(
                "svc-roundtrip",
                1,
                QuestionKind::Range {
                    base_price: Decimal::new(100000, 2),
                    multiplier: Decimal::new(5000, 2),
                    min: Some(Decimal::ONE),
                    max: Some(Decimal::from(50)),
                },
            ),
            question(
                "svc-roundtrip",
                2,
                QuestionKind::MultipleSelection {
                    options: vec![
                        QuestionOption { label: "SEO".to_string(), price: Decimal::new(20000, 2) },
                        QuestionOption {
                            label: "Analytics".to_string(),
                            price: Decimal::new(30000, 2),
                        },
                    ],
                },
            ),
        ];
        for q in &saved {
            repo.save(q.clone()).await.expect("save question");
        }

        let listed = repo
            .list_for_service(&ServiceId("svc-roundtrip".to_string()))
            .await
            .expect("list questions");

        assert_eq!(listed.len(), 3);
        for (stored, original) in listed.iter().zip(&saved) {
            assert_eq!(stored.id, original.id);
            assert_eq!(stored.kind, original.kind);
            assert_eq!(stored.required, original.required);
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn listing_respects_questionnaire_order() {
        let pool = setup_pool().await;
        let repo = SqlQuestionRepository::new(pool.clone());

        let mut late = question("svc-order", 5, QuestionKind::YesNo { base_price: Decimal::ZERO });
        late.prompt = "late".to_string();
        let mut early = question("svc-order", 1, QuestionKind::YesNo { base_price: Decimal::ZERO });
        early.prompt = "early".to_string();
        repo.save(late).await.expect("save late");
        repo.save(early).await.expect("save early");

        let listed = repo
            .questionnaire(&ServiceId("svc-order".to_string()))
            .await
            .expect("ordered questionnaire");
        assert_eq!(listed[0].prompt, "early");
        assert_eq!(listed[1].prompt, "late");

        pool.close().await;
    }

    #[tokio::test]
    async fn invalid_definitions_are_rejected_on_save() {
        let pool = setup_pool().await;
        let repo = SqlQuestionRepository::new(pool.clone());

        let invalid = question("svc-invalid", 0, QuestionKind::MultipleChoice { options: Vec::new() });
        assert!(repo.save(invalid).await.is_err());

        let listed = repo
            .list_for_service(&ServiceId("svc-invalid".to_string()))
            .await
            .expect("list");
        assert!(listed.is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn deleted_questions_disappear_from_the_questionnaire() {
        let pool = setup_pool().await;
        let repo = SqlQuestionRepository::new(pool.clone());

        let q = question("svc-delete", 0, QuestionKind::YesNo { base_price: Decimal::ZERO });
        repo.save(q.clone()).await.expect("save question");
        repo.delete(&q.id).await.expect("delete question");

        let listed =
            repo.list_for_service(&ServiceId("svc-delete".to_string())).await.expect("list");
        assert!(listed.is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn questions_are_scoped_to_their_service() {
        let pool = setup_pool().await;
        let repo = SqlQuestionRepository::new(pool.clone());

        let other = question("svc-scope-other", 0, QuestionKind::YesNo { base_price: Decimal::ZERO });
        repo.save(other).await.expect("save other-service question");
        repo.save(question("svc-scope", 0, QuestionKind::YesNo { base_price: Decimal::ZERO }))
            .await
            .expect("save question");

        let listed =
            repo.list_for_service(&ServiceId("svc-scope".to_string())).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].service_id, ServiceId("svc-scope".to_string()));

        pool.close().await;
    }
}
