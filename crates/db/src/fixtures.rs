use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Declarative contract for the seeded demo dataset.
struct SeedServiceContract {
    service_id: &'static str,
    question_count: i64,
    required_count: i64,
}

struct SeedQuotationContract {
    quotation_id: &'static str,
    status: &'static str,
    total: &'static str,
}

const SEED_SERVICES: &[SeedServiceContract] = &[SeedServiceContract {
    service_id: "web_development",
    question_count: 5,
    required_count: 3,
}];

const SEED_QUOTATIONS: &[SeedQuotationContract] = &[
    SeedQuotationContract {
        quotation_id: "a1b2c3d4-e5f6-4711-8899-aabbccddeeff",
        status: "pending",
        total: "2842.00",
    },
    SeedQuotationContract {
        quotation_id: "b2c3d4e5-f607-4822-99aa-bbccddeeff00",
        status: "approved",
        total: "3016.00",
    },
];

/// Deterministic demo fixtures: one questionnaire and two quotations
/// captured mid-lifecycle.
pub struct SeedDataset;

#[derive(Debug)]
pub struct SeedResult {
    pub services_seeded: Vec<&'static str>,
    pub quotations_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|(_, passed)| *passed)
    }
}

impl SeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            services_seeded: SEED_SERVICES.iter().map(|service| service.service_id).collect(),
            quotations_seeded: SEED_QUOTATIONS
                .iter()
                .map(|quotation| quotation.quotation_id)
                .collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for service in SEED_SERVICES {
            let question_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM question WHERE service_id = ?1")
                    .bind(service.service_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((
                format!("{}-questions", service.service_id),
                question_count == service.question_count,
            ));

            let required_count: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM question WHERE service_id = ?1 AND required = 1",
            )
            .bind(service.service_id)
            .fetch_one(pool)
            .await?;
            checks.push((
                format!("{}-required-questions", service.service_id),
                required_count == service.required_count,
            ));
        }

        for quotation in SEED_QUOTATIONS {
            let matches: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM quotation WHERE id = ?1 AND status = ?2 AND total = ?3)",
            )
            .bind(quotation.quotation_id)
            .bind(quotation.status)
            .bind(quotation.total)
            .fetch_one(pool)
            .await?;
            checks.push((quotation.quotation_id.to_string(), matches == 1));
        }

        Ok(VerificationResult { checks })
    }
}

#[cfg(test)]
mod tests {
    use cotiza_core::{QuestionnaireSource, ServiceId};

    use super::SeedDataset;
    use crate::repositories::SqlQuestionRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let result = SeedDataset::load(&pool).await.expect("load seed");
        assert_eq!(result.services_seeded, vec!["web_development"]);

        let verification = SeedDataset::verify(&pool).await.expect("verify seed");
        assert!(verification.all_passed(), "failed checks: {:?}", verification.checks);

        pool.close().await;
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        SeedDataset::load(&pool).await.expect("first load");
        SeedDataset::load(&pool).await.expect("second load");

        let verification = SeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_passed());

        pool.close().await;
    }

    #[tokio::test]
    async fn seeded_questionnaire_decodes_into_domain_questions() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SeedDataset::load(&pool).await.expect("load seed");

        let repo = SqlQuestionRepository::new(pool.clone());
        let questionnaire = repo
            .questionnaire(&ServiceId("web_development".to_string()))
            .await
            .expect("decode questionnaire");

        assert_eq!(questionnaire.len(), 5);
        for question in &questionnaire {
            question.validate().expect("seeded question is valid");
        }
        assert!(questionnaire.windows(2).all(|pair| pair[0].order_index <= pair[1].order_index));

        pool.close().await;
    }
}
