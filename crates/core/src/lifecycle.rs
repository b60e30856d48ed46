use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::domain::answer::AnswerSet;
use crate::domain::deal::Deal;
use crate::domain::question::{Question, ServiceId};
use crate::domain::quotation::{
    ClientInfo, Quotation, QuotationId, QuotationOverride, QuotationStatus,
};
use crate::errors::EngineError;
use crate::pricing::aggregate;

/// Failures at the persistence boundary. The engine never retries these;
/// the caller owns backoff policy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("stored record no longer matches the expected state")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait QuestionnaireSource: Send + Sync {
    /// Question definitions for one service, in questionnaire order.
    async fn questionnaire(&self, service_id: &ServiceId) -> Result<Vec<Question>, StoreError>;
}

/// Persistence contract for quotations and their conversion into deals.
///
/// `insert_quotation` and `convert` must each be a single transactional
/// write: a failed conversion leaves both the quotation status and the deal
/// table untouched. `update_status` is optimistic: it writes only while
/// the stored status still equals `expected` and reports `Conflict`
/// otherwise, so two admins cannot both convert the same quotation.
#[async_trait]
pub trait QuotationStore: Send + Sync {
    async fn insert_quotation(&self, quotation: Quotation) -> Result<(), StoreError>;

    async fn find_quotation(&self, id: &QuotationId) -> Result<Option<Quotation>, StoreError>;

    async fn update_status(
        &self,
        id: &QuotationId,
        expected: QuotationStatus,
        next: QuotationStatus,
    ) -> Result<(), StoreError>;

    async fn apply_override(
        &self,
        id: &QuotationId,
        adjustment: QuotationOverride,
    ) -> Result<(), StoreError>;

    async fn attach_recommendation(
        &self,
        id: &QuotationId,
        recommendation: &str,
    ) -> Result<(), StoreError>;

    async fn convert(&self, id: &QuotationId, deal: Deal) -> Result<(), StoreError>;
}

#[async_trait]
impl<'a, T> QuestionnaireSource for &'a T
where
    T: QuestionnaireSource + ?Sized,
{
    async fn questionnaire(&self, service_id: &ServiceId) -> Result<Vec<Question>, StoreError> {
        (**self).questionnaire(service_id).await
    }
}

#[async_trait]
impl<'a, T> QuotationStore for &'a T
where
    T: QuotationStore + ?Sized,
{
    async fn insert_quotation(&self, quotation: Quotation) -> Result<(), StoreError> {
        (**self).insert_quotation(quotation).await
    }

    async fn find_quotation(&self, id: &QuotationId) -> Result<Option<Quotation>, StoreError> {
        (**self).find_quotation(id).await
    }

    async fn update_status(
        &self,
        id: &QuotationId,
        expected: QuotationStatus,
        next: QuotationStatus,
    ) -> Result<(), StoreError> {
        (**self).update_status(id, expected, next).await
    }

    async fn apply_override(
        &self,
        id: &QuotationId,
        adjustment: QuotationOverride,
    ) -> Result<(), StoreError> {
        (**self).apply_override(id, adjustment).await
    }

    async fn attach_recommendation(
        &self,
        id: &QuotationId,
        recommendation: &str,
    ) -> Result<(), StoreError> {
        (**self).attach_recommendation(id, recommendation).await
    }

    async fn convert(&self, id: &QuotationId, deal: Deal) -> Result<(), StoreError> {
        (**self).convert(id, deal).await
    }
}

/// Owns the quotation lifecycle: submission, status transitions, manual
/// overrides, and conversion into a sales-pipeline deal.
pub struct LifecycleManager<Q, S> {
    questionnaires: Q,
    store: S,
}

impl<Q, S> LifecycleManager<Q, S>
where
    Q: QuestionnaireSource,
    S: QuotationStore,
{
    pub fn new(questionnaires: Q, store: S) -> Self {
        Self { questionnaires, store }
    }

    /// Prices a questionnaire submission and persists it as a `Pending`
    /// quotation, capturing the decoded answer set verbatim so later edits
    /// to question definitions never change this quotation's figures.
    pub async fn submit(
        &self,
        client: ClientInfo,
        service_id: ServiceId,
        wire_answers: &Value,
    ) -> Result<Quotation, EngineError> {
        client.validate()?;

        let questionnaire = self
            .questionnaires
            .questionnaire(&service_id)
            .await
            .map_err(|error| storage_error(error, None))?;
        let answers = AnswerSet::from_wire(&questionnaire, wire_answers)?;
        let totals = aggregate(&questionnaire, &answers)?;

        let now = chrono::Utc::now();
        let quotation = Quotation {
            id: QuotationId::generate(),
            service_id,
            client,
            answers,
            subtotal: totals.subtotal,
            iva: totals.iva,
            total: totals.total,
            status: QuotationStatus::Pending,
            final_price: None,
            estimated_development_time: None,
            valid_until: None,
            notes: None,
            ai_recommendation: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_quotation(quotation.clone())
            .await
            .map_err(|error| storage_error(error, Some(&quotation.id)))?;

        info!(
            event_name = "quotation.submitted",
            quotation_id = %quotation.id,
            service_id = %quotation.service_id,
            subtotal = %quotation.subtotal,
            total = %quotation.total,
            "quotation submitted"
        );
        Ok(quotation)
    }

    /// Applies an administrative status change. `Converted` cannot be
    /// entered here; a quotation only becomes converted through
    /// `convert_to_deal`, which pairs the status flip with the deal row.
    pub async fn set_status(
        &self,
        id: &QuotationId,
        next: QuotationStatus,
    ) -> Result<(), EngineError> {
        let quotation = self.load(id).await?;

        if next == QuotationStatus::Converted || !quotation.can_transition_to(next) {
            return Err(EngineError::InvalidTransition { from: quotation.status, to: next });
        }

        self.store
            .update_status(id, quotation.status, next)
            .await
            .map_err(|error| storage_error(error, Some(id)))?;

        info!(
            event_name = "quotation.status_changed",
            quotation_id = %id,
            from = %quotation.status,
            to = %next,
            "quotation status changed"
        );
        Ok(())
    }

    /// Records a manual `final_price` / timeline override. Never touches
    /// the computed `subtotal`/`iva`/`total`; rejected once converted.
    pub async fn apply_override(
        &self,
        id: &QuotationId,
        adjustment: QuotationOverride,
    ) -> Result<(), EngineError> {
        let quotation = self.ensure_not_converted(id).await?;
        if adjustment.is_empty() {
            return Ok(());
        }

        self.store
            .apply_override(id, adjustment.clone())
            .await
            .map_err(|error| storage_error(error, Some(id)))?;

        let final_price = adjustment
            .final_price
            .map(|price| price.to_string())
            .unwrap_or_else(|| "unchanged".to_string());
        info!(
            event_name = "quotation.override_applied",
            quotation_id = %id,
            status = %quotation.status,
            final_price = %final_price,
            "manual override applied"
        );
        Ok(())
    }

    /// Attaches advisory text to the quotation. Advisory only: nothing in
    /// the pricing path ever reads it back.
    pub async fn attach_recommendation(
        &self,
        id: &QuotationId,
        recommendation: &str,
    ) -> Result<(), EngineError> {
        self.ensure_not_converted(id).await?;

        self.store
            .attach_recommendation(id, recommendation)
            .await
            .map_err(|error| storage_error(error, Some(id)))?;

        info!(
            event_name = "quotation.recommendation_attached",
            quotation_id = %id,
            "advisory recommendation attached"
        );
        Ok(())
    }

    /// Converts an approved quotation into a sales-pipeline deal. The deal
    /// insert and the `Approved -> Converted` flip happen in one
    /// transaction; if the deal cannot be created the quotation is left
    /// exactly as it was.
    pub async fn convert_to_deal(&self, id: &QuotationId) -> Result<Deal, EngineError> {
        let quotation = self.load(id).await?;

        if quotation.status != QuotationStatus::Approved {
            return Err(EngineError::InvalidTransition {
                from: quotation.status,
                to: QuotationStatus::Converted,
            });
        }

        let deal = Deal::seed_from(&quotation);
        self.store
            .convert(id, deal.clone())
            .await
            .map_err(|error| storage_error(error, Some(id)))?;

        info!(
            event_name = "quotation.converted",
            quotation_id = %id,
            deal_id = %deal.id,
            value = %deal.value,
            "quotation converted into deal"
        );
        Ok(deal)
    }

    pub async fn quotation(&self, id: &QuotationId) -> Result<Quotation, EngineError> {
        self.load(id).await
    }

    async fn load(&self, id: &QuotationId) -> Result<Quotation, EngineError> {
        self.store
            .find_quotation(id)
            .await
            .map_err(|error| storage_error(error, Some(id)))?
            .ok_or(EngineError::QuotationNotFound(*id))
    }

    async fn ensure_not_converted(&self, id: &QuotationId) -> Result<Quotation, EngineError> {
        let quotation = self.load(id).await?;
        if quotation.status == QuotationStatus::Converted {
            return Err(EngineError::InvalidTransition {
                from: QuotationStatus::Converted,
                to: quotation.status,
            });
        }
        Ok(quotation)
    }
}

fn storage_error(error: StoreError, id: Option<&QuotationId>) -> EngineError {
    match (error, id) {
        (StoreError::Conflict, Some(id)) => EngineError::ConcurrentModification(*id),
        (StoreError::Conflict, None) => {
            EngineError::StorageUnavailable("write conflict".to_string())
        }
        (StoreError::NotFound, Some(id)) => EngineError::QuotationNotFound(*id),
        (StoreError::NotFound, None) => {
            EngineError::StorageUnavailable("record not found".to_string())
        }
        (StoreError::Unavailable(message), _) => EngineError::StorageUnavailable(message),
    }
}
