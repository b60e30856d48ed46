use async_trait::async_trait;
use thiserror::Error;

use crate::delivery::QuotationView;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("advisory provider unavailable: {0}")]
    Unavailable(String),
}

/// Produces advisory text for a submitted quotation.
///
/// Strictly one-directional: the recommendation is attached to the
/// quotation as metadata and is never read back by the evaluator or the
/// aggregator.
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    async fn recommend(&self, quotation: &QuotationView) -> Result<Option<String>, AdvisoryError>;
}

/// Default provider when no advisory backend is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAdvisoryProvider;

#[async_trait]
impl AdvisoryProvider for NoopAdvisoryProvider {
    async fn recommend(&self, _quotation: &QuotationView) -> Result<Option<String>, AdvisoryError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{AdvisoryProvider, NoopAdvisoryProvider};
    use crate::delivery::QuotationView;
    use crate::domain::answer::AnswerSet;
    use crate::domain::question::ServiceId;
    use crate::domain::quotation::{ClientInfo, Quotation, QuotationId, QuotationStatus};

    #[tokio::test]
    async fn noop_provider_recommends_nothing() {
        let now = Utc::now();
        let quotation = Quotation {
            id: QuotationId::generate(),
            service_id: ServiceId("web_development".to_string()),
            client: ClientInfo {
                name: "Laura Méndez".to_string(),
                email: "laura@acme.mx".to_string(),
                phone: None,
                company: None,
            },
            answers: AnswerSet::new(),
            subtotal: Decimal::new(100000, 2),
            iva: Decimal::new(16000, 2),
            total: Decimal::new(116000, 2),
            status: QuotationStatus::Pending,
            final_price: None,
            estimated_development_time: None,
            valid_until: None,
            notes: None,
            ai_recommendation: None,
            created_at: now,
            updated_at: now,
        };

        let provider = NoopAdvisoryProvider;
        let recommendation =
            provider.recommend(&QuotationView::from(&quotation)).await.expect("noop recommend");
        assert_eq!(recommendation, None);
    }
}
