use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quotation::{Quotation, QuotationId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub Uuid);

impl DealId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sales-pipeline record a quotation converts into. Owned by the CRM side
/// of the system; the engine only creates and links it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub name: String,
    pub client_name: String,
    pub client_email: String,
    pub value: Decimal,
    pub quotation_id: Option<QuotationId>,
    pub created_at: DateTime<Utc>,
}

impl Deal {
    /// Seeds a pipeline record from an approved quotation: the deal value
    /// is the manual final price when present, else the computed total.
    pub fn seed_from(quotation: &Quotation) -> Self {
        Self {
            id: DealId::generate(),
            name: format!("{} - {}", quotation.client.name, quotation.service_id),
            client_name: quotation.client.name.clone(),
            client_email: quotation.client.email.clone(),
            value: quotation.client_facing_total(),
            quotation_id: Some(quotation.id),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::Deal;
    use crate::domain::answer::AnswerSet;
    use crate::domain::quotation::{ClientInfo, Quotation, QuotationId, QuotationStatus};
    use crate::domain::question::ServiceId;

    fn approved_quotation() -> Quotation {
        let now = Utc::now();
        Quotation {
            id: QuotationId::generate(),
            service_id: ServiceId("branding".to_string()),
            client: ClientInfo {
                name: "Carlos Rivera".to_string(),
                email: "carlos@rivera.dev".to_string(),
                phone: None,
                company: None,
            },
            answers: AnswerSet::new(),
            subtotal: Decimal::new(100000, 2),
            iva: Decimal::new(16000, 2),
            total: Decimal::new(116000, 2),
            status: QuotationStatus::Approved,
            final_price: None,
            estimated_development_time: None,
            valid_until: None,
            notes: None,
            ai_recommendation: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn deal_value_defaults_to_computed_total() {
        let quotation = approved_quotation();
        let deal = Deal::seed_from(&quotation);

        assert_eq!(deal.value, Decimal::new(116000, 2));
        assert_eq!(deal.quotation_id, Some(quotation.id));
        assert_eq!(deal.client_email, "carlos@rivera.dev");
    }

    #[test]
    fn deal_value_prefers_final_price() {
        let mut quotation = approved_quotation();
        quotation.final_price = Some(Decimal::new(110000, 2));

        let deal = Deal::seed_from(&quotation);
        assert_eq!(deal.value, Decimal::new(110000, 2));
    }
}
