use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::answer::AnswerSet;
use crate::domain::quotation::{ClientInfo, Quotation, QuotationStatus};

/// Read-only projection handed to delivery adapters (email, WhatsApp).
///
/// Formatting and markup belong to the adapter; the engine only exposes the
/// finalized figures. `client_facing_total` is the number to put in front
/// of the client: the manual override when present, else the computed
/// total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationView {
    pub quotation_id: String,
    pub service_id: String,
    pub client: ClientInfo,
    pub answers: AnswerSet,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub final_price: Option<Decimal>,
    pub client_facing_total: Decimal,
    pub estimated_development_time: Option<i64>,
    pub valid_until: Option<chrono::NaiveDate>,
    pub status: QuotationStatus,
}

impl From<&Quotation> for QuotationView {
    fn from(quotation: &Quotation) -> Self {
        Self {
            quotation_id: quotation.id.to_string(),
            service_id: quotation.service_id.to_string(),
            client: quotation.client.clone(),
            answers: quotation.answers.clone(),
            subtotal: quotation.subtotal,
            iva: quotation.iva,
            total: quotation.total,
            final_price: quotation.final_price,
            client_facing_total: quotation.client_facing_total(),
            estimated_development_time: quotation.estimated_development_time,
            valid_until: quotation.valid_until,
            status: quotation.status,
        }
    }
}
