use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::answer::AnswerSet;
use crate::domain::question::ServiceId;
use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuotationId(pub Uuid);

impl QuotationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QuotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Contact details captured with the submission. Free text apart from the
/// email shape check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

impl ClientInfo {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvariantViolation(
                "client name must not be empty".to_string(),
            ));
        }
        if !email_has_valid_shape(&self.email) {
            return Err(EngineError::InvariantViolation(format!(
                "`{}` is not a valid email address",
                self.email
            )));
        }
        Ok(())
    }
}

fn email_has_valid_shape(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Lifecycle states of a persisted quotation.
///
/// `Approved` and `Rejected` stay freely reversible on purpose: the
/// business never forbade re-approving a rejected quote, and enforcing a
/// stricter workflow here is a product decision, not a technical one.
/// `Converted` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Pending,
    Approved,
    Rejected,
    Converted,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Converted => "converted",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotationStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "converted" => Ok(Self::Converted),
            other => Err(EngineError::InvariantViolation(format!(
                "unknown quotation status `{other}`"
            ))),
        }
    }
}

/// Administrative adjustments that supersede the computed total for
/// client-facing purposes without touching the stored figures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationOverride {
    pub final_price: Option<Decimal>,
    pub estimated_development_time: Option<i64>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl QuotationOverride {
    pub fn is_empty(&self) -> bool {
        self.final_price.is_none()
            && self.estimated_development_time.is_none()
            && self.valid_until.is_none()
            && self.notes.is_none()
    }
}

/// The persisted outcome of one questionnaire submission.
///
/// `subtotal`/`iva`/`total` are frozen at submission time together with the
/// verbatim answer set; later edits to question definitions never reach a
/// stored quotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: QuotationId,
    pub service_id: ServiceId,
    pub client: ClientInfo,
    pub answers: AnswerSet,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub status: QuotationStatus,
    pub final_price: Option<Decimal>,
    pub estimated_development_time: Option<i64>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub ai_recommendation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    /// The figure a client is actually billed: the manual override when one
    /// exists, else the computed total.
    pub fn client_facing_total(&self) -> Decimal {
        self.final_price.unwrap_or(self.total)
    }

    pub fn can_transition_to(&self, next: QuotationStatus) -> bool {
        use QuotationStatus::{Approved, Converted, Pending, Rejected};

        matches!(
            (&self.status, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Rejected)
                | (Rejected, Approved)
                | (Approved, Converted)
                | (Rejected, Converted)
        )
    }

    pub fn transition_to(&mut self, next: QuotationStatus) -> Result<(), EngineError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(EngineError::InvalidTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{ClientInfo, Quotation, QuotationId, QuotationStatus};
    use crate::domain::answer::AnswerSet;
    use crate::domain::question::ServiceId;
    use crate::errors::EngineError;

    fn quotation(status: QuotationStatus) -> Quotation {
        let now = Utc::now();
        Quotation {
            id: QuotationId::generate(),
            service_id: ServiceId("web_development".to_string()),
            client: client(),
            answers: AnswerSet::new(),
            subtotal: Decimal::new(120050, 2),
            iva: Decimal::new(19208, 2),
            total: Decimal::new(139258, 2),
            status,
            final_price: None,
            estimated_development_time: None,
            valid_until: None,
            notes: None,
            ai_recommendation: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            name: "Laura Méndez".to_string(),
            email: "laura@acme.mx".to_string(),
            phone: Some("+52 55 1234 5678".to_string()),
            company: Some("Acme MX".to_string()),
        }
    }

    #[test]
    fn pending_can_be_approved_or_rejected() {
        let mut q = quotation(QuotationStatus::Pending);
        q.transition_to(QuotationStatus::Approved).expect("pending -> approved");
        q.transition_to(QuotationStatus::Rejected).expect("approved -> rejected");
        q.transition_to(QuotationStatus::Approved).expect("rejected -> approved");
    }

    #[test]
    fn nothing_leaves_converted() {
        let mut q = quotation(QuotationStatus::Converted);
        for next in [
            QuotationStatus::Pending,
            QuotationStatus::Approved,
            QuotationStatus::Rejected,
            QuotationStatus::Converted,
        ] {
            let error = q.transition_to(next).expect_err("converted is terminal");
            assert!(matches!(error, EngineError::InvalidTransition { .. }));
            assert_eq!(q.status, QuotationStatus::Converted);
        }
    }

    #[test]
    fn nothing_reenters_pending() {
        let mut q = quotation(QuotationStatus::Approved);
        assert!(q.transition_to(QuotationStatus::Pending).is_err());
    }

    #[test]
    fn final_price_overrides_client_facing_total_only() {
        let mut q = quotation(QuotationStatus::Pending);
        assert_eq!(q.client_facing_total(), Decimal::new(139258, 2));

        q.final_price = Some(Decimal::new(130000, 2));
        assert_eq!(q.client_facing_total(), Decimal::new(130000, 2));
        // the computed figure stays authoritative in storage
        assert_eq!(q.total, Decimal::new(139258, 2));
    }

    #[test]
    fn email_shape_is_checked() {
        let mut info = client();
        info.validate().expect("valid client");

        info.email = "not-an-email".to_string();
        assert!(info.validate().is_err());

        info.email = "a b@acme.mx".to_string();
        assert!(info.validate().is_err());

        info.email = "laura@localhost".to_string();
        assert!(info.validate().is_err());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            QuotationStatus::Pending,
            QuotationStatus::Approved,
            QuotationStatus::Rejected,
            QuotationStatus::Converted,
        ] {
            let parsed: QuotationStatus = status.as_str().parse().expect("parse status");
            assert_eq!(parsed, status);
        }
        assert!("sent".parse::<QuotationStatus>().is_err());
    }
}
