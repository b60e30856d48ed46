pub mod advisory;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod pricing;

pub use advisory::{AdvisoryError, AdvisoryProvider, NoopAdvisoryProvider};
pub use delivery::QuotationView;
pub use domain::answer::{AnswerSet, AnswerValue};
pub use domain::deal::{Deal, DealId};
pub use domain::question::{
    sort_questionnaire, Question, QuestionId, QuestionKind, QuestionOption, ServiceId,
};
pub use domain::quotation::{
    ClientInfo, Quotation, QuotationId, QuotationOverride, QuotationStatus,
};
pub use errors::{ApplicationError, EngineError, InterfaceError};
pub use lifecycle::{LifecycleManager, QuestionnaireSource, QuotationStore, StoreError};
pub use pricing::{aggregate, evaluate, QuoteTotals, IVA_RATE};
