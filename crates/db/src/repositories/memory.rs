use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use cotiza_core::{
    Deal, Question, QuestionnaireSource, Quotation, QuotationId, QuotationOverride,
    QuotationStatus, QuotationStore, ServiceId, StoreError,
};

/// In-memory question source for tests and offline tooling.
#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<Vec<Question>>,
}

impl InMemoryQuestionRepository {
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self { questions: RwLock::new(questions) }
    }

    pub async fn save(&self, question: Question) {
        let mut questions = self.questions.write().await;
        questions.retain(|existing| existing.id != question.id);
        questions.push(question);
    }
}

#[async_trait]
impl QuestionnaireSource for InMemoryQuestionRepository {
    async fn questionnaire(&self, service_id: &ServiceId) -> Result<Vec<Question>, StoreError> {
        let questions = self.questions.read().await;
        let mut matching: Vec<Question> = questions
            .iter()
            .filter(|question| question.service_id == *service_id)
            .cloned()
            .collect();
        cotiza_core::sort_questionnaire(&mut matching);
        Ok(matching)
    }
}

/// In-memory quotation store mirroring the transactional guarantees of the
/// SQLite store: optimistic status checks and all-or-nothing conversion.
#[derive(Default)]
pub struct InMemoryQuotationStore {
    quotations: RwLock<HashMap<QuotationId, Quotation>>,
    deals: RwLock<Vec<Deal>>,
}

impl InMemoryQuotationStore {
    pub async fn deals(&self) -> Vec<Deal> {
        self.deals.read().await.clone()
    }
}

#[async_trait]
impl QuotationStore for InMemoryQuotationStore {
    async fn insert_quotation(&self, quotation: Quotation) -> Result<(), StoreError> {
        self.quotations.write().await.insert(quotation.id, quotation);
        Ok(())
    }

    async fn find_quotation(&self, id: &QuotationId) -> Result<Option<Quotation>, StoreError> {
        Ok(self.quotations.read().await.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &QuotationId,
        expected: QuotationStatus,
        next: QuotationStatus,
    ) -> Result<(), StoreError> {
        let mut quotations = self.quotations.write().await;
        let quotation = quotations.get_mut(id).ok_or(StoreError::NotFound)?;
        if quotation.status != expected {
            return Err(StoreError::Conflict);
        }
        quotation.status = next;
        quotation.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_override(
        &self,
        id: &QuotationId,
        adjustment: QuotationOverride,
    ) -> Result<(), StoreError> {
        let mut quotations = self.quotations.write().await;
        let quotation = quotations.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(final_price) = adjustment.final_price {
            quotation.final_price = Some(final_price);
        }
        if let Some(days) = adjustment.estimated_development_time {
            quotation.estimated_development_time = Some(days);
        }
        if let Some(valid_until) = adjustment.valid_until {
            quotation.valid_until = Some(valid_until);
        }
        if let Some(notes) = adjustment.notes {
            quotation.notes = Some(notes);
        }
        quotation.updated_at = Utc::now();
        Ok(())
    }

    async fn attach_recommendation(
        &self,
        id: &QuotationId,
        recommendation: &str,
    ) -> Result<(), StoreError> {
        let mut quotations = self.quotations.write().await;
        let quotation = quotations.get_mut(id).ok_or(StoreError::NotFound)?;
        quotation.ai_recommendation = Some(recommendation.to_string());
        quotation.updated_at = Utc::now();
        Ok(())
    }

    async fn convert(&self, id: &QuotationId, deal: Deal) -> Result<(), StoreError> {
        let mut quotations = self.quotations.write().await;
        let mut deals = self.deals.write().await;

        let quotation = quotations.get_mut(id).ok_or(StoreError::NotFound)?;
        if quotation.status != QuotationStatus::Approved {
            return Err(StoreError::Conflict);
        }
        if deals.iter().any(|existing| existing.quotation_id == Some(*id)) {
            return Err(StoreError::Conflict);
        }
        quotation.status = QuotationStatus::Converted;
        quotation.updated_at = Utc::now();
        deals.push(deal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cotiza_core::{
        ClientInfo, LifecycleManager, Question, QuestionId, QuestionKind, QuotationStatus,
        QuotationStore, ServiceId,
    };
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{InMemoryQuestionRepository, InMemoryQuotationStore};

    fn service() -> ServiceId {
        ServiceId("web_development".to_string())
    }

    fn questions() -> Vec<Question> {
        vec![Question {
            id: QuestionId::generate(),
            service_id: service(),
            prompt: "How many pages?".to_string(),
            order_index: 0,
            required: true,
            kind: QuestionKind::Number {
                base_price: Decimal::new(100000, 2),
                multiplier: Decimal::new(5000, 2),
            },
            created_at: Utc::now(),
        }]
    }

    fn client() -> ClientInfo {
        ClientInfo {
            name: "Carlos Rivera".to_string(),
            email: "carlos@rivera.dev".to_string(),
            phone: None,
            company: None,
        }
    }

    #[tokio::test]
    async fn full_lifecycle_runs_against_the_memory_store() {
        let question_set = questions();
        let questions_repo = InMemoryQuestionRepository::with_questions(question_set.clone());
        let store = InMemoryQuotationStore::default();
        let manager = LifecycleManager::new(&questions_repo, &store);

        let wire = json!({ (question_set[0].id.to_string()): 3 });
        let quotation = manager.submit(client(), service(), &wire).await.expect("submit");
        assert_eq!(quotation.subtotal, Decimal::new(115000, 2));

        manager.set_status(&quotation.id, QuotationStatus::Approved).await.expect("approve");
        let deal = manager.convert_to_deal(&quotation.id).await.expect("convert");

        let deals = store.deals().await;
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].id, deal.id);
        assert_eq!(deals[0].quotation_id, Some(quotation.id));

        let stored = store.find_quotation(&quotation.id).await.expect("find").expect("exists");
        assert_eq!(stored.status, QuotationStatus::Converted);
    }

    #[tokio::test]
    async fn double_conversion_is_rejected() {
        let question_set = questions();
        let questions_repo = InMemoryQuestionRepository::with_questions(question_set.clone());
        let store = InMemoryQuotationStore::default();
        let manager = LifecycleManager::new(&questions_repo, &store);

        let wire = json!({ (question_set[0].id.to_string()): 1 });
        let quotation = manager.submit(client(), service(), &wire).await.expect("submit");
        manager.set_status(&quotation.id, QuotationStatus::Approved).await.expect("approve");
        manager.convert_to_deal(&quotation.id).await.expect("first conversion");

        assert!(manager.convert_to_deal(&quotation.id).await.is_err());
        assert_eq!(store.deals().await.len(), 1);
    }
}
