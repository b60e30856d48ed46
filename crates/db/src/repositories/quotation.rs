use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use cotiza_core::{
    AnswerSet, ClientInfo, Deal, Quotation, QuotationId, QuotationOverride, QuotationStatus,
    QuotationStore, ServiceId, StoreError,
};

use super::question::parse_timestamp;
use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed quotation store.
///
/// The two multi-step writes (`insert_quotation` with its answer snapshot,
/// `convert` with its deal insert) each run in one transaction. Status
/// updates are optimistic: the WHERE clause re-checks the status the caller
/// read, so a concurrent transition turns into `StoreError::Conflict`
/// instead of a silent lost update.
pub struct SqlQuotationStore {
    pool: DbPool,
}

impl SqlQuotationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: &QuotationId,
    ) -> Result<Option<Quotation>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, service_id, client_name, client_email, client_phone, client_company,
                   answers_json, subtotal, iva, total, status, final_price,
                   estimated_development_time, valid_until, notes, ai_recommendation,
                   created_at, updated_at
            FROM quotation
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(quotation_from_row).transpose()
    }

    pub async fn list_by_status(
        &self,
        status: QuotationStatus,
    ) -> Result<Vec<Quotation>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, service_id, client_name, client_email, client_phone, client_company,
                   answers_json, subtotal, iva, total, status, final_price,
                   estimated_development_time, valid_until, notes, ai_recommendation,
                   created_at, updated_at
            FROM quotation
            WHERE status = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(quotation_from_row).collect()
    }

    pub async fn find_deal_for_quotation(
        &self,
        id: &QuotationId,
    ) -> Result<Option<Deal>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, client_name, client_email, CAST(value AS TEXT) AS value_text,
                    quotation_id, created_at
             FROM deal WHERE quotation_id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(deal_from_row).transpose()
    }

    async fn quotation_exists(&self, id: &QuotationId) -> Result<bool, sqlx::Error> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quotation WHERE id = ?)")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists == 1)
    }

    /// Distinguishes "row gone" from "row changed under us" after an
    /// optimistic UPDATE touched zero rows.
    async fn zero_rows_error(&self, id: &QuotationId) -> StoreError {
        match self.quotation_exists(id).await {
            Ok(true) => StoreError::Conflict,
            Ok(false) => StoreError::NotFound,
            Err(error) => StoreError::Unavailable(error.to_string()),
        }
    }
}

#[async_trait]
impl QuotationStore for SqlQuotationStore {
    async fn insert_quotation(&self, quotation: Quotation) -> Result<(), StoreError> {
        let answers_json =
            serde_json::to_string(&quotation.answers)
                .map_err(|error| StoreError::Unavailable(error.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        sqlx::query(
            r#"
            INSERT INTO quotation (
                id, service_id, client_name, client_email, client_phone, client_company,
                answers_json, subtotal, iva, total, status, final_price,
                estimated_development_time, valid_until, notes, ai_recommendation,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(quotation.id.to_string())
        .bind(&quotation.service_id.0)
        .bind(&quotation.client.name)
        .bind(&quotation.client.email)
        .bind(quotation.client.phone.as_deref())
        .bind(quotation.client.company.as_deref())
        .bind(answers_json)
        .bind(quotation.subtotal.to_string())
        .bind(quotation.iva.to_string())
        .bind(quotation.total.to_string())
        .bind(quotation.status.as_str())
        .bind(quotation.final_price.map(|price| price.to_string()))
        .bind(quotation.estimated_development_time)
        .bind(quotation.valid_until.map(|date| date.to_string()))
        .bind(quotation.notes.as_deref())
        .bind(quotation.ai_recommendation.as_deref())
        .bind(quotation.created_at.to_rfc3339())
        .bind(quotation.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;

        Ok(())
    }

    async fn find_quotation(&self, id: &QuotationId) -> Result<Option<Quotation>, StoreError> {
        self.find_by_id(id).await.map_err(StoreError::from)
    }

    async fn update_status(
        &self,
        id: &QuotationId,
        expected: QuotationStatus,
        next: QuotationStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE quotation SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(self.zero_rows_error(id).await);
        }
        Ok(())
    }

    async fn apply_override(
        &self,
        id: &QuotationId,
        adjustment: QuotationOverride,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE quotation SET
                final_price = COALESCE(?, final_price),
                estimated_development_time = COALESCE(?, estimated_development_time),
                valid_until = COALESCE(?, valid_until),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(adjustment.final_price.map(|price| price.to_string()))
        .bind(adjustment.estimated_development_time)
        .bind(adjustment.valid_until.map(|date| date.to_string()))
        .bind(adjustment.notes.as_deref())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn attach_recommendation(
        &self,
        id: &QuotationId,
        recommendation: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE quotation SET ai_recommendation = ?, updated_at = ? WHERE id = ?",
        )
        .bind(recommendation)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn convert(&self, id: &QuotationId, deal: Deal) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let updated = sqlx::query(
            "UPDATE quotation SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(QuotationStatus::Converted.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .bind(QuotationStatus::Approved.as_str())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(unavailable)?;
            return Err(self.zero_rows_error(id).await);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO deal (id, name, client_name, client_email, value, quotation_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(deal.id.to_string())
        .bind(&deal.name)
        .bind(&deal.client_name)
        .bind(&deal.client_email)
        .bind(deal.value.to_string())
        .bind(deal.quotation_id.map(|quotation_id| quotation_id.to_string()))
        .bind(deal.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        if let Err(error) = inserted {
            tx.rollback().await.map_err(unavailable)?;
            return Err(unavailable(error));
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

fn quotation_from_row(row: &SqliteRow) -> Result<Quotation, RepositoryError> {
    let id_raw: String = row.try_get("id")?;
    let id = id_raw
        .parse()
        .map(QuotationId)
        .map_err(|_| RepositoryError::Decode(format!("invalid quotation id `{id_raw}`")))?;
    let service_id: String = row.try_get("service_id")?;

    let answers_json: String = row.try_get("answers_json")?;
    let answers: AnswerSet = serde_json::from_str(&answers_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid answers_json: {error}")))?;

    let status_raw: String = row.try_get("status")?;
    let status = QuotationStatus::from_str(&status_raw)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let valid_until: Option<String> = row.try_get("valid_until")?;
    let valid_until = valid_until
        .map(|raw| {
            NaiveDate::from_str(&raw).map_err(|error| {
                RepositoryError::Decode(format!("invalid valid_until date: {error}"))
            })
        })
        .transpose()?;

    let created_at_raw: String = row.try_get("created_at")?;
    let updated_at_raw: String = row.try_get("updated_at")?;

    Ok(Quotation {
        id,
        service_id: ServiceId(service_id),
        client: ClientInfo {
            name: row.try_get("client_name")?,
            email: row.try_get("client_email")?,
            phone: row.try_get("client_phone")?,
            company: row.try_get("client_company")?,
        },
        answers,
        subtotal: decode_decimal(row, "subtotal")?,
        iva: decode_decimal(row, "iva")?,
        total: decode_decimal(row, "total")?,
        status,
        final_price: decode_optional_decimal(row, "final_price")?,
        estimated_development_time: row.try_get("estimated_development_time")?,
        valid_until,
        notes: row.try_get("notes")?,
        ai_recommendation: row.try_get("ai_recommendation")?,
        created_at: parse_timestamp("created_at", &created_at_raw)?,
        updated_at: parse_timestamp("updated_at", &updated_at_raw)?,
    })
}

fn deal_from_row(row: &SqliteRow) -> Result<Deal, RepositoryError> {
    use cotiza_core::DealId;

    let id_raw: String = row.try_get("id")?;
    let id = id_raw
        .parse()
        .map(DealId)
        .map_err(|_| RepositoryError::Decode(format!("invalid deal id `{id_raw}`")))?;
    let quotation_id: Option<String> = row.try_get("quotation_id")?;
    let quotation_id = quotation_id
        .map(|raw| {
            raw.parse().map(QuotationId).map_err(|_| {
                RepositoryError::Decode(format!("invalid quotation id `{raw}` on deal"))
            })
        })
        .transpose()?;
    let value_text: String = row.try_get("value_text")?;
    let created_at_raw: String = row.try_get("created_at")?;

    Ok(Deal {
        id,
        name: row.try_get("name")?,
        client_name: row.try_get("client_name")?,
        client_email: row.try_get("client_email")?,
        value: Decimal::from_str(&value_text)
            .map_err(|error| RepositoryError::Decode(format!("invalid deal value: {error}")))?,
        quotation_id,
        created_at: parse_timestamp("created_at", &created_at_raw)?,
    })
}

fn decode_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: {error}"))
    })
}

fn decode_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        Decimal::from_str(&value).map_err(|error| {
            RepositoryError::Decode(format!("invalid decimal in `{column}`: {error}"))
        })
    })
    .transpose()
}
