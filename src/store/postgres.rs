//! Postgres-backed `LeadStore`.
//!
//! Expects a `leads` table shaped as created by [`PgStore::ensure_schema`].
//! The adapter keeps a normalized copy of the LinkedIn URL in
//! `linkedin_url_norm` so the exact-identity lookup stays an index-friendly
//! equality; every other canonical comparison is computed in SQL.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Lead, LeadStatus};
use crate::normalize::normalize_url;
use crate::store::{LeadStore, MatchField};

pub struct PgStore {
    pool: PgPool,
}

const SELECT_COLUMNS: &str = "id, uuid, full_name, company, title, location, email, \
     linkedin_url, phone, verified, enriched, needs_enrichment, sync_pending, \
     status, raw_data, created_at, updated_at";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url` and wraps it.
    pub async fn connect(database_url: &str) -> Result<Self, EngineError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        tracing::info!("Connected to lead store database");
        Ok(Self::new(pool))
    }

    /// Creates the `leads` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                uuid UUID NOT NULL,
                full_name TEXT NOT NULL,
                company TEXT,
                title TEXT,
                location TEXT,
                email TEXT,
                linkedin_url TEXT,
                linkedin_url_norm TEXT,
                phone TEXT,
                verified BOOLEAN NOT NULL DEFAULT false,
                enriched BOOLEAN NOT NULL DEFAULT false,
                needs_enrichment BOOLEAN NOT NULL DEFAULT true,
                sync_pending BOOLEAN NOT NULL DEFAULT true,
                status TEXT NOT NULL DEFAULT 'new',
                raw_data JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS leads_linkedin_norm_idx ON leads (linkedin_url_norm)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS leads_email_idx ON leads (lower(email))")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn lead_from_row(row: &sqlx::postgres::PgRow) -> Result<Lead, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Lead {
        id: row.try_get::<Uuid, _>("id")?.to_string(),
        uuid: row.try_get("uuid")?,
        full_name: row.try_get("full_name")?,
        company: row.try_get("company")?,
        title: row.try_get("title")?,
        location: row.try_get("location")?,
        email: row.try_get("email")?,
        linkedin_url: row.try_get("linkedin_url")?,
        phone: row.try_get("phone")?,
        verified: row.try_get("verified")?,
        enriched: row.try_get("enriched")?,
        needs_enrichment: row.try_get("needs_enrichment")?,
        sync_pending: row.try_get("sync_pending")?,
        status: LeadStatus::parse(&status).unwrap_or_default(),
        raw_data: row.try_get("raw_data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn parse_id(id: &str) -> Result<Uuid, EngineError> {
    Uuid::parse_str(id).map_err(|_| EngineError::Storage(format!("malformed lead id: {}", id)))
}

#[async_trait]
impl LeadStore for PgStore {
    async fn find_by_field(
        &self,
        field: MatchField,
        value: &str,
    ) -> Result<Vec<Lead>, EngineError> {
        let sql = match field {
            MatchField::LinkedinUrl => format!(
                "SELECT {} FROM leads WHERE linkedin_url_norm = $1",
                SELECT_COLUMNS
            ),
            MatchField::Email => format!(
                "SELECT {} FROM leads WHERE lower(email) = $1",
                SELECT_COLUMNS
            ),
            MatchField::EmailDomain => format!(
                "SELECT {} FROM leads WHERE email IS NOT NULL AND split_part(lower(email), '@', 2) = $1",
                SELECT_COLUMNS
            ),
            MatchField::FullName => format!(
                r#"SELECT {} FROM leads WHERE lower(regexp_replace(trim(full_name), '\s+', ' ', 'g')) = $1"#,
                SELECT_COLUMNS
            ),
            MatchField::Company => format!(
                r#"SELECT {} FROM leads WHERE company IS NOT NULL AND lower(regexp_replace(trim(company), '\s+', ' ', 'g')) = $1"#,
                SELECT_COLUMNS
            ),
        };

        let rows = sqlx::query(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| lead_from_row(row).map_err(EngineError::Database))
            .collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Lead>, EngineError> {
        let uuid = match Uuid::parse_str(id) {
            Ok(u) => u,
            Err(_) => return Ok(None),
        };

        let row = sqlx::query(&format!("SELECT {} FROM leads WHERE id = $1", SELECT_COLUMNS))
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(|r| lead_from_row(r).map_err(EngineError::Database))
            .transpose()
    }

    async fn insert(&self, lead: Lead) -> Result<String, EngineError> {
        let linkedin_norm = lead.linkedin_url.as_deref().and_then(normalize_url);

        let new_id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO leads (
                uuid, full_name, company, title, location, email,
                linkedin_url, linkedin_url_norm, phone, verified, enriched,
                needs_enrichment, sync_pending, status, raw_data,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(lead.uuid)
        .bind(&lead.full_name)
        .bind(&lead.company)
        .bind(&lead.title)
        .bind(&lead.location)
        .bind(&lead.email)
        .bind(&lead.linkedin_url)
        .bind(&linkedin_norm)
        .bind(&lead.phone)
        .bind(lead.verified)
        .bind(lead.enriched)
        .bind(lead.needs_enrichment)
        .bind(lead.sync_pending)
        .bind(lead.status.as_str())
        .bind(&lead.raw_data)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(new_id.0.to_string())
    }

    async fn update(&self, id: &str, lead: &Lead) -> Result<(), EngineError> {
        let uuid = parse_id(id)?;
        let linkedin_norm = lead.linkedin_url.as_deref().and_then(normalize_url);

        let result = sqlx::query(
            r#"
            UPDATE leads
            SET full_name = $2,
                company = $3,
                title = $4,
                location = $5,
                email = $6,
                linkedin_url = $7,
                linkedin_url_norm = $8,
                phone = $9,
                verified = $10,
                enriched = $11,
                needs_enrichment = $12,
                sync_pending = $13,
                status = $14,
                raw_data = $15,
                created_at = $16,
                updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(uuid)
        .bind(&lead.full_name)
        .bind(&lead.company)
        .bind(&lead.title)
        .bind(&lead.location)
        .bind(&lead.email)
        .bind(&lead.linkedin_url)
        .bind(&linkedin_norm)
        .bind(&lead.phone)
        .bind(lead.verified)
        .bind(lead.enriched)
        .bind(lead.needs_enrichment)
        .bind(lead.sync_pending)
        .bind(lead.status.as_str())
        .bind(&lead.raw_data)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("lead {} does not exist", id)));
        }

        Ok(())
    }
}
