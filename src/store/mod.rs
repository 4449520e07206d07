//! Store contract consumed by the identity engine.
//!
//! The engine never talks to a storage backend directly; it takes an
//! `Arc<dyn LeadStore>` at construction and issues the four operations
//! below. All four are used within one identity-lock scope per `add_lead`
//! call, and the engine issues exactly one logical write per call.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::models::Lead;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Fields the match evaluator queries by. Implementations must compare
/// canonically: queries arrive already normalized (see `normalize`), and
/// stored values are reduced to the same comparison form before the
/// equality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    /// Normalized URL equality (no scheme/www/query/trailing slash, lowercase).
    LinkedinUrl,
    /// Case-insensitive email equality.
    Email,
    /// Equality on the domain part of the stored email.
    EmailDomain,
    /// Case-folded, whitespace-collapsed full-name equality.
    FullName,
    /// Case-folded, whitespace-collapsed company equality.
    Company,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::LinkedinUrl => "linkedin_url",
            MatchField::Email => "email",
            MatchField::EmailDomain => "email_domain",
            MatchField::FullName => "full_name",
            MatchField::Company => "company",
        }
    }
}

/// Narrow query/insert/update interface over the lead store.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Returns every stored lead whose canonical form of `field` equals
    /// `value` (itself already canonical).
    async fn find_by_field(&self, field: MatchField, value: &str)
        -> Result<Vec<Lead>, EngineError>;

    /// Fetches a lead by id; `None` when no such record exists.
    async fn get(&self, id: &str) -> Result<Option<Lead>, EngineError>;

    /// Inserts a new lead and returns its store-assigned id. The `id` field
    /// of the passed record is ignored.
    async fn insert(&self, lead: Lead) -> Result<String, EngineError>;

    /// Replaces the record stored under `id`. The write is all-or-nothing:
    /// implementations must not persist a subset of fields on failure.
    async fn update(&self, id: &str, lead: &Lead) -> Result<(), EngineError>;
}
