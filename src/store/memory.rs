//! In-memory `LeadStore` used by the test suite and as the reference
//! semantics of the store contract.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::EngineError;
use crate::models::Lead;
use crate::normalize::{email_domain, normalize_name, normalize_url};
use crate::store::{LeadStore, MatchField};

#[derive(Default)]
pub struct MemoryStore {
    leads: RwLock<HashMap<String, Lead>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored leads.
    pub async fn len(&self) -> usize {
        self.leads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.leads.read().await.is_empty()
    }
}

/// Canonical comparison form of a stored lead's field, mirroring what the
/// engine sends as query values.
fn canonical(lead: &Lead, field: MatchField) -> Option<String> {
    match field {
        MatchField::LinkedinUrl => lead.linkedin_url.as_deref().and_then(normalize_url),
        MatchField::Email => lead.email.as_deref().map(|e| e.trim().to_lowercase()),
        MatchField::EmailDomain => lead
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .and_then(|e| email_domain(&e)),
        MatchField::FullName => Some(normalize_name(&lead.full_name)).filter(|s| !s.is_empty()),
        MatchField::Company => lead
            .company
            .as_deref()
            .map(normalize_name)
            .filter(|s| !s.is_empty()),
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn find_by_field(
        &self,
        field: MatchField,
        value: &str,
    ) -> Result<Vec<Lead>, EngineError> {
        let leads = self.leads.read().await;
        Ok(leads
            .values()
            .filter(|lead| canonical(lead, field).as_deref() == Some(value))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Lead>, EngineError> {
        Ok(self.leads.read().await.get(id).cloned())
    }

    async fn insert(&self, mut lead: Lead) -> Result<String, EngineError> {
        let id = lead.uuid.to_string();
        lead.id = id.clone();
        self.leads.write().await.insert(id.clone(), lead);
        Ok(id)
    }

    async fn update(&self, id: &str, lead: &Lead) -> Result<(), EngineError> {
        let mut leads = self.leads.write().await;
        match leads.get_mut(id) {
            Some(stored) => {
                let mut replacement = lead.clone();
                replacement.id = stored.id.clone();
                replacement.uuid = stored.uuid;
                *stored = replacement;
                Ok(())
            }
            None => Err(EngineError::NotFound(format!(
                "lead {} does not exist",
                id
            ))),
        }
    }
}
