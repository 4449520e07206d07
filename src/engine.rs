//! Ingestion Coordinator.
//!
//! The public entry point tying normalization, match evaluation,
//! aggregation, and the merge policy together over an injected store,
//! providing idempotent upsert semantics: repeated `add_lead` calls
//! describing the same real-world identity always converge on one stored
//! record.

use chrono::Utc;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::aliases::incoming_from_raw;
use crate::config::Config;
use crate::errors::{EngineError, ResultExt};
use crate::lock::IdentityLocks;
use crate::matching::{aggregate, MatchEvaluator};
use crate::merge::{merge_lead_data, merge_leads};
use crate::models::{DuplicateMatch, IncomingLead, Lead};
use crate::normalize::{normalize_name, normalize_url};
use crate::store::LeadStore;

pub struct IdentityEngine {
    store: Arc<dyn LeadStore>,
    evaluator: MatchEvaluator,
    config: Config,
    locks: IdentityLocks,
    // Normalized identity key -> lead id, refreshed on every write. Lets a
    // repeat sighting of a known email/profile skip the match queries.
    identity_cache: Cache<String, String>,
}

impl IdentityEngine {
    pub fn new(store: Arc<dyn LeadStore>, config: Config) -> Self {
        let identity_cache = Cache::builder()
            .max_capacity(config.identity_cache_capacity)
            .time_to_live(Duration::from_secs(config.identity_cache_ttl_secs))
            .build();

        Self {
            evaluator: MatchEvaluator::new(store.clone()),
            locks: IdentityLocks::new(config.lock_shards),
            identity_cache,
            store,
            config,
        }
    }

    /// Upserts a raw lead dict and returns the id of the record it landed
    /// in: the existing record's id when a match clears the merge
    /// threshold, a fresh id otherwise.
    pub async fn add_lead(&self, raw: &Value) -> Result<String, EngineError> {
        let incoming = incoming_from_raw(raw)?;
        let name = incoming
            .full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| EngineError::Validation("full_name is required".to_string()))?
            .to_string();

        // Everything from match lookup to the write happens under the
        // identity lock; concurrent calls for the same person serialize
        // here instead of racing into two records.
        let keys = identity_keys(&incoming);
        let _guards = self.locks.acquire(&keys).await;

        // Known identity key? Skip the match queries entirely.
        let mut cached_hit = None;
        for key in cacheable_keys(&incoming) {
            if let Some(id) = self.identity_cache.get(&key).await {
                match self.store.get(&id).await? {
                    Some(existing) => {
                        tracing::debug!("Identity cache hit for {} -> lead {}", key, id);
                        cached_hit = Some(existing);
                        break;
                    }
                    None => self.identity_cache.invalidate(&key).await,
                }
            }
        }
        if let Some(existing) = cached_hit {
            return self.merge_into(existing, incoming).await;
        }

        let candidates = aggregate(self.evaluator.evaluate(&incoming).await?);

        if let Some(top) = candidates.first() {
            tracing::debug!(
                "Top match for '{}': lead {} at {:.2} via {}",
                name,
                top.lead_id,
                top.confidence,
                top.match_type.as_str()
            );

            if top.confidence >= self.config.merge_threshold {
                match self
                    .store
                    .get(&top.lead_id)
                    .await
                    .context("fetching matched lead")?
                {
                    Some(existing) => return self.merge_into(existing, incoming).await,
                    None => {
                        // A matcher returned an id the store no longer has;
                        // fall through and insert rather than lose the lead.
                        tracing::warn!(
                            "Matched lead {} vanished before merge; inserting new record",
                            top.lead_id
                        );
                    }
                }
            } else {
                tracing::info!(
                    "Best match for '{}' is {:.2} via {}, below merge threshold {}; inserting",
                    name,
                    top.confidence,
                    top.match_type.as_str(),
                    self.config.merge_threshold
                );
            }
        }

        let cache_keys = cacheable_keys(&incoming);
        let lead = incoming.into_new_lead(Utc::now());
        let id = self
            .store
            .insert(lead)
            .await
            .context("inserting new lead")?;
        self.refresh_cache(cache_keys.into_iter().map(|k| (k, id.clone())).collect())
            .await;
        tracing::info!("✓ Inserted new lead '{}' as {}", name, id);
        Ok(id)
    }

    /// Runs normalization, match evaluation, and aggregation without
    /// writing anything. Callers use this to preview candidates, including
    /// the weak, sub-threshold matches `add_lead` deliberately refuses to
    /// merge.
    pub async fn find_duplicates(&self, raw: &Value) -> Result<Vec<DuplicateMatch>, EngineError> {
        let incoming = incoming_from_raw(raw)?;
        Ok(aggregate(self.evaluator.evaluate(&incoming).await?))
    }

    /// Standalone merge preview over raw maps; nothing is written.
    pub fn merge_lead_data(&self, existing: &Value, incoming: &Value) -> Result<Value, EngineError> {
        merge_lead_data(existing, incoming)
    }

    /// Passthrough update for downstream enrichment/sync steps that already
    /// hold a lead id. Applies the same merge policy as a matched
    /// `add_lead`, bypassing the match evaluator.
    pub async fn update_lead(&self, id: &str, partial: &Value) -> Result<Lead, EngineError> {
        let incoming = incoming_from_raw(partial)?;

        let existing = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("lead {} does not exist", id)))?;

        let mut keys = identity_keys_for_lead(&existing);
        keys.extend(identity_keys(&incoming));
        let _guards = self.locks.acquire(&keys).await;

        // Re-read under the lock; the record may have moved since the
        // unlocked existence check.
        let existing = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("lead {} does not exist", id)))?;

        let merged = merge_leads(&existing, &incoming, Utc::now());
        self.store
            .update(id, &merged)
            .await
            .context("updating lead")?;
        self.refresh_cache(lead_cache_entries(&merged)).await;
        tracing::debug!("Updated lead {}", id);
        Ok(merged)
    }

    /// Read passthrough.
    pub async fn get_lead(&self, id: &str) -> Result<Option<Lead>, EngineError> {
        self.store.get(id).await
    }

    async fn merge_into(&self, existing: Lead, incoming: IncomingLead) -> Result<String, EngineError> {
        let id = existing.id.clone();
        let merged = merge_leads(&existing, &incoming, Utc::now());
        self.store
            .update(&id, &merged)
            .await
            .context("writing merged lead")?;
        self.refresh_cache(lead_cache_entries(&merged)).await;
        tracing::info!("✓ Merged incoming lead into existing record {}", id);
        Ok(id)
    }

    async fn refresh_cache(&self, entries: Vec<(String, String)>) {
        for (key, id) in entries {
            self.identity_cache.insert(key, id).await;
        }
    }
}

/// Lock keys for an incoming record: every identity signal it carries.
fn identity_keys(incoming: &IncomingLead) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(url) = incoming.linkedin_url.as_deref().and_then(normalize_url) {
        keys.push(format!("linkedin:{}", url));
    }
    if let Some(email) = incoming.email.as_deref() {
        keys.push(format!("email:{}", email));
    }
    if let Some(name) = incoming.full_name.as_deref() {
        let norm_name = normalize_name(name);
        match incoming.company.as_deref().map(normalize_name) {
            Some(company) if !company.is_empty() => {
                keys.push(format!("name_company:{}|{}", norm_name, company));
            }
            _ => keys.push(format!("name:{}", norm_name)),
        }
    }
    keys
}

fn identity_keys_for_lead(lead: &Lead) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(url) = lead.linkedin_url.as_deref().and_then(normalize_url) {
        keys.push(format!("linkedin:{}", url));
    }
    if let Some(email) = lead.email.as_deref() {
        keys.push(format!("email:{}", email.trim().to_lowercase()));
    }
    keys
}

/// Cache probe keys: only the exact-identity signals are cached.
fn cacheable_keys(incoming: &IncomingLead) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(url) = incoming.linkedin_url.as_deref().and_then(normalize_url) {
        keys.push(format!("linkedin:{}", url));
    }
    if let Some(email) = incoming.email.as_deref() {
        keys.push(format!("email:{}", email));
    }
    keys
}

fn lead_cache_entries(lead: &Lead) -> Vec<(String, String)> {
    identity_keys_for_lead(lead)
        .into_iter()
        .map(|key| (key, lead.id.clone()))
        .collect()
}

