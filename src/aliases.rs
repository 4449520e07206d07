//! Field-alias boundary.
//!
//! Scrapers and enrichers disagree on key names (`Name` vs `full_name` vs
//! `contact_name`). Instead of `or`-chained lookups scattered through the
//! matching logic, the alias table is consulted exactly once here, producing
//! a canonical [`IncomingLead`] before anything else runs. Keys the table
//! does not know are preserved under `raw_data` instead of being dropped.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::errors::EngineError;
use crate::models::{IncomingLead, LeadStatus};
use crate::normalize::{normalize_email, normalize_phone};

const FULL_NAME_ALIASES: &[&str] = &["full_name", "name", "fullname", "contact_name", "lead_name"];
const COMPANY_ALIASES: &[&str] = &["company", "company_name", "organization", "org", "employer"];
const TITLE_ALIASES: &[&str] = &["title", "job_title", "position", "headline", "role"];
const LOCATION_ALIASES: &[&str] = &["location", "city", "region", "area"];
const EMAIL_ALIASES: &[&str] = &["email", "email_address", "work_email", "contact_email"];
const LINKEDIN_ALIASES: &[&str] = &[
    "linkedin_url",
    "linkedin",
    "linkedin_profile",
    "profile_url",
    "li_url",
];
const PHONE_ALIASES: &[&str] = &["phone", "phone_number", "mobile", "telephone", "cell"];

/// Flag and metadata keys consumed directly (no aliasing observed for
/// these). `id`/`uuid`/`sync_pending` are engine-owned and ignored when they
/// arrive on an incoming dict, rather than smuggled into `raw_data`.
const DIRECT_KEYS: &[&str] = &[
    "verified",
    "enriched",
    "needs_enrichment",
    "status",
    "raw_data",
    "created_at",
    "updated_at",
    "id",
    "uuid",
    "sync_pending",
];

/// Canonical key form used for the alias lookup.
fn canonical_key(key: &str) -> String {
    key.trim().to_lowercase().replace([' ', '-'], "_")
}

fn lookup<'a>(fields: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(v) = fields.get(*alias) {
            if !v.is_null() {
                return Some(v);
            }
        }
    }
    None
}

fn as_trimmed_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Converts a raw incoming dict into an [`IncomingLead`].
///
/// Returns a `Validation` error when the input is not a JSON object. Field
/// values that fail canonicalization (malformed email, unparsable phone)
/// are treated as absent, logged, and not carried into `raw_data`.
pub fn incoming_from_raw(raw: &Value) -> Result<IncomingLead, EngineError> {
    let object = raw
        .as_object()
        .ok_or_else(|| EngineError::Validation("incoming lead must be an object".to_string()))?;

    // Re-key everything once so alias lookup is case/format-insensitive.
    let mut fields: Map<String, Value> = Map::new();
    for (key, value) in object {
        fields.insert(canonical_key(key), value.clone());
    }

    let email = lookup(&fields, EMAIL_ALIASES)
        .and_then(as_trimmed_string)
        .and_then(|e| {
            let normalized = normalize_email(&e);
            if normalized.is_none() {
                tracing::warn!("Dropping malformed email: {}", e);
            }
            normalized
        });

    let phone = lookup(&fields, PHONE_ALIASES)
        .and_then(as_trimmed_string)
        .and_then(|p| {
            let normalized = normalize_phone(&p);
            if normalized.is_none() {
                tracing::warn!("Dropping unparsable phone: {}", p);
            }
            normalized
        });

    let status = lookup(&fields, &["status"])
        .and_then(as_trimmed_string)
        .and_then(|s| {
            let parsed = LeadStatus::parse(&s);
            if parsed.is_none() {
                tracing::warn!("Ignoring unknown lead status: {}", s);
            }
            parsed
        });

    let incoming = IncomingLead {
        full_name: lookup(&fields, FULL_NAME_ALIASES).and_then(as_trimmed_string),
        company: lookup(&fields, COMPANY_ALIASES).and_then(as_trimmed_string),
        title: lookup(&fields, TITLE_ALIASES).and_then(as_trimmed_string),
        location: lookup(&fields, LOCATION_ALIASES).and_then(as_trimmed_string),
        email,
        linkedin_url: lookup(&fields, LINKEDIN_ALIASES).and_then(as_trimmed_string),
        phone,
        verified: lookup(&fields, &["verified"]).and_then(as_bool),
        enriched: lookup(&fields, &["enriched"]).and_then(as_bool),
        needs_enrichment: lookup(&fields, &["needs_enrichment"]).and_then(as_bool),
        status,
        created_at: lookup(&fields, &["created_at"]).and_then(as_timestamp),
        raw_data: collect_raw_data(&fields),
    };

    Ok(incoming)
}

/// Everything the alias table did not consume, plus the contents of an
/// explicit `raw_data` object, becomes the open extension map.
fn collect_raw_data(fields: &Map<String, Value>) -> Value {
    let consumed: HashSet<&str> = FULL_NAME_ALIASES
        .iter()
        .chain(COMPANY_ALIASES)
        .chain(TITLE_ALIASES)
        .chain(LOCATION_ALIASES)
        .chain(EMAIL_ALIASES)
        .chain(LINKEDIN_ALIASES)
        .chain(PHONE_ALIASES)
        .chain(DIRECT_KEYS)
        .copied()
        .collect();

    let mut raw_data = Map::new();

    if let Some(explicit) = fields.get("raw_data").and_then(Value::as_object) {
        for (key, value) in explicit {
            raw_data.insert(key.clone(), value.clone());
        }
    }

    for (key, value) in fields {
        if !consumed.contains(key.as_str()) {
            raw_data.insert(key.clone(), value.clone());
        }
    }

    Value::Object(raw_data)
}
