//! Merge Policy Engine.
//!
//! Given the stored record and an incoming partial that matched it, computes
//! the reconciled record. The governing rule for display strings: a later,
//! more complete scrape supersedes an earlier partial one, so incoming wins
//! when it is at least as long; a previously stored non-empty field is never
//! silently dropped.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::aliases::incoming_from_raw;
use crate::errors::EngineError;
use crate::models::{IncomingLead, Lead};

// Values that look filled-in but carry no information. They never overwrite
// real data and are never preferred over real data.
const PLACEHOLDERS: &[&str] = &["unknown", "n/a", "na", "none", "null", "-", "--", "tbd"];

fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    lowered.is_empty() || PLACEHOLDERS.contains(&lowered.as_str())
}

/// Resolves one display-string field. Incoming overwrites when it is at
/// least as long as existing; an absent or placeholder side loses to a real
/// value on the other.
fn choose_display(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    let real_existing = existing.filter(|v| !is_placeholder(v));
    let real_incoming = incoming.filter(|v| !is_placeholder(v));

    match (real_existing, real_incoming) {
        (Some(e), Some(i)) => {
            if i.chars().count() >= e.chars().count() {
                Some(i.to_string())
            } else {
                Some(e.to_string())
            }
        }
        (Some(e), None) => Some(e.to_string()),
        (None, Some(i)) => Some(i.to_string()),
        // Nothing real on either side; keep whatever was stored.
        (None, None) => existing.or(incoming).map(str::to_string),
    }
}

fn confidence_of(map: &Map<String, Value>) -> Option<f64> {
    map.get("confidence").and_then(Value::as_f64)
}

fn union_arrays(existing: &[Value], incoming: &[Value]) -> Value {
    let mut merged = existing.to_vec();
    for item in incoming {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    Value::Array(merged)
}

/// Deep-merges two open extension maps.
///
/// Nested maps merge recursively and arrays union rather than overwrite.
/// A scalar present in both resolves to the side whose map states the
/// higher `confidence`; absent that, incoming wins.
pub fn deep_merge(existing: &Value, incoming: &Value) -> Value {
    match (existing, incoming) {
        (Value::Object(existing_map), Value::Object(incoming_map)) => {
            let existing_conf = confidence_of(existing_map);
            let incoming_conf = confidence_of(incoming_map);

            let mut merged = existing_map.clone();
            for (key, incoming_val) in incoming_map {
                let resolved = match merged.get(key) {
                    Some(existing_val) => match (existing_val, incoming_val) {
                        (Value::Object(_), Value::Object(_)) => {
                            deep_merge(existing_val, incoming_val)
                        }
                        (Value::Array(ea), Value::Array(ia)) => union_arrays(ea, ia),
                        _ => match (existing_conf, incoming_conf) {
                            (Some(ec), Some(ic)) if ec > ic => existing_val.clone(),
                            _ => incoming_val.clone(),
                        },
                    },
                    None => incoming_val.clone(),
                };
                merged.insert(key.clone(), resolved);
            }
            Value::Object(merged)
        }
        (_, Value::Null) => existing.clone(),
        _ => incoming.clone(),
    }
}

/// Reconciles an incoming partial into the stored record.
pub fn merge_leads(existing: &Lead, incoming: &IncomingLead, now: DateTime<Utc>) -> Lead {
    let enriched = existing.enriched || incoming.enriched.unwrap_or(false);

    Lead {
        id: existing.id.clone(),
        uuid: existing.uuid,
        full_name: choose_display(Some(&existing.full_name), incoming.full_name.as_deref())
            .unwrap_or_else(|| existing.full_name.clone()),
        company: choose_display(existing.company.as_deref(), incoming.company.as_deref()),
        title: choose_display(existing.title.as_deref(), incoming.title.as_deref()),
        location: choose_display(existing.location.as_deref(), incoming.location.as_deref()),
        email: choose_display(existing.email.as_deref(), incoming.email.as_deref()),
        linkedin_url: choose_display(
            existing.linkedin_url.as_deref(),
            incoming.linkedin_url.as_deref(),
        ),
        phone: choose_display(existing.phone.as_deref(), incoming.phone.as_deref()),
        // Once true, stays true.
        verified: existing.verified || incoming.verified.unwrap_or(false),
        enriched,
        needs_enrichment: if enriched {
            false
        } else {
            incoming
                .needs_enrichment
                .unwrap_or(existing.needs_enrichment)
        },
        sync_pending: true,
        status: incoming.status.unwrap_or(existing.status),
        raw_data: deep_merge(&existing.raw_data, &incoming.raw_data),
        created_at: existing
            .created_at
            .min(incoming.created_at.unwrap_or(existing.created_at)),
        updated_at: now,
    }
}

/// Standalone map-level merge, exposed for callers that want to inspect a
/// merge before committing it. Both arguments go through the field-alias
/// boundary; `id`/`uuid` of `existing` are preserved in the result.
pub fn merge_lead_data(existing: &Value, incoming: &Value) -> Result<Value, EngineError> {
    let existing_partial = incoming_from_raw(existing)?;
    let incoming_partial = incoming_from_raw(incoming)?;
    let now = Utc::now();

    let existing_lead = Lead {
        id: existing
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        uuid: existing
            .get("uuid")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4),
        full_name: existing_partial.full_name.clone().unwrap_or_default(),
        company: existing_partial.company.clone(),
        title: existing_partial.title.clone(),
        location: existing_partial.location.clone(),
        email: existing_partial.email.clone(),
        linkedin_url: existing_partial.linkedin_url.clone(),
        phone: existing_partial.phone.clone(),
        verified: existing_partial.verified.unwrap_or(false),
        enriched: existing_partial.enriched.unwrap_or(false),
        needs_enrichment: existing_partial.needs_enrichment.unwrap_or(true),
        sync_pending: existing
            .get("sync_pending")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        status: existing_partial.status.unwrap_or_default(),
        raw_data: existing_partial.raw_data.clone(),
        created_at: existing_partial.created_at.unwrap_or(now),
        updated_at: now,
    };

    let merged = merge_leads(&existing_lead, &incoming_partial, now);
    serde_json::to_value(&merged)
        .map_err(|e| EngineError::Storage(format!("failed to serialize merged lead: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_lead() -> Lead {
        Lead {
            id: "lead-1".to_string(),
            uuid: Uuid::new_v4(),
            full_name: "Bob Johnson".to_string(),
            company: Some("Tech Corp".to_string()),
            title: None,
            location: None,
            email: None,
            linkedin_url: None,
            phone: None,
            verified: false,
            enriched: false,
            needs_enrichment: true,
            sync_pending: false,
            status: Default::default(),
            raw_data: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_incoming_fills_empty_fields() {
        let existing = base_lead();
        let incoming = IncomingLead {
            email: Some("bob@techcorp.com".to_string()),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &incoming, Utc::now());
        assert_eq!(merged.email.as_deref(), Some("bob@techcorp.com"));
        assert_eq!(merged.full_name, "Bob Johnson");
    }

    #[test]
    fn test_longer_incoming_wins_shorter_loses() {
        let existing = base_lead();
        let longer = IncomingLead {
            full_name: Some("Robert Johnson Jr.".to_string()),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &longer, Utc::now());
        assert_eq!(merged.full_name, "Robert Johnson Jr.");

        let shorter = IncomingLead {
            full_name: Some("Bob".to_string()),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &shorter, Utc::now());
        assert_eq!(merged.full_name, "Bob Johnson");
    }

    #[test]
    fn test_placeholder_never_overwrites() {
        let existing = base_lead();
        let incoming = IncomingLead {
            company: Some("N/A".to_string()),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &incoming, Utc::now());
        assert_eq!(merged.company.as_deref(), Some("Tech Corp"));
    }

    #[test]
    fn test_boolean_flags_or() {
        let mut existing = base_lead();
        existing.verified = true;
        let incoming = IncomingLead {
            verified: Some(false),
            enriched: Some(true),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &incoming, Utc::now());
        assert!(merged.verified);
        assert!(merged.enriched);
        assert!(!merged.needs_enrichment);
    }

    #[test]
    fn test_created_at_keeps_earlier() {
        let mut existing = base_lead();
        let earlier = Utc::now() - chrono::Duration::days(30);
        existing.created_at = Utc::now();
        let incoming = IncomingLead {
            created_at: Some(earlier),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &incoming, Utc::now());
        assert_eq!(merged.created_at, earlier);

        // And the other direction: an incoming timestamp never pushes
        // created_at forward.
        let mut existing = base_lead();
        existing.created_at = earlier;
        let incoming = IncomingLead {
            created_at: Some(Utc::now()),
            ..Default::default()
        };
        let merged = merge_leads(&existing, &incoming, Utc::now());
        assert_eq!(merged.created_at, earlier);
    }

    #[test]
    fn test_merge_sets_sync_pending() {
        let existing = base_lead();
        let merged = merge_leads(&existing, &IncomingLead::default(), Utc::now());
        assert!(merged.sync_pending);
    }

    #[test]
    fn test_deep_merge_scalar_prefers_higher_confidence() {
        let existing = json!({"confidence": 0.9, "seniority": "senior"});
        let incoming = json!({"confidence": 0.4, "seniority": "junior"});
        let merged = deep_merge(&existing, &incoming);
        assert_eq!(merged["seniority"], json!("senior"));

        // Without stated confidence, incoming wins.
        let existing = json!({"seniority": "senior"});
        let incoming = json!({"seniority": "junior"});
        let merged = deep_merge(&existing, &incoming);
        assert_eq!(merged["seniority"], json!("junior"));
    }

    #[test]
    fn test_deep_merge_unions_nested_maps_and_arrays() {
        let existing = json!({
            "social_profiles": {"twitter": "@bob"},
            "tags": ["scraped"]
        });
        let incoming = json!({
            "social_profiles": {"github": "bobj"},
            "tags": ["enriched"]
        });
        let merged = deep_merge(&existing, &incoming);
        assert_eq!(merged["social_profiles"]["twitter"], json!("@bob"));
        assert_eq!(merged["social_profiles"]["github"], json!("bobj"));
        assert_eq!(merged["tags"], json!(["scraped", "enriched"]));
    }

    #[test]
    fn test_deep_merge_keeps_existing_only_keys() {
        let existing = json!({"source": "scraper_v1"});
        let incoming = json!({"batch": 7});
        let merged = deep_merge(&existing, &incoming);
        assert_eq!(merged["source"], json!("scraper_v1"));
        assert_eq!(merged["batch"], json!(7));
    }

    #[test]
    fn test_merge_lead_data_maps() {
        let existing = json!({
            "id": "lead-9",
            "full_name": "Bob Johnson",
            "company": "Tech Corp",
            "verified": true
        });
        let incoming = json!({
            "name": "Bob Johnson",
            "email": "bob@techcorp.com",
            "title": "VP Engineering"
        });
        let merged = merge_lead_data(&existing, &incoming).unwrap();
        assert_eq!(merged["id"], json!("lead-9"));
        assert_eq!(merged["email"], json!("bob@techcorp.com"));
        assert_eq!(merged["title"], json!("VP Engineering"));
        assert_eq!(merged["company"], json!("Tech Corp"));
        assert_eq!(merged["verified"], json!(true));
    }
}
