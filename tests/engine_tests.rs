/// Integration tests for the ingestion coordinator
/// Exercises idempotent upserts, duplicate preview, merging, and the
/// concurrency guarantees over the in-memory store.
use serde_json::json;
use std::sync::Arc;

use lead_identity_engine::config::Config;
use lead_identity_engine::engine::IdentityEngine;
use lead_identity_engine::models::MatchType;
use lead_identity_engine::store::MemoryStore;

fn new_engine() -> (Arc<IdentityEngine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(IdentityEngine::new(store.clone(), Config::default()));
    (engine, store)
}

#[cfg(test)]
mod exact_identity_tests {
    use super::*;

    #[tokio::test]
    async fn test_linkedin_url_variants_converge_on_one_record() {
        let (engine, store) = new_engine();

        let first = engine
            .add_lead(&json!({
                "full_name": "John Smith",
                "company": "Company One",
                "linkedin_url": "https://linkedin.com/in/johnsmith"
            }))
            .await
            .unwrap();

        // Different name, different company; the URL alone must carry it.
        let second = engine
            .add_lead(&json!({
                "full_name": "J. Smith",
                "company": "Other Corp",
                "linkedin_url": "https://www.linkedin.com/in/johnsmith/",
                "title": "CTO"
            }))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);

        // The second call's more-complete fields landed in the record.
        let stored = engine.get_lead(&first).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("CTO"));
    }

    #[tokio::test]
    async fn test_email_match_is_case_insensitive() {
        let (engine, store) = new_engine();

        let first = engine
            .add_lead(&json!({"name": "Bob Jones", "email": "bob@example.com"}))
            .await
            .unwrap();

        let candidates = engine
            .find_duplicates(&json!({"name": "Robert Jones", "email": "BOB@EXAMPLE.COM"}))
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lead_id, first);
        assert_eq!(candidates[0].confidence, 1.0);
        assert_eq!(candidates[0].match_type, MatchType::Email);

        let second = engine
            .add_lead(&json!({"name": "Robert Jones", "email": "BOB@EXAMPLE.COM"}))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeat_payload_is_idempotent() {
        let (engine, store) = new_engine();
        let payload = json!({
            "full_name": "Alice Wong",
            "company": "Acme Inc",
            "email": "alice@acme.com"
        });

        let first = engine.add_lead(&payload).await.unwrap();
        let second = engine.add_lead(&payload).await.unwrap();
        let third = engine.add_lead(&payload).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(store.len().await, 1);
    }
}

#[cfg(test)]
mod false_positive_guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_unrelated_records_produce_zero_matches() {
        let (engine, store) = new_engine();

        engine
            .add_lead(&json!({
                "full_name": "John Smith",
                "company": "Company One",
                "email": "john@companyone.com"
            }))
            .await
            .unwrap();

        let candidates = engine
            .find_duplicates(&json!({
                "full_name": "Jane Doe",
                "company": "Company Two",
                "email": "jane@companytwo.com"
            }))
            .await
            .unwrap();
        assert!(candidates.is_empty());

        engine
            .add_lead(&json!({
                "full_name": "Jane Doe",
                "company": "Company Two",
                "email": "jane@companytwo.com"
            }))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_domain_match_previews_but_never_auto_merges() {
        let (engine, store) = new_engine();

        let existing = engine
            .add_lead(&json!({
                "full_name": "Michael Chen",
                "company": "X Labs",
                "email": "michael.chen@x.com"
            }))
            .await
            .unwrap();

        // Same corporate domain, nickname-related name, no company given:
        // visible as a weak candidate but below the merge threshold.
        let probe = json!({"full_name": "Mike Chen", "email": "mike@x.com"});
        let candidates = engine.find_duplicates(&probe).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lead_id, existing);
        assert_eq!(candidates[0].match_type, MatchType::DomainName);
        assert!(candidates[0].confidence < 0.85);
        assert!(candidates[0].confidence >= 0.6);

        let inserted = engine.add_lead(&probe).await.unwrap();
        assert_ne!(inserted, existing);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_shared_freemail_domain_is_not_a_signal() {
        let (engine, _store) = new_engine();

        engine
            .add_lead(&json!({"full_name": "Mia Torres", "email": "mia.torres@gmail.com"}))
            .await
            .unwrap();

        let candidates = engine
            .find_duplicates(&json!({"full_name": "Mia Torres-Diaz", "email": "mtd@gmail.com"}))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }
}

#[cfg(test)]
mod fuzzy_matching_tests {
    use super::*;

    #[tokio::test]
    async fn test_nickname_at_same_company_matches() {
        let (engine, _store) = new_engine();

        let existing = engine
            .add_lead(&json!({
                "full_name": "Christopher Johnson",
                "company": "Software Solutions Inc"
            }))
            .await
            .unwrap();

        let candidates = engine
            .find_duplicates(&json!({
                "full_name": "Chris Johnson",
                "company": "Software Solutions Inc"
            }))
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lead_id, existing);
        assert_eq!(candidates[0].match_type, MatchType::FuzzyName);
        assert!(candidates[0].confidence > 0.75);
    }

    #[tokio::test]
    async fn test_same_surname_different_person_not_matched() {
        let (engine, store) = new_engine();

        engine
            .add_lead(&json!({
                "full_name": "Mary Johnson",
                "company": "Software Solutions Inc"
            }))
            .await
            .unwrap();

        let id = engine
            .add_lead(&json!({
                "full_name": "Chris Johnson",
                "company": "Software Solutions Inc"
            }))
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        let stored = engine.get_lead(&id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Chris Johnson");
    }
}

#[cfg(test)]
mod merge_behavior_tests {
    use super::*;

    #[tokio::test]
    async fn test_end_to_end_enrichment_scenario() {
        let (engine, store) = new_engine();

        let id = engine
            .add_lead(&json!({"full_name": "Bob Johnson", "company": "Tech Corp"}))
            .await
            .unwrap();

        let merged_id = engine
            .add_lead(&json!({
                "full_name": "Bob Johnson",
                "company": "Tech Corp",
                "email": "bob@techcorp.com"
            }))
            .await
            .unwrap();

        assert_eq!(id, merged_id);
        assert_eq!(store.len().await, 1);

        let stored = engine.get_lead(&id).await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("bob@techcorp.com"));
    }

    #[tokio::test]
    async fn test_merge_keeps_created_at_and_ors_flags() {
        let (engine, _store) = new_engine();

        let id = engine
            .add_lead(&json!({
                "full_name": "Sara Kim",
                "company": "DataWorks",
                "verified": true
            }))
            .await
            .unwrap();
        let original = engine.get_lead(&id).await.unwrap().unwrap();
        assert!(original.verified);
        assert!(!original.enriched);

        engine
            .add_lead(&json!({
                "full_name": "Sara Kim",
                "company": "DataWorks",
                "verified": false,
                "enriched": true,
                "title": "Head of Data"
            }))
            .await
            .unwrap();

        let merged = engine.get_lead(&id).await.unwrap().unwrap();
        assert!(merged.verified, "verified must stay true once set");
        assert!(merged.enriched);
        assert!(!merged.needs_enrichment);
        assert_eq!(merged.created_at, original.created_at);
        assert!(merged.updated_at >= original.updated_at);
        assert_eq!(merged.title.as_deref(), Some("Head of Data"));
    }

    #[tokio::test]
    async fn test_merge_deep_merges_raw_data() {
        let (engine, _store) = new_engine();

        let id = engine
            .add_lead(&json!({
                "full_name": "Omar Haddad",
                "company": "CloudNine",
                "source": "scraper_v1",
                "raw_data": {"social_profiles": {"twitter": "@omar"}}
            }))
            .await
            .unwrap();

        engine
            .add_lead(&json!({
                "full_name": "Omar Haddad",
                "company": "CloudNine",
                "raw_data": {"social_profiles": {"github": "ohaddad"}}
            }))
            .await
            .unwrap();

        let stored = engine.get_lead(&id).await.unwrap().unwrap();
        assert_eq!(stored.raw_data["source"], json!("scraper_v1"));
        assert_eq!(stored.raw_data["social_profiles"]["twitter"], json!("@omar"));
        assert_eq!(stored.raw_data["social_profiles"]["github"], json!("ohaddad"));
    }

    #[tokio::test]
    async fn test_merge_lead_data_preview_does_not_write() {
        let (engine, store) = new_engine();

        let merged = engine
            .merge_lead_data(
                &json!({"full_name": "Bob Johnson", "company": "Tech Corp"}),
                &json!({"name": "Bob Johnson", "email": "bob@techcorp.com"}),
            )
            .unwrap();

        assert_eq!(merged["email"], json!("bob@techcorp.com"));
        assert_eq!(merged["company"], json!("Tech Corp"));
        assert!(store.is_empty().await);
    }
}

#[cfg(test)]
mod update_passthrough_tests {
    use super::*;
    use lead_identity_engine::errors::EngineError;
    use lead_identity_engine::models::LeadStatus;

    #[tokio::test]
    async fn test_update_lead_applies_merge_policy() {
        let (engine, _store) = new_engine();

        let id = engine
            .add_lead(&json!({"full_name": "Nina Patel", "company": "GreenGrid"}))
            .await
            .unwrap();

        let updated = engine
            .update_lead(&id, &json!({"title": "CTO", "status": "enriched", "enriched": true}))
            .await
            .unwrap();

        assert_eq!(updated.title.as_deref(), Some("CTO"));
        assert_eq!(updated.status, LeadStatus::Enriched);
        assert!(updated.enriched);
        assert!(updated.sync_pending);

        let stored = engine.get_lead(&id).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("CTO"));
    }

    #[tokio::test]
    async fn test_update_missing_lead_is_not_found() {
        let (engine, _store) = new_engine();
        let result = engine
            .update_lead("no-such-id", &json!({"title": "CTO"}))
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use lead_identity_engine::errors::EngineError;

    #[tokio::test]
    async fn test_missing_name_is_a_validation_error() {
        let (engine, store) = new_engine();

        let result = engine.add_lead(&json!({})).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        let result = engine.add_lead(&json!({"email": "x@example.com"})).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        let result = engine.add_lead(&json!({"full_name": "   "})).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_non_object_payload_rejected() {
        let (engine, _store) = new_engine();
        let result = engine.add_lead(&json!("Bob Johnson")).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_distinct_identities_all_land() {
        let (engine, store) = new_engine();

        let mut handles = Vec::new();
        for i in 0..5 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .add_lead(&json!({
                        "full_name": format!("Person {}", i),
                        "company": format!("Company {}", i),
                        "email": format!("person{}@company{}.com", i, i)
                    }))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("task panicked"));
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5, "expected 5 distinct lead ids");
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn test_concurrent_same_identity_converges_on_one_record() {
        let (engine, store) = new_engine();

        let mut handles = Vec::new();
        for i in 0..5 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .add_lead(&json!({
                        "full_name": "Dana Cruz",
                        "email": "dana@onecorp.com",
                        "title": format!("Engineer L{}", i)
                    }))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.expect("task panicked"));
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1, "same identity must converge on one id");
        assert_eq!(store.len().await, 1);
    }
}
