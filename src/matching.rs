//! Match Strategy Evaluator and Candidate Aggregator.
//!
//! Each strategy runs independently against the store and tags its hits
//! with a fixed or computed confidence; the aggregator then collapses hits
//! pointing at the same stored lead, keeping the strongest signal.

use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::{
    CONFIDENCE_EXACT, CONFIDENCE_NAME_COMPANY, DOMAIN_MATCH_BASE, DOMAIN_MATCH_CAP,
    DOMAIN_MATCH_MIN_SIMILARITY, DOMAIN_MATCH_SIM_WEIGHT, FUZZY_NAME_MIN_SIMILARITY,
};
use crate::errors::EngineError;
use crate::models::{DuplicateMatch, IncomingLead, MatchType};
use crate::normalize::{email_domain, normalize_name, normalize_url};
use crate::similarity::name_similarity;
use crate::store::{LeadStore, MatchField};

// Public mailbox providers: a shared @gmail.com domain says nothing about a
// shared employer, so the domain strategy skips them.
static FREE_MAIL_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "gmail.com",
        "googlemail.com",
        "yahoo.com",
        "hotmail.com",
        "outlook.com",
        "live.com",
        "aol.com",
        "icloud.com",
        "me.com",
        "protonmail.com",
        "proton.me",
        "mail.com",
        "gmx.com",
    ])
});

/// Runs the ordered match strategies for an incoming record.
pub struct MatchEvaluator {
    store: Arc<dyn LeadStore>,
}

impl MatchEvaluator {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    /// Runs every strategy and returns the raw, un-aggregated union of hits.
    pub async fn evaluate(&self, incoming: &IncomingLead) -> Result<Vec<DuplicateMatch>, EngineError> {
        let mut matches = Vec::new();

        self.match_linkedin_url(incoming, &mut matches).await?;
        self.match_email(incoming, &mut matches).await?;
        self.match_name_company(incoming, &mut matches).await?;
        self.match_domain_name(incoming, &mut matches).await?;
        self.match_fuzzy_name(incoming, &mut matches).await?;

        tracing::debug!("Match evaluation produced {} raw hit(s)", matches.len());
        Ok(matches)
    }

    /// Normalized URL equality. The highest-priority identity signal.
    async fn match_linkedin_url(
        &self,
        incoming: &IncomingLead,
        matches: &mut Vec<DuplicateMatch>,
    ) -> Result<(), EngineError> {
        let Some(normalized) = incoming.linkedin_url.as_deref().and_then(normalize_url) else {
            return Ok(());
        };

        for lead in self
            .store
            .find_by_field(MatchField::LinkedinUrl, &normalized)
            .await?
        {
            matches.push(DuplicateMatch {
                lead_id: lead.id,
                confidence: CONFIDENCE_EXACT,
                match_type: MatchType::LinkedinUrl,
                matched_fields: vec!["linkedin_url".to_string()],
            });
        }
        Ok(())
    }

    /// Case-insensitive email equality.
    async fn match_email(
        &self,
        incoming: &IncomingLead,
        matches: &mut Vec<DuplicateMatch>,
    ) -> Result<(), EngineError> {
        let Some(email) = incoming.email.as_deref() else {
            return Ok(());
        };

        for lead in self.store.find_by_field(MatchField::Email, email).await? {
            matches.push(DuplicateMatch {
                lead_id: lead.id,
                confidence: CONFIDENCE_EXACT,
                match_type: MatchType::Email,
                matched_fields: vec!["email".to_string()],
            });
        }
        Ok(())
    }

    /// Case-insensitive equality on both full name and company.
    async fn match_name_company(
        &self,
        incoming: &IncomingLead,
        matches: &mut Vec<DuplicateMatch>,
    ) -> Result<(), EngineError> {
        let (Some(name), Some(company)) = (incoming.full_name.as_deref(), incoming.company.as_deref())
        else {
            return Ok(());
        };
        let norm_name = normalize_name(name);
        let norm_company = normalize_name(company);
        if norm_name.is_empty() || norm_company.is_empty() {
            return Ok(());
        }

        for lead in self
            .store
            .find_by_field(MatchField::FullName, &norm_name)
            .await?
        {
            let company_matches = lead
                .company
                .as_deref()
                .map(|c| normalize_name(c) == norm_company)
                .unwrap_or(false);
            if company_matches {
                matches.push(DuplicateMatch {
                    lead_id: lead.id,
                    confidence: CONFIDENCE_NAME_COMPANY,
                    match_type: MatchType::NameCompany,
                    matched_fields: vec!["full_name".to_string(), "company".to_string()],
                });
            }
        }
        Ok(())
    }

    /// Shared corporate email domain plus a sufficiently similar name;
    /// catches `mike@x.com` vs `michael.chen@x.com`.
    async fn match_domain_name(
        &self,
        incoming: &IncomingLead,
        matches: &mut Vec<DuplicateMatch>,
    ) -> Result<(), EngineError> {
        let (Some(email), Some(name)) = (incoming.email.as_deref(), incoming.full_name.as_deref())
        else {
            return Ok(());
        };
        let Some(domain) = email_domain(email) else {
            return Ok(());
        };
        if FREE_MAIL_DOMAINS.contains(domain.as_str()) {
            tracing::debug!("Skipping domain match on public mailbox domain {}", domain);
            return Ok(());
        }

        for lead in self
            .store
            .find_by_field(MatchField::EmailDomain, &domain)
            .await?
        {
            let similarity = name_similarity(name, &lead.full_name);
            if similarity >= DOMAIN_MATCH_MIN_SIMILARITY {
                let confidence =
                    (DOMAIN_MATCH_BASE + DOMAIN_MATCH_SIM_WEIGHT * similarity).min(DOMAIN_MATCH_CAP);
                matches.push(DuplicateMatch {
                    lead_id: lead.id,
                    confidence,
                    match_type: MatchType::DomainName,
                    matched_fields: vec!["email_domain".to_string(), "full_name".to_string()],
                });
            }
        }
        Ok(())
    }

    /// Same company and a similar name; catches nicknames and initials.
    async fn match_fuzzy_name(
        &self,
        incoming: &IncomingLead,
        matches: &mut Vec<DuplicateMatch>,
    ) -> Result<(), EngineError> {
        let (Some(name), Some(company)) = (incoming.full_name.as_deref(), incoming.company.as_deref())
        else {
            return Ok(());
        };
        let norm_company = normalize_name(company);
        if norm_company.is_empty() {
            return Ok(());
        }

        for lead in self
            .store
            .find_by_field(MatchField::Company, &norm_company)
            .await?
        {
            let similarity = name_similarity(name, &lead.full_name);
            if similarity >= FUZZY_NAME_MIN_SIMILARITY {
                matches.push(DuplicateMatch {
                    lead_id: lead.id,
                    confidence: similarity,
                    match_type: MatchType::FuzzyName,
                    matched_fields: vec!["company".to_string(), "full_name".to_string()],
                });
            }
        }
        Ok(())
    }
}

/// Collapses the raw hit union to one candidate per stored lead (highest
/// confidence wins, strategy priority breaks ties) and sorts descending by
/// confidence.
pub fn aggregate(matches: Vec<DuplicateMatch>) -> Vec<DuplicateMatch> {
    let mut best: HashMap<String, DuplicateMatch> = HashMap::new();

    for candidate in matches {
        match best.get(&candidate.lead_id) {
            Some(current) if !beats(&candidate, current) => {}
            _ => {
                best.insert(candidate.lead_id.clone(), candidate);
            }
        }
    }

    let mut aggregated: Vec<DuplicateMatch> = best.into_values().collect();
    aggregated.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.match_type.priority().cmp(&b.match_type.priority()))
    });
    aggregated
}

fn beats(candidate: &DuplicateMatch, current: &DuplicateMatch) -> bool {
    match candidate.confidence.partial_cmp(&current.confidence) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => candidate.match_type.priority() < current.match_type.priority(),
        _ => false,
    }
}
