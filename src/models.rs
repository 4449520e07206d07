use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============ Stored Lead ============

/// Lifecycle status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Enriched,
    ReadyForOutreach,
    Contacted,
    Replied,
    Disqualified,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Enriched => "enriched",
            LeadStatus::ReadyForOutreach => "ready_for_outreach",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Replied => "replied",
            LeadStatus::Disqualified => "disqualified",
        }
    }

    /// Parses a status string; unknown values are treated as absent rather
    /// than stored free-form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "new" => Some(LeadStatus::New),
            "enriched" => Some(LeadStatus::Enriched),
            "ready_for_outreach" => Some(LeadStatus::ReadyForOutreach),
            "contacted" => Some(LeadStatus::Contacted),
            "replied" => Some(LeadStatus::Replied),
            "disqualified" => Some(LeadStatus::Disqualified),
            _ => None,
        }
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        LeadStatus::New
    }
}

/// The reconciled lead entity.
///
/// Identity fields are strongly typed; everything without a fixed schema
/// (enrichment provenance, social profiles, scraper confidence) lives in the
/// open `raw_data` map. Display values keep their original form; only the
/// comparison forms produced by `normalize` are canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Opaque stable identifier, assigned at first insert, immutable.
    pub id: String,
    /// Secondary stable identifier, assigned at creation, immutable.
    pub uuid: Uuid,
    /// Full name (display string).
    pub full_name: String,
    /// Company (display string).
    pub company: Option<String>,
    /// Job title.
    pub title: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Email, stored in canonical lowercase form.
    pub email: Option<String>,
    /// LinkedIn profile URL (display form; compared via its normal form).
    pub linkedin_url: Option<String>,
    /// Phone in canonical `+1XXXXXXXXXX` form, absent if unparsable.
    pub phone: Option<String>,
    /// Whether the contact data has been verified.
    pub verified: bool,
    /// Whether the lead has been enriched with external data.
    pub enriched: bool,
    /// Whether the lead still needs an enrichment pass.
    pub needs_enrichment: bool,
    /// Whether the record has changes not yet pushed to the CRM.
    pub sync_pending: bool,
    /// Lifecycle status.
    pub status: LeadStatus,
    /// Open extension map for fields with no fixed schema.
    pub raw_data: Value,
    /// Timestamp of creation; never decreases on merge.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last write.
    pub updated_at: DateTime<Utc>,
}

// ============ Duplicate Matching ============

/// The strategy that produced a match, in priority order: when two
/// strategies hit the same stored lead at equal confidence, the earlier
/// variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    LinkedinUrl,
    Email,
    NameCompany,
    DomainName,
    FuzzyName,
}

impl MatchType {
    /// Tie-break priority; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            MatchType::LinkedinUrl => 0,
            MatchType::Email => 1,
            MatchType::NameCompany => 2,
            MatchType::DomainName => 3,
            MatchType::FuzzyName => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::LinkedinUrl => "linkedin_url",
            MatchType::Email => "email",
            MatchType::NameCompany => "name_company",
            MatchType::DomainName => "domain_name",
            MatchType::FuzzyName => "fuzzy_name",
        }
    }
}

/// A candidate duplicate produced by the match evaluator. Transient value,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateMatch {
    /// Id of the stored lead this candidate points at.
    pub lead_id: String,
    /// Confidence in [0, 1] that the records are the same person.
    pub confidence: f64,
    /// The strategy that produced the match.
    pub match_type: MatchType,
    /// Fields that participated in the match.
    pub matched_fields: Vec<String>,
}

// ============ Incoming Partial Record ============

/// An incoming partial lead after the field-alias boundary.
///
/// Raw scraper dicts are converted into this shape exactly once, before any
/// matching logic runs; unrecognized keys are preserved under `raw_data`.
#[derive(Debug, Clone, Default)]
pub struct IncomingLead {
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub phone: Option<String>,
    pub verified: Option<bool>,
    pub enriched: Option<bool>,
    pub needs_enrichment: Option<bool>,
    pub status: Option<LeadStatus>,
    pub created_at: Option<DateTime<Utc>>,
    /// Unrecognized keys plus any explicit `raw_data` object.
    pub raw_data: Value,
}

impl IncomingLead {
    /// Materializes a brand-new lead from this partial, applying the
    /// new-record defaults: `status = new`, unverified, unenriched, needing
    /// enrichment, pending CRM sync.
    pub fn into_new_lead(self, now: DateTime<Utc>) -> Lead {
        let enriched = self.enriched.unwrap_or(false);
        Lead {
            id: String::new(),
            uuid: Uuid::new_v4(),
            full_name: self.full_name.unwrap_or_default(),
            company: self.company,
            title: self.title,
            location: self.location,
            email: self.email,
            linkedin_url: self.linkedin_url,
            phone: self.phone,
            verified: self.verified.unwrap_or(false),
            enriched,
            needs_enrichment: if enriched {
                false
            } else {
                self.needs_enrichment.unwrap_or(true)
            },
            sync_pending: true,
            status: self.status.unwrap_or_default(),
            raw_data: self.raw_data,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}
