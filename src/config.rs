use serde::Deserialize;

/// Confidence attached to an exact match on a canonical identity key
/// (normalized LinkedIn URL or lowercased email). These are treated as
/// proof of identity.
pub const CONFIDENCE_EXACT: f64 = 1.0;

/// Confidence for an exact full-name + company pair match. Slightly below
/// the exact-key signals: two people at one company can share a name.
pub const CONFIDENCE_NAME_COMPANY: f64 = 0.95;

/// Base confidence for a corporate email-domain match; the name similarity
/// contribution is added on top.
pub const DOMAIN_MATCH_BASE: f64 = 0.6;

/// Weight of the name-similarity contribution to a domain match.
pub const DOMAIN_MATCH_SIM_WEIGHT: f64 = 0.2;

/// Ceiling for domain-match confidence. Deliberately below
/// `DEFAULT_MERGE_THRESHOLD`: a shared employer domain alone must never
/// auto-merge two records.
pub const DOMAIN_MATCH_CAP: f64 = 0.9;

/// Minimum name similarity for a domain match to count at all.
pub const DOMAIN_MATCH_MIN_SIMILARITY: f64 = 0.6;

/// Minimum name similarity for a same-company fuzzy-name match.
pub const FUZZY_NAME_MIN_SIMILARITY: f64 = 0.75;

/// Minimum aggregated confidence at which `add_lead` merges into an
/// existing record instead of inserting a new one. Matches below this line
/// (weak fuzzy hits, domain matches) are surfaced by `find_duplicates` but
/// never auto-merged; this margin is the primary guard against
/// false-positive merges.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.85;

/// Engine configuration, loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Minimum confidence for an automatic merge. See `DEFAULT_MERGE_THRESHOLD`.
    pub merge_threshold: f64,
    /// Number of shards in the keyed identity lock.
    pub lock_shards: usize,
    /// Max entries in the identity-key -> lead-id cache.
    pub identity_cache_capacity: u64,
    /// TTL in seconds for identity cache entries.
    pub identity_cache_ttl_secs: u64,
    /// Connection string for the Postgres-backed store. Optional: callers
    /// using their own `LeadStore` implementation never need it.
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            lock_shards: 64,
            identity_cache_capacity: 10_000,
            identity_cache_ttl_secs: 300,
            database_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            merge_threshold: std::env::var("MERGE_THRESHOLD")
                .map(|raw| {
                    raw.parse::<f64>()
                        .map_err(|_| anyhow::anyhow!("MERGE_THRESHOLD must be a number"))
                        .and_then(|v| {
                            if !(0.0..=1.0).contains(&v) || v == 0.0 {
                                anyhow::bail!("MERGE_THRESHOLD must lie in (0, 1]");
                            }
                            Ok(v)
                        })
                })
                .unwrap_or(Ok(DEFAULT_MERGE_THRESHOLD))?,
            lock_shards: std::env::var("IDENTITY_LOCK_SHARDS")
                .map(|raw| {
                    raw.parse::<usize>()
                        .map_err(|_| anyhow::anyhow!("IDENTITY_LOCK_SHARDS must be a number"))
                        .and_then(|v| {
                            if v == 0 {
                                anyhow::bail!("IDENTITY_LOCK_SHARDS must be at least 1");
                            }
                            Ok(v)
                        })
                })
                .unwrap_or(Ok(64))?,
            identity_cache_capacity: std::env::var("IDENTITY_CACHE_CAPACITY")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("IDENTITY_CACHE_CAPACITY must be a number"))?,
            identity_cache_ttl_secs: std::env::var("IDENTITY_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("IDENTITY_CACHE_TTL_SECS must be a number"))?,
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Merge threshold: {}", config.merge_threshold);
        tracing::debug!("Lock shards: {}", config.lock_shards);
        tracing::debug!(
            "Identity cache: capacity {}, ttl {}s",
            config.identity_cache_capacity,
            config.identity_cache_ttl_secs
        );
        if let Some(ref url) = config.database_url {
            tracing::debug!("Database URL: {}...", &url[..20.min(url.len())]);
        }

        Ok(config)
    }
}
