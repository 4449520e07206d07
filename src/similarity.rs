use once_cell::sync::Lazy;
use std::collections::HashMap;
use strsim::jaro_winkler;

use crate::normalize::normalize_name;

/// Score for a nickname pairing (e.g. Chris/Christopher) backed by an exact
/// last-name match.
pub const NICKNAME_MATCH_SCORE: f64 = 0.85;

/// Score for an initials pairing (e.g. "J. Smith" vs "John Smith") backed by
/// an exact last-name match.
pub const INITIALS_MATCH_SCORE: f64 = 0.65;

/// Minimum per-token Jaro-Winkler similarity for two tokens to count as the
/// same token in the fallback scorer. Anything looser lets unrelated short
/// names (John/Jane) creep above the no-false-positive line.
const TOKEN_MATCH_FLOOR: f64 = 0.8;

// Common English given-name short forms, keyed short -> formal. Lookup is
// applied in both directions.
static NICKNAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("abby", "abigail"),
        ("alex", "alexander"),
        ("andy", "andrew"),
        ("ben", "benjamin"),
        ("beth", "elizabeth"),
        ("bill", "william"),
        ("bob", "robert"),
        ("cathy", "catherine"),
        ("chris", "christopher"),
        ("chuck", "charles"),
        ("dan", "daniel"),
        ("danny", "daniel"),
        ("dave", "david"),
        ("deb", "deborah"),
        ("ed", "edward"),
        ("frank", "francis"),
        ("fred", "frederick"),
        ("greg", "gregory"),
        ("jake", "jacob"),
        ("jeff", "jeffrey"),
        ("jen", "jennifer"),
        ("jenny", "jennifer"),
        ("jim", "james"),
        ("joe", "joseph"),
        ("jon", "jonathan"),
        ("kate", "katherine"),
        ("katie", "katherine"),
        ("ken", "kenneth"),
        ("larry", "lawrence"),
        ("liz", "elizabeth"),
        ("maggie", "margaret"),
        ("matt", "matthew"),
        ("meg", "margaret"),
        ("mike", "michael"),
        ("nate", "nathan"),
        ("nick", "nicholas"),
        ("pat", "patricia"),
        ("pete", "peter"),
        ("rick", "richard"),
        ("rob", "robert"),
        ("ron", "ronald"),
        ("sam", "samuel"),
        ("sandy", "sandra"),
        ("steve", "steven"),
        ("sue", "susan"),
        ("ted", "theodore"),
        ("tim", "timothy"),
        ("tom", "thomas"),
        ("tony", "anthony"),
        ("will", "william"),
    ])
});

/// Whether two given-name tokens are the same name modulo nickname forms.
fn given_names_related(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let canon_a = NICKNAMES.get(a).copied().unwrap_or(a);
    let canon_b = NICKNAMES.get(b).copied().unwrap_or(b);
    canon_a == b || canon_b == a || canon_a == canon_b
}

/// Whether a token is an initial ("j" or "j.").
fn is_initial(token: &str) -> bool {
    let bare = token.trim_end_matches('.');
    bare.chars().count() == 1 && bare.chars().all(|c| c.is_alphabetic())
}

fn first_letter(token: &str) -> Option<char> {
    token.chars().next()
}

/// Per-token similarity for the fallback scorer: exact tokens count 1.0,
/// nickname-related tokens count at the nickname score, near-identical
/// spellings (Jon/John) count their Jaro-Winkler similarity, anything below
/// the floor counts zero.
fn token_pair_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if given_names_related(a, b) {
        return NICKNAME_MATCH_SCORE;
    }
    let jw = jaro_winkler(a, b);
    if jw >= TOKEN_MATCH_FLOOR {
        jw
    } else {
        0.0
    }
}

/// Scores how likely two person names refer to the same person, in [0, 1].
///
/// Exact case-insensitive match scores 1.0. Otherwise the names are
/// decomposed into first/last tokens and scored, in order: nickname-table
/// lookup backed by a last-name match, an initials match, and a generic
/// token-overlap/edit-distance ratio. Clearly unrelated names (no shared
/// tokens, no initials overlap) score well under 0.3; that bound is part of
/// the matcher contract, not a tuning suggestion.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize_name(a);
    let norm_b = normalize_name(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 1.0;
    }

    let tokens_a: Vec<&str> = norm_a.split(' ').collect();
    let tokens_b: Vec<&str> = norm_b.split(' ').collect();

    // First/last decomposition; middle tokens are ignored by the structured
    // rules and picked back up by the fallback.
    let (first_a, last_a) = (tokens_a[0], tokens_a[tokens_a.len() - 1]);
    let (first_b, last_b) = (tokens_b[0], tokens_b[tokens_b.len() - 1]);
    let last_names_match = tokens_a.len() > 1 && tokens_b.len() > 1 && last_a == last_b;

    if last_names_match && given_names_related(first_a, first_b) {
        return NICKNAME_MATCH_SCORE;
    }

    if last_names_match
        && (is_initial(first_a) || is_initial(first_b))
        && first_letter(first_a) == first_letter(first_b)
    {
        return INITIALS_MATCH_SCORE;
    }

    // Fallback: best-pair token similarity averaged over the longer name.
    let (shorter, longer) = if tokens_a.len() <= tokens_b.len() {
        (&tokens_a, &tokens_b)
    } else {
        (&tokens_b, &tokens_a)
    };
    let total: f64 = shorter
        .iter()
        .map(|t| {
            longer
                .iter()
                .map(|o| token_pair_score(t, o))
                .fold(0.0, f64::max)
        })
        .sum();

    (total / longer.len() as f64).clamp(0.0, 1.0)
}
