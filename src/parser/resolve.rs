use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::records::CandidateRecord;

static GROUP_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cricket-series/\d+/([^/]+)").unwrap());
// Path segment between the numeric id and a trailing year.
static ID_YEAR_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d+/([^/]*?)-?\d{4}/?$").unwrap());

const TEAM_CODES: &[(&str, &str)] = &[
    ("india", "ind"), ("new zealand", "nz"), ("australia", "aus"),
    ("england", "eng"), ("pakistan", "pak"), ("south africa", "sa"),
    ("sri lanka", "sl"), ("bangladesh", "ban"), ("west indies", "wi"),
    ("afghanistan", "afg"), ("zimbabwe", "zim"), ("ireland", "ire"),
    ("uae", "uae"), ("usa", "usa"), ("nepal", "nep"), ("namibia", "nam"),
    ("netherlands", "ned"), ("scotland", "sco"), ("oman", "oman"),
    ("canada", "can"), ("kenya", "ken"), ("hong kong", "hk"),
    ("papua new guinea", "png"), ("bermuda", "ber"), ("jersey", "jer"),
];

/// The stored group an event listing was fetched for.
#[derive(Debug, Clone)]
pub struct Parent {
    pub slug: String,
    pub name: String,
}

impl Parent {
    pub fn new(group_url: &str, name: &str) -> Self {
        let slug = GROUP_SLUG_RE
            .captures(group_url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Parent {
            slug,
            name: name.to_string(),
        }
    }
}

pub type Heuristic = fn(&CandidateRecord, &Parent) -> bool;

/// Highest precision first; evaluation stops at the first acceptance.
pub const CASCADE: &[(&str, Heuristic)] = &[
    ("slug", slug_contained),
    ("slug_tokens", slug_tokens),
    ("abbreviation", abbreviation),
    ("name_words", name_words),
    ("team_codes", team_codes),
];

/// Name of the heuristic that accepted `candidate`, or `None` if it belongs
/// to some other group.
pub fn resolve(candidate: &CandidateRecord, parent: &Parent) -> Option<&'static str> {
    resolve_with(CASCADE, candidate, parent)
}

pub fn resolve_with<'n>(
    cascade: &[(&'n str, Heuristic)],
    candidate: &CandidateRecord,
    parent: &Parent,
) -> Option<&'n str> {
    cascade
        .iter()
        .find(|(_, accepts)| accepts(candidate, parent))
        .map(|(name, _)| *name)
}

pub fn slug_contained(c: &CandidateRecord, p: &Parent) -> bool {
    !p.slug.is_empty() && c.path.contains(p.slug.as_str())
}

pub fn slug_tokens(c: &CandidateRecord, p: &Parent) -> bool {
    let path = c.path.to_lowercase();
    let tokens: Vec<String> = p
        .slug
        .split(['-', '_'])
        .filter(|t| t.len() > 2 && !is_year(t))
        .map(str::to_lowercase)
        .collect();
    if tokens.is_empty() {
        return false;
    }
    let found = tokens.iter().filter(|t| path.contains(t.as_str())).count();
    found >= required_tokens(tokens.len())
}

/// `max(2, ceil(0.6 * n))`
pub fn required_tokens(n: usize) -> usize {
    ((6 * n).div_ceil(10)).max(2)
}

pub fn abbreviation(c: &CandidateRecord, p: &Parent) -> bool {
    let abbr: String = p
        .name
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .filter(|w| !w.chars().all(|ch| ch.is_ascii_digit()))
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_lowercase)
        .collect();
    abbr.chars().count() >= 2 && c.path.to_lowercase().contains(&format!("{}-", abbr))
}

pub fn name_words(c: &CandidateRecord, p: &Parent) -> bool {
    let path = c.path.to_lowercase();
    let Some(segment) = ID_YEAR_SEGMENT_RE
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return false;
    };
    let name = p.name.to_lowercase();
    let words: HashSet<&str> = name
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .collect();
    words.iter().filter(|w| segment.contains(**w)).count() >= 2
}

pub fn team_codes(c: &CandidateRecord, p: &Parent) -> bool {
    let path = c.path.to_lowercase();
    let name = p.name.to_lowercase();
    let found = TEAM_CODES
        .iter()
        .filter(|(team, _)| name.contains(team))
        .filter(|(_, code)| has_code(&path, code))
        .count();
    found >= 2 || (found >= 1 && name.contains("tour") && path.contains("tour"))
}

fn has_code(path: &str, code: &str) -> bool {
    path.contains(&format!("{}-", code)) || path.ends_with(&format!("-{}", code))
}

fn is_year(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit())
}
