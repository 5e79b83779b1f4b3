//! Search decision engine — should this utterance go to the web?
//!
//! Evaluation order is fixed:
//!
//! 1. `webSearch.enabled == false` → never search
//! 2. **Exclusions**: booking phrasing, greeting-only messages, and the
//!    configured `excludePatterns`. A hit vetoes the search regardless of score.
//! 3. **Scoring**: each category contributes its weight once when its pattern
//!    matches; the sum is compared against the configured threshold.
//!
//! Everything here is a pure function of `(message, config)`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use concierge_config::WebSearchConfig;
use concierge_core::search::{SearchDepth, SearchOptions};
use regex_lite::Regex;
use serde::Serialize;

/// Longest query sent to the search provider, in characters.
pub const MAX_QUERY_CHARS: usize = 100;

/// Queries shorter than this after cleanup fall back to the raw message.
const MIN_QUERY_CHARS: usize = 3;

/// Domains never worth citing as sources.
pub const EXCLUDED_DOMAINS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "tiktok.com",
    "reddit.com",
];

// ── Pattern tables ────────────────────────────────────────────────────────

const BOOKING_PATTERN: &str = r"\b(prenotare|prenotazione|tavolo|ristorante|cena|pranzo|menu|carta|piatti|cucina|sala|posto|posti|disponibilità|orari?\s+(del\s+)?ristorante|come\s+(posso\s+)?prenotare|vorrei\s+prenotare|voglio\s+prenotare|posso\s+prenotare|prenotare\s+un\s+tavolo|riservare|reservation|book|booking|table|restaurant|dinner|lunch)\b";

const GREETING_PATTERN: &str = r"^((ciao|salve|buongiorno|buonasera|buonanotte|hello|hi|hey|good\s+morning|good\s+evening|good\s+night|hola|buenos\s+días|buenas\s+tardes|salut|bonjour|bonsoir|hallo|guten\s+tag|guten\s+abend)[\s.,!]*)+$";

/// `(category, pattern)`; weights come from [`concierge_config::CategoryWeights`].
const CATEGORY_PATTERNS: &[(&str, &str)] = &[
    (
        "temporal",
        r"\b(oggi|today|hoy|aujourd'?hui|heute)\s+(il\s+)?(meteo|weather|tiempo|météo|wetter|prezzo|price|precio|prix|preis|notizie|news|noticias|nouvelles|nachrichten)\b",
    ),
    (
        "realTime",
        r"\b(prezzo\s+(attuale|corrente|di\s+oggi)|current\s+price|meteo\s+(di\s+oggi|attuale)|today'?s\s+weather|notizie\s+(di\s+oggi|attuali)|today'?s\s+news|borsa\s+(oggi|attuale)|stock\s+market\s+today|bitcoin\s+(prezzo|price))\b",
    ),
    (
        "temporalComposite",
        r"\b(che\s+tempo\s+fa\s+(oggi|adesso)|what'?s\s+the\s+weather\s+(today|now)|qué\s+tiempo\s+hace\s+hoy|quel\s+temps\s+fait\s+aujourd'?hui|wie\s+ist\s+das\s+wetter\s+heute)\b",
    ),
    (
        "pricing",
        r"\b(quanto\s+costa\s+(oggi|adesso|attualmente)|how\s+much\s+(costs?|is)\s+.+\s+(today|now)|prezzo\s+(attuale|corrente|di\s+oggi))\b",
    ),
    (
        "news",
        r"\b(ultime\s+notizie|latest\s+news|notizie\s+(di\s+oggi|attuali)|breaking\s+news|news\s+today)\b",
    ),
];

/// Phrasing that asks for a concrete fact; these get an advanced search.
const INFORMATION_PATTERNS: &[&str] = &[
    r"prezzo\s+(di|del|della)?\s*\w+",
    r"quanto\s+costa",
    r"che\s+tempo\s+fa",
    r"meteo\s+(di|a)?\s*\w+",
    r"temperatura\s+(di|a)?\s*\w+",
    r"orari?\s+(di|del|della)?\s*\w+",
    r"indirizzo\s+(di|del|della)?\s*\w+",
    r"telefono\s+(di|del|della)?\s*\w+",
    r"dove\s+(si\s+trova|è|sono)",
    r"quando\s+(apre|chiude|inizia|finisce)",
    r"\bweather\b",
    r"\btemperature\s+in\b",
    r"\bprice\s+of\b",
    r"how\s+much\s+(is|does|costs?)",
    r"opening\s+hours",
    r"\baddress\s+of\b",
    r"phone\s+number",
    r"where\s+is\b",
    r"when\s+does\s+.+\s+(open|close)",
];

const NEWS_KEYWORDS: &[&str] = &[
    "notizie", "news", "cronaca", "attualità", "eventi", "evento", "manifestazione",
    "politica", "elezioni", "governo", "economia", "borsa", "mercato", "bitcoin",
    "criptovalute", "sport", "calcio", "partita", "campionato", "meteo", "terremoto",
    "alluvione", "emergenza", "covid", "pandemia", "vaccino", "guerra", "conflitto", "pace",
];

const TEMPORAL_KEYWORDS: &[&str] = &[
    "oggi", "adesso", "ora", "attualmente", "al momento", "questa settimana",
    "questo mese", "quest'anno", "recente", "ultimo", "ultima", "ultimi", "ultime",
    "ieri", "domani", "stamattina", "stasera", "in tempo reale", "aggiornato",
    "aggiornamenti",
];

/// Politeness, filler, and function words removed from queries, in order.
const QUERY_FILLER_PATTERNS: &[&str] = &[
    r"(?i)\b(ciao|salve|buongiorno|buonasera|per favore|grazie)\b",
    r"(?i)\b(dimmi|parlami|racconta|spiegami|cosa|come|puoi)\b",
    r"(?i)\b(di|del|della|dei|delle|il|la|i|le|un|una)\b",
];

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "Invalid built-in pattern, skipping");
            None
        }
    }
}

static BOOKING: LazyLock<Option<Regex>> = LazyLock::new(|| compile(BOOKING_PATTERN));
static GREETING: LazyLock<Option<Regex>> = LazyLock::new(|| compile(GREETING_PATTERN));

static CATEGORIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CATEGORY_PATTERNS
        .iter()
        .filter_map(|(name, pattern)| compile(pattern).map(|re| (*name, re)))
        .collect()
});

static INFORMATION: LazyLock<Vec<Regex>> =
    LazyLock::new(|| INFORMATION_PATTERNS.iter().filter_map(|p| compile(p)).collect());

static QUERY_FILLERS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| QUERY_FILLER_PATTERNS.iter().filter_map(|p| compile(p)).collect());

// ── Types ─────────────────────────────────────────────────────────────────

/// Why a message was ruled out before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "camelCase")]
pub enum Exclusion {
    /// `webSearch.enabled` is false
    Disabled,
    /// Reservation / restaurant phrasing
    Booking,
    /// Nothing but greetings
    Greeting,
    /// A configured `excludePatterns` entry
    Configured(String),
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("web search disabled"),
            Self::Booking => f.write_str("booking intent"),
            Self::Greeting => f.write_str("greeting only"),
            Self::Configured(pattern) => write!(f, "excluded pattern \"{pattern}\""),
        }
    }
}

/// Per-category scores for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    /// Every category, matched or not
    pub category_scores: BTreeMap<&'static str, f64>,
    pub total: f64,
    pub threshold: f64,
    /// Always `total >= threshold`
    pub decision: bool,
}

/// The full outcome: an exclusion short-circuits scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<Exclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringResult>,
    pub search: bool,
}

/// A cleaned search query: never empty, at most [`MAX_QUERY_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Trim and truncate; blank input has no query.
    pub fn new(text: &str) -> Option<Self> {
        let truncated: String = text.trim().chars().take(MAX_QUERY_CHARS).collect();
        let trimmed = truncated.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Operations ────────────────────────────────────────────────────────────

/// Lowercase and fold typographic apostrophes so patterns see one spelling.
fn normalize(message: &str) -> String {
    message.trim().to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

fn is_hit(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// First exclusion that applies to `message`, if any.
pub fn exclusion(message: &str, config: &WebSearchConfig) -> Option<Exclusion> {
    if !config.enabled {
        return Some(Exclusion::Disabled);
    }

    let text = normalize(message);

    if is_hit(&BOOKING, &text) {
        return Some(Exclusion::Booking);
    }
    if is_hit(&GREETING, &text) {
        return Some(Exclusion::Greeting);
    }

    config
        .exclude_patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .find(|p| text.contains(&p.to_lowercase()))
        .map(|p| Exclusion::Configured(p.to_string()))
}

/// Score `message` against every category; exclusions are not consulted.
pub fn score(message: &str, config: &WebSearchConfig) -> ScoringResult {
    let text = normalize(message);
    let weights: BTreeMap<&'static str, f64> = config.weights.iter().collect();
    let weight = |name: &str| weights.get(name).copied().unwrap_or(0.0);

    let mut category_scores = BTreeMap::new();
    for (name, re) in CATEGORIES.iter() {
        let hit = re.is_match(&text);
        category_scores.insert(*name, if hit { weight(*name) } else { 0.0 });
    }

    let triggered = config
        .triggers
        .iter()
        .map(|t| t.trim().to_lowercase())
        .any(|t| !t.is_empty() && text.contains(&t));
    category_scores.insert(
        "keywordTrigger",
        if triggered { weight("keywordTrigger") } else { 0.0 },
    );

    let total: f64 = category_scores.values().sum();
    ScoringResult {
        category_scores,
        total,
        threshold: config.threshold,
        decision: total >= config.threshold,
    }
}

/// Exclusion pass, then scoring.
pub fn decide(message: &str, config: &WebSearchConfig) -> Decision {
    if let Some(exclusion) = exclusion(message, config) {
        tracing::debug!(%exclusion, "Search excluded");
        return Decision {
            exclusion: Some(exclusion),
            scoring: None,
            search: false,
        };
    }

    let scoring = score(message, config);
    tracing::debug!(
        total = scoring.total,
        threshold = scoring.threshold,
        decision = scoring.decision,
        "Search decision scored"
    );
    Decision {
        exclusion: None,
        search: scoring.decision,
        scoring: Some(scoring),
    }
}

pub fn should_search(message: &str, config: &WebSearchConfig) -> bool {
    decide(message, config).search
}

/// Strip greetings, filler, and function words; fall back to the raw message
/// when too little survives.
pub fn extract_search_query(message: &str) -> Option<SearchQuery> {
    let mut cleaned = message.to_string();
    for re in QUERY_FILLERS.iter() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    let cleaned = strip_stray_punctuation(&cleaned);

    if cleaned.chars().count() < MIN_QUERY_CHARS {
        return SearchQuery::new(&collapse_whitespace(message));
    }
    SearchQuery::new(&cleaned)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop the separators left behind once the words around them are removed:
/// punctuation-only tokens and punctuation at either end.
fn strip_stray_punctuation(text: &str) -> String {
    let is_punct = |c: char| c.is_ascii_punctuation() || matches!(c, '¿' | '¡' | '…' | '«' | '»');
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| !w.chars().all(is_punct))
        .collect();
    words.join(" ").trim_matches(is_punct).trim().to_string()
}

fn is_information_request(text: &str) -> bool {
    INFORMATION.iter().any(|re| re.is_match(text))
}

fn has_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Result count, depth, and domain denylist for a search on `message`.
pub fn search_options(message: &str, config: &WebSearchConfig) -> SearchOptions {
    let text = normalize(message);
    let depth = if is_information_request(&text) || has_keyword(&text, NEWS_KEYWORDS) {
        SearchDepth::Advanced
    } else {
        config.search_depth
    };

    SearchOptions::new(config.max_results, depth).excluding(EXCLUDED_DOMAINS.iter().copied())
}

/// How urgently live data is needed, in `[0, 1]`; 0 when no search would run.
pub fn search_priority(message: &str, config: &WebSearchConfig) -> f64 {
    if !should_search(message, config) {
        return 0.0;
    }

    let text = normalize(message);
    let mut priority = 0.5;
    if has_keyword(&text, TEMPORAL_KEYWORDS) {
        priority += 0.3;
    }
    if is_information_request(&text) {
        priority += 0.2;
    }
    if has_keyword(&text, NEWS_KEYWORDS) {
        priority += 0.2;
    }
    f64::min(priority, 1.0)
}
