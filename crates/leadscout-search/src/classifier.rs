//! Keyword classifier: free-text criteria to map feature tag predicates.
//!
//! Each clause of the criteria text goes through the stages in
//! [`RESOLUTION_ORDER`]. Aliases only add predicates; keyword matching always
//! runs after them; the token and generic stages run only while nothing has
//! matched yet. The generic stage always produces a predicate, so no clause
//! resolves to an empty list.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use leadscout_core::{ClassifiedTerm, TagPredicate};
use regex::Regex;

static CLAUSE_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",| and | or | & ").expect("valid clause separator regex"));

/// Built-in keyword table. Keys are lowercase; values are predicates in the
/// feature service's query language.
pub(crate) const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    // apparel
    ("saree", &[r#"["shop"~"clothes|fabric"]["name"~"saree|silk|textile|fabrics",i]"#]),
    ("sari", &[r#"["shop"~"clothes|fabric"]["name"~"saree|silk|textile|fabrics",i]"#]),
    ("silk", &[r#"["shop"~"clothes|fabric"]["name"~"saree|silk|textile|fabrics",i]"#]),
    ("textile", &[r#"["shop"~"clothes|fabric"]["name"~"textile|fabrics|silk",i]"#]),
    ("boutique", &[r#"["shop"="boutique"]"#]),
    ("clothing", &[r#"["shop"="clothes"]"#]),
    ("garment", &[r#"["shop"="clothes"]"#]),
    ("dress", &[r#"["shop"="clothes"]"#]),
    ("fashion", &[r#"["shop"="clothes"]"#]),
    ("jewellery", &[r#"["shop"="jewelry"]"#]),
    ("jewelry", &[r#"["shop"="jewelry"]"#]),
    ("gold", &[r#"["shop"="jewelry"]"#]),
    // technology and marketing
    ("software", &[r#"["office"~"it|software|technology"]"#]),
    ("it company", &[r#"["office"~"it|software|technology"]"#]),
    ("web", &[r#"["office"~"it|web|design|marketing"]"#]),
    ("website", &[r#"["office"~"it|web|design|marketing"]"#]),
    ("design", &[r#"["office"~"design|marketing|advertising"]"#]),
    ("marketing", &[r#"["office"~"marketing|advertising"]"#]),
    ("advertising", &[r#"["office"~"advertising"]"#]),
    ("seo", &[r#"["office"~"marketing|it"]"#]),
    // food
    ("restaurant", &[r#"["amenity"="restaurant"]"#]),
    ("cafe", &[r#"["amenity"="cafe"]"#]),
    ("bakery", &[r#"["shop"="bakery"]"#]),
    ("food", &[r#"["amenity"~"restaurant|cafe|fast_food"]"#]),
    // services
    ("gym", &[r#"["leisure"="fitness_centre"]"#]),
    ("fitness", &[r#"["leisure"="fitness_centre"]"#]),
    ("hospital", &[r#"["amenity"="hospital"]"#]),
    ("school", &[r#"["amenity"="school"]"#]),
    ("college", &[r#"["amenity"="college"]"#]),
    ("university", &[r#"["amenity"="university"]"#]),
    (
        "plumber",
        &[
            r#"["craft"="plumber"]"#,
            r#"["shop"="bathroom_furnishing"]"#,
            r#"["shop"="hardware"]"#,
        ],
    ),
    ("electrician", &[r#"["craft"="electrician"]"#]),
    ("carpenter", &[r#"["craft"="carpenter"]"#]),
    ("painter", &[r#"["craft"="painter"]"#]),
    ("cleaning", &[r#"["shop"="dry_cleaning"]"#, r#"["craft"="cleaning"]"#]),
    // vehicles
    ("mechanic", &[r#"["shop"="car_repair"]"#, r#"["craft"="mechanic"]"#]),
    ("garage", &[r#"["shop"="car_repair"]"#]),
    ("car", &[r#"["shop"="car"]"#, r#"["shop"="car_repair"]"#]),
    ("repair", &[r#"["shop"~"repair"]"#, r#"["craft"~"repair"]"#]),
    ("wash", &[r#"["amenity"="car_wash"]"#]),
    ("dealer", &[r#"["shop"="car"]"#]),
    ("taxi", &[r#"["amenity"="taxi"]"#]),
    // health and beauty
    ("salon", &[r#"["shop"="beauty"]"#, r#"["shop"="hairdresser"]"#]),
    ("beauty", &[r#"["shop"="beauty"]"#]),
    ("spa", &[r#"["leisure"="sauna"]"#, r#"["shop"="beauty"]"#]),
    ("barber", &[r#"["shop"="hairdresser"]"#]),
    ("doctor", &[r#"["amenity"="doctors"]"#]),
    ("clinic", &[r#"["amenity"="clinic"]"#]),
    ("pharmacy", &[r#"["amenity"="pharmacy"]"#]),
    ("dentist", &[r#"["amenity"="dentist"]"#]),
    // professional services
    ("real estate", &[r#"["office"="estate_agent"]"#]),
    ("realtor", &[r#"["office"="estate_agent"]"#]),
    ("lawyer", &[r#"["office"="lawyer"]"#]),
    ("legal", &[r#"["office"="lawyer"]"#]),
    ("accountant", &[r#"["office"="accountant"]"#]),
    ("consultant", &[r#"["office"="consulting"]"#]),
    ("agency", &[r#"["office"~"agency|company"]"#]),
    ("travel", &[r#"["shop"="travel_agency"]"#]),
    ("bank", &[r#"["amenity"="bank"]"#]),
    ("atm", &[r#"["amenity"="atm"]"#]),
    ("insurance", &[r#"["office"="insurance"]"#]),
    // construction and home
    ("construction", &[r#"["office"="construction"]"#, r#"["craft"="builder"]"#]),
    ("builder", &[r#"["office"="construction"]"#, r#"["craft"="builder"]"#]),
    ("architect", &[r#"["office"="architect"]"#]),
    ("interior", &[r#"["office"="interior_design"]"#]),
    // broad categories; plural keys are listed so length ties resolve the same way
    ("shop", &[r#"["shop"]"#]),
    ("shops", &[r#"["shop"]"#]),
    ("store", &[r#"["shop"]"#]),
    ("stores", &[r#"["shop"]"#]),
    ("supermarket", &[r#"["shop"="supermarket"]"#]),
    ("mall", &[r#"["shop"="mall"]"#]),
    ("malls", &[r#"["shop"="mall"]"#]),
    ("shopping mall", &[r#"["shop"="mall"]"#]),
    ("shopping malls", &[r#"["shop"="mall"]"#]),
    ("hotel", &[r#"["tourism"="hotel"]"#]),
    ("hotels", &[r#"["tourism"="hotel"]"#]),
    ("office", &[r#"["office"]"#]),
    ("offices", &[r#"["office"]"#]),
    ("company", &[r#"["office"]"#]),
    ("companies", &[r#"["office"]"#]),
    ("it companies", &[r#"["office"~"it|software|technology"]"#]),
    ("software companies", &[r#"["office"~"it|software|technology"]"#]),
];

/// Natural-language phrases and the keyword they stand for.
pub(crate) const DEFAULT_ALIASES: &[(&str, &str)] = &[
    // "web design" has no table entry; the nearest key carries the same predicate.
    ("website building", "website"),
    ("web development", "software"),
    ("app development", "software"),
    ("coding agency", "software"),
    ("home cleaning", "cleaning"),
    ("house keeping", "cleaning"),
    ("car service", "mechanic"),
    ("bike repair", "mechanic"),
    ("beauty parlour", "salon"),
    ("hair cut", "barber"),
    ("tax filing", "accountant"),
    ("legal help", "lawyer"),
    ("property dealer", "real estate"),
    ("cab service", "taxi"),
];

/// One stage of per-clause resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Exact alias phrase, resolved through the keyword table.
    Alias,
    /// Longest table key contained in the clause.
    Keyword,
    /// Every whitespace token found in the table, singular form included.
    Token,
    /// Name-substring predicate, scoped to shops or offices when the clause says so.
    Generic,
}

pub const RESOLUTION_ORDER: [Resolution; 4] = [
    Resolution::Alias,
    Resolution::Keyword,
    Resolution::Token,
    Resolution::Generic,
];

impl Resolution {
    /// Whether the stage still runs after an earlier stage produced predicates.
    #[must_use]
    pub fn runs_after_hit(self) -> bool {
        matches!(self, Resolution::Alias | Resolution::Keyword)
    }
}

/// Keyword to predicates lookup, scanned longest key first.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    /// Sorted by key length, descending; ties keep declaration order.
    entries: Vec<(String, Vec<TagPredicate>)>,
    index: HashMap<String, usize>,
}

impl KeywordTable {
    /// Builds a table from `(key, predicates)` pairs. Keys are lowercased; a
    /// repeated key keeps its first definition.
    #[must_use]
    pub fn new<K, P, S>(entries: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: AsRef<str>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut sorted: Vec<(String, Vec<TagPredicate>)> = entries
            .into_iter()
            .filter_map(|(key, predicates)| {
                let key = key.as_ref().trim().to_lowercase();
                if key.is_empty() || !seen.insert(key.clone()) {
                    return None;
                }
                let predicates = predicates.into_iter().map(TagPredicate::new).collect();
                Some((key, predicates))
            })
            .collect();
        sorted.sort_by_key(|(key, _)| Reverse(key.chars().count()));

        let index = sorted
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
        Self {
            entries: sorted,
            index,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[TagPredicate]> {
        self.index.get(key).map(|&i| self.entries[i].1.as_slice())
    }

    /// First key, longest first, that `term` contains. Equality and the
    /// plural `key + "s"` are both containment.
    #[must_use]
    pub fn best_match(&self, term: &str) -> Option<(&str, &[TagPredicate])> {
        self.entries
            .iter()
            .find(|(key, _)| term.contains(key.as_str()))
            .map(|(key, predicates)| (key.as_str(), predicates.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_KEYWORDS
                .iter()
                .map(|(key, predicates)| (*key, predicates.iter().copied())),
        )
    }
}

/// Stateless classifier over a keyword table and an alias map.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: KeywordTable,
    aliases: HashMap<String, String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordTable::default(), DEFAULT_ALIASES.iter().copied())
    }
}

impl Classifier {
    #[must_use]
    pub fn new<A, C>(keywords: KeywordTable, aliases: impl IntoIterator<Item = (A, C)>) -> Self
    where
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let aliases = aliases
            .into_iter()
            .map(|(a, c)| (a.as_ref().to_lowercase(), c.as_ref().to_lowercase()))
            .collect();
        Self { keywords, aliases }
    }

    /// One [`ClassifiedTerm`] per non-empty clause of `text`, in order.
    #[must_use]
    pub fn classify(&self, text: &str) -> Vec<ClassifiedTerm> {
        split_clauses(text)
            .into_iter()
            .map(|raw_term| {
                let predicates = self.resolve(&raw_term);
                ClassifiedTerm {
                    raw_term,
                    predicates,
                }
            })
            .collect()
    }

    /// Runs the resolution stages for one already-normalised clause.
    #[must_use]
    pub fn resolve(&self, term: &str) -> Vec<TagPredicate> {
        let mut found = Vec::new();
        for stage in RESOLUTION_ORDER {
            if !found.is_empty() && !stage.runs_after_hit() {
                break;
            }
            found.extend(self.apply(stage, term));
        }
        found
    }

    /// Predicates a single stage yields for `term`, ignoring the other stages.
    #[must_use]
    pub fn apply(&self, stage: Resolution, term: &str) -> Vec<TagPredicate> {
        match stage {
            Resolution::Alias => self
                .aliases
                .get(term)
                .and_then(|canonical| self.keywords.get(canonical))
                .map(<[TagPredicate]>::to_vec)
                .unwrap_or_default(),
            Resolution::Keyword => self
                .keywords
                .best_match(term)
                .map(|(_, predicates)| predicates.to_vec())
                .unwrap_or_default(),
            Resolution::Token => term
                .split_whitespace()
                .filter_map(|token| {
                    self.keywords.get(token).or_else(|| {
                        token
                            .strip_suffix('s')
                            .and_then(|singular| self.keywords.get(singular))
                    })
                })
                .flat_map(<[TagPredicate]>::iter)
                .cloned()
                .collect(),
            Resolution::Generic => vec![generic_predicate(term)],
        }
    }

    /// Every predicate across `terms`, first occurrence wins.
    #[must_use]
    pub fn merged_predicates(terms: &[ClassifiedTerm]) -> Vec<TagPredicate> {
        let mut seen = HashSet::new();
        terms
            .iter()
            .flat_map(|t| t.predicates.iter())
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }
}

/// Lowercases `text` and splits it on commas and the conjunctions
/// `and`, `or`, `&`. Blank clauses are dropped.
#[must_use]
pub fn split_clauses(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    CLAUSE_SEPARATOR_RE
        .split(&lowered)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// POSIX extended regex metacharacters, the dialect of the feature service.
const ERE_METACHARACTERS: &[char] = &[
    '.', '[', ']', '(', ')', '*', '+', '?', '{', '}', '|', '^', '$', '\\',
];

/// Escapes `term` as a literal POSIX ERE. Characters outside
/// [`ERE_METACHARACTERS`] pass through untouched.
fn escape_ere(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if ERE_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive name match on the literal `term`.
fn generic_predicate(term: &str) -> TagPredicate {
    let pattern = escape_ere(term)
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    let scope = if term.contains("shop") || term.contains("store") {
        r#"["shop"]"#
    } else if term.contains("company") || term.contains("office") {
        r#"["office"]"#
    } else {
        ""
    };
    TagPredicate::new(format!(r#"{scope}["name"~"{pattern}",i]"#))
}
