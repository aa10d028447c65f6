//! Region and category detection for articles that arrive without them.

use crate::types::{Category, Region};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

const INDIA_COUNTRY_CODES: &[&str] = &["IN", "IND", "INDIA"];

const INDIAN_OUTLETS: &[&str] = &[
    "times of india",
    "toi",
    "hindustan times",
    "indian express",
    "ndtv",
    "zee news",
    "aaj tak",
    "india today",
    "news18",
    "firstpost",
    "livemint",
    "economic times",
    "dna india",
    "deccan herald",
    "the hindu",
    "outlook india",
];

const INDIA_KEYWORDS: &[&str] = &[
    "india", "indian", "delhi", "mumbai", "bangalore", "chennai", "kolkata", "hyderabad", "pune",
    "modi", "bjp", "congress", "rupee", "bollywood", "ipl", "bcci",
];

const GLOBAL_KEYWORDS: &[&str] = &[
    "usa",
    "america",
    "uk",
    "britain",
    "china",
    "europe",
    "russia",
    "ukraine",
    "nato",
    "un",
    "world",
    "international",
    "global",
];

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Sports,
        &["sport", "game", "match", "player", "team", "football", "cricket", "tennis"],
    ),
    (
        Category::Politics,
        &["politic", "government", "election", "minister", "parliament", "vote"],
    ),
    (
        Category::Technology,
        &["tech", "ai", "software", "computer", "digital", "app", "startup"],
    ),
    (
        Category::Health,
        &["health", "medical", "doctor", "hospital", "covid", "vaccine", "medicine"],
    ),
    (
        Category::Crime,
        &["crime", "police", "arrest", "court", "murder", "theft", "investigation"],
    ),
    (
        Category::Entertainment,
        &["movie", "film", "music", "celebrity", "actor", "entertainment"],
    ),
];

/// Lowercased word tokens of `text`.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

/// Short keywords must match a whole word; longer ones also match as a stem
/// ("politic" matches "politics", "political").
fn keyword_matches(token: &str, keyword: &str) -> bool {
    token == keyword || (keyword.len() >= 4 && token.starts_with(keyword))
}

fn keyword_score(tokens: &[String], keywords: &[&str]) -> usize {
    let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    keywords
        .iter()
        .filter(|kw| unique.iter().any(|t| keyword_matches(t, kw)))
        .count()
}

/// Detect the editorial region of an article.
///
/// Order of evidence: upstream country code, known Indian outlet, then
/// keyword scores over title and body.
pub fn detect_region(country: Option<&str>, source: &str, title: &str, body: &str) -> Region {
    if let Some(country) = country {
        if INDIA_COUNTRY_CODES.contains(&country.trim().to_uppercase().as_str()) {
            return Region::India;
        }
    }

    let source = source.to_lowercase();
    if INDIAN_OUTLETS.iter().any(|outlet| source.contains(outlet)) {
        return Region::India;
    }

    let words = tokens(&format!("{} {}", title, body));
    let india_score = keyword_score(&words, INDIA_KEYWORDS);
    if india_score >= 2 {
        return Region::India;
    }

    let global_score = keyword_score(&words, GLOBAL_KEYWORDS);
    if global_score > india_score {
        Region::Global
    } else if india_score > 0 {
        Region::India
    } else {
        Region::Global
    }
}

/// Assign a category by keyword score; ties go to the earlier category in
/// the table, no matches fall back to `Other`.
pub fn detect_category(title: &str, body: &str) -> Category {
    let words = tokens(&format!("{} {}", title, body));

    let mut best = (Category::Other, 0);
    for (category, keywords) in CATEGORY_KEYWORDS {
        let score = keyword_score(&words, keywords);
        if score > best.1 {
            best = (*category, score);
        }
    }
    best.0
}
