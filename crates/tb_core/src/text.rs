use crate::hashing::blake3_hex_prefixed;
use std::collections::BTreeMap;

/// Token multiset used for Dice similarity.
pub type TokenBag = BTreeMap<String, u32>;

/// Strip a leading `- [ ]` / `* [x]` checkbox marker, if present.
fn strip_checkbox(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
    else {
        return trimmed;
    };
    let rest = rest.trim_start();
    let Some(boxed) = rest.strip_prefix('[') else {
        return trimmed;
    };
    match boxed.find(']') {
        Some(idx) => boxed[idx + 1..].trim_start(),
        None => trimmed,
    }
}

/// Normalized form used by the deduplicator and title hashing: lowercase,
/// checkbox markup stripped, whitespace collapsed. Two descriptions are
/// duplicates iff these normalizations are byte-equal.
pub fn normalize_description(text: &str) -> String {
    strip_checkbox(text)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn title_hash(text: &str) -> String {
    blake3_hex_prefixed(normalize_description(text).as_bytes())
}

/// Tokenization for similarity scoring: lowercase, URLs dropped, markdown
/// glyphs removed, punctuation treated as separators.
pub fn normalize_tokens(text: &str) -> TokenBag {
    let mut bag = TokenBag::new();
    for word in strip_checkbox(text).split_whitespace() {
        let folded = word.to_lowercase();
        if folded.starts_with("http://") || folded.starts_with("https://") {
            continue;
        }
        let mut token = String::new();
        for ch in folded.chars() {
            if ch.is_alphanumeric() || ch == '_' {
                token.push(ch);
            } else if !token.is_empty() {
                *bag.entry(std::mem::take(&mut token)).or_insert(0) += 1;
            }
        }
        if !token.is_empty() {
            *bag.entry(token).or_insert(0) += 1;
        }
    }
    bag
}

pub fn bag_len(bag: &TokenBag) -> u32 {
    bag.values().sum()
}

/// Dice coefficient over token multisets.
pub fn dice_bag(a: &TokenBag, b: &TokenBag) -> f64 {
    let total = bag_len(a) + bag_len(b);
    if total == 0 {
        return 0.0;
    }
    let mut intersection = 0u32;
    for (token, count_a) in a {
        if let Some(count_b) = b.get(token) {
            intersection += (*count_a).min(*count_b);
        }
    }
    (2.0 * f64::from(intersection)) / f64::from(total)
}

fn with_hash_prefix(tag: &str) -> String {
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{tag}")
    }
}

/// Union of two tag lists, Obsidian side first, insertion order preserved.
pub fn merge_tags(obs_tags: &[String], rem_tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut merged = Vec::new();
    for tag in obs_tags.iter().chain(rem_tags.iter()) {
        let normalized = with_hash_prefix(tag);
        if seen.insert(normalized.clone()) {
            merged.push(normalized);
        }
    }
    merged
}

/// Tag comparison key: `#` prefix ignored, order ignored.
pub fn tag_set(tags: &[String]) -> std::collections::BTreeSet<String> {
    tags.iter()
        .map(|tag| tag.trim_start_matches('#').to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
