// ============================================================
// Layer 4: Tag Normalizer
// ============================================================
// Maps the raw fine-grained tag vocabulary onto a smaller
// canonical one. Punctuation-like tags ("$", "''", "-LRB-")
// get readable names, and a few tags that differ only by
// punctuation collapse together:
//
//   "$"   → CASH     "''" → QUOTE    "``"   → QUOTE
//   ","   → COMMA    ":"  → COLON    "."    → PUNCT
//   "-LRB-" → BKT    "-RRB-" → BKT   "_SP"  → SP
//   "WP$" → WPP      "PRP$" → PRPP
//
// Any tag not listed passes through unchanged. A custom map
// replaces this table entirely; the two are never merged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

const DEFAULT_SUBSTITUTIONS: [(&str, &str); 11] = [
    ("$", "CASH"),
    ("''", "QUOTE"),
    ("``", "QUOTE"),
    (",", "COMMA"),
    ("-LRB-", "BKT"),
    ("-RRB-", "BKT"),
    (":", "COLON"),
    (".", "PUNCT"),
    ("_SP", "SP"),
    ("WP$", "WPP"),
    ("PRP$", "PRPP"),
];

/// Raw tag → canonical tag substitutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap {
    substitutions: BTreeMap<String, String>,
}

impl TagMap {
    /// A custom substitution table. Replaces the default wholesale.
    pub fn custom<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            substitutions: pairs
                .into_iter()
                .map(|(a, b)| (a.into(), b.into()))
                .collect(),
        }
    }

    /// Canonical form of a raw tag.
    pub fn canonical<'a>(&'a self, tag: &'a str) -> &'a str {
        self.substitutions.get(tag).map(String::as_str).unwrap_or(tag)
    }
}

impl Default for TagMap {
    fn default() -> Self {
        Self::custom(DEFAULT_SUBSTITUTIONS)
    }
}

/// One (raw, canonical) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    pub tag: String,
    pub tag_adj: String,
}

/// The raw tag vocabulary of a corpus paired with canonical forms,
/// sorted by raw tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TagTable {
    rows: Vec<TagRow>,
}

impl TagTable {
    pub fn rows(&self) -> &[TagRow] {
        &self.rows
    }

    /// Sorted raw vocabulary. Saving it lets a later run rebuild the
    /// same table whatever tags its own corpus contains.
    pub fn raw_tags(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.tag.clone()).collect()
    }

    /// Canonical form of `raw`, or None when `raw` is not part of the
    /// vocabulary this table was built from.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.rows
            .binary_search_by(|r| r.tag.as_str().cmp(raw))
            .ok()
            .map(|i| self.rows[i].tag_adj.as_str())
    }

    /// Sorted, deduplicated canonical vocabulary. Its size bounds the
    /// number of tag-fraction features.
    pub fn canonical_vocabulary(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.tag_adj.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Pair each raw tag with its canonical form.
///
/// `tag_map` defaults to the built-in substitution table.
pub fn normalize_tags<I, S>(all_tags: I, tag_map: Option<&TagMap>) -> TagTable
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let default_map;
    let map = match tag_map {
        Some(m) => m,
        None => {
            default_map = TagMap::default();
            &default_map
        }
    };

    let raw: BTreeSet<String> = all_tags
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .collect();

    let rows = raw
        .into_iter()
        .map(|tag| {
            let tag_adj = map.canonical(&tag).to_string();
            TagRow { tag, tag_adj }
        })
        .collect();

    TagTable { rows }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_substitutions() {
        let table = normalize_tags(["$", "PRP$", "NN", "-LRB-", "-RRB-"], None);
        assert_eq!(table.lookup("$"), Some("CASH"));
        assert_eq!(table.lookup("PRP$"), Some("PRPP"));
        assert_eq!(table.lookup("NN"), Some("NN"));
        assert_eq!(table.lookup("-LRB-"), Some("BKT"));
        assert_eq!(table.lookup("VBZ"), None);
    }

    #[test]
    fn test_default_map_has_eleven_entries() {
        let map = TagMap::default();
        assert_eq!(map.substitutions.len(), 11);
        assert_eq!(map.canonical("``"), "QUOTE");
        assert_eq!(map.canonical("_SP"), "SP");
    }

    #[test]
    fn test_custom_map_replaces_default() {
        let custom = TagMap::custom([("NN", "NOUN")]);
        let table = normalize_tags(["NN", "$"], Some(&custom));
        assert_eq!(table.lookup("NN"), Some("NOUN"));
        // "$" is not in the custom map, so the default CASH rule does not apply
        assert_eq!(table.lookup("$"), Some("$"));
    }

    #[test]
    fn test_vocabulary_is_sorted_and_deduplicated() {
        let table = normalize_tags(["-RRB-", "NN", "-LRB-", "NN", "''", "``"], None);
        assert_eq!(table.len(), 5);
        assert_eq!(table.canonical_vocabulary(), vec!["BKT", "NN", "QUOTE"]);
    }

    #[test]
    fn test_raw_tags_rebuild_the_same_table() {
        let table = normalize_tags(["NN", "$", "VBZ", "NN"], None);
        assert_eq!(table.raw_tags(), vec!["$", "NN", "VBZ"]);
        assert_eq!(normalize_tags(table.raw_tags(), None), table);
    }
}
