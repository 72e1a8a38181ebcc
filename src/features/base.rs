// ============================================================
// Layer 4b: Scalar Feature Aggregator
// ============================================================
// Reduces one document's token / sentence / entity tables to a
// single flat map of named scalars:
//
//   word_len_*        → length stats over alphabetic tokens;
//                       top-N over distinct (word, length) pairs
//   comm_score_*      → commonality stats over distinct known,
//                       non-stopword (word, score) pairs
//   frac_<len bucket> → share of alphabetic words longer than 3
//                       chars per length bucket
//   frac_<comm bucket>→ share of scored words per commonality bucket
//   words_per_sent, noun_chunks_per_sent, frac_stop
//   <CANONICAL TAG>   → tag frequency (optional block)
//   <ENTITY LABEL>, avg_ent_words, avg_ent_len (optional block)
//
// Every category axis is written in full from its fixed label
// list before any counts land, so a category with no members is
// present with value 0 instead of missing from the key set.
//
// The comm_score_top* features sort scores ascending and take the
// tail. Since score = freq_norm / count, the tail holds the RAREST
// words, whatever the "top" in the name suggests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::data::tag_map::TagTable;
use crate::domain::{EntityRecord, FeatureError, FeatureResult, SentenceRecord, TokenRecord};
use crate::features::stats::{bucket_fractions, mean, sample_std, sorted, top_n_mean};
use crate::features::FeatureRow;

pub const LENGTH_EDGES: [f64; 5] = [1.0, 5.0, 7.0, 10.0, 100.0];
pub const LENGTH_LABELS: [&str; 4] = ["frac_short", "frac_medium", "frac_long", "frac_huge"];

pub const COMMONALITY_EDGES: [f64; 6] = [0.0, 0.0005, 0.0025, 0.025, 0.1, 1.0];
pub const COMMONALITY_LABELS: [&str; 5] = [
    "frac_very_common",
    "frac_common",
    "frac_uncommon",
    "frac_rare",
    "frac_very_rare",
];

const TOP_N: [usize; 3] = [20, 10, 5];

/// Only alphabetic words longer than this enter the length buckets.
const MIN_BUCKET_WORD_LEN: usize = 3;

/// Build the scalar feature row of one document.
///
/// * `tag_table`     - when given, adds one frequency feature per
///                     canonical tag in its vocabulary
/// * `entities` + `entity_labels` - when both are given, adds one
///                     fraction per expected entity label plus the
///                     average entity word count and character length
pub fn gen_base_features(
    tokens: &[TokenRecord],
    sentences: &[SentenceRecord],
    entities: Option<&[EntityRecord]>,
    tag_table: Option<&TagTable>,
    entity_labels: Option<&[String]>,
) -> FeatureResult<FeatureRow> {
    let words: Vec<&TokenRecord> = tokens.iter().filter(|t| t.alpha).collect();
    if words.is_empty() {
        return Err(FeatureError::EmptyInput(
            "document has no alphabetic tokens".to_string(),
        ));
    }
    if sentences.is_empty() {
        return Err(FeatureError::EmptyInput("document has no sentences".to_string()));
    }

    let mut features = FeatureRow::new();

    // ── Word length ───────────────────────────────────────────────────────────
    let lengths: Vec<f64> = words.iter().map(|t| t.length as f64).collect();
    features.insert("word_len_avg".into(), mean(&lengths).unwrap_or(0.0));
    features.insert("word_len_std".into(), sample_std(&lengths));

    let distinct_lengths: BTreeSet<(&str, usize)> =
        words.iter().map(|t| (t.word.as_str(), t.length)).collect();
    let uniq_lengths = sorted(
        &distinct_lengths
            .iter()
            .map(|&(_, l)| l as f64)
            .collect::<Vec<_>>(),
    );
    for n in TOP_N {
        features.insert(
            format!("word_len_top{n}"),
            top_n_mean(&uniq_lengths, n).unwrap_or(0.0),
        );
    }

    // ── Commonality ───────────────────────────────────────────────────────────
    let comm_scores = distinct_commonality(tokens);
    features.insert("comm_score_avg".into(), mean(&comm_scores).unwrap_or(0.0));
    features.insert("comm_score_std".into(), sample_std(&comm_scores));
    for n in TOP_N {
        features.insert(
            format!("comm_score_top{n}"),
            top_n_mean(&comm_scores, n).unwrap_or(0.0),
        );
    }

    // ── Sentence and stopword summaries ───────────────────────────────────────
    let sent_len: Vec<f64> = sentences.iter().map(|s| s.length as f64).collect();
    let chunks: Vec<f64> = sentences.iter().map(|s| s.noun_chunks as f64).collect();
    features.insert("words_per_sent".into(), mean(&sent_len).unwrap_or(0.0));
    features.insert("noun_chunks_per_sent".into(), mean(&chunks).unwrap_or(0.0));

    let n_stop = words.iter().filter(|t| t.stop).count();
    features.insert("frac_stop".into(), n_stop as f64 / words.len() as f64);

    // ── Length and commonality buckets ────────────────────────────────────────
    let long_words: Vec<f64> = words
        .iter()
        .filter(|t| t.length > MIN_BUCKET_WORD_LEN)
        .map(|t| t.length as f64)
        .collect();
    insert_axis(
        &mut features,
        &LENGTH_LABELS,
        &bucket_fractions(&long_words, &LENGTH_EDGES),
    );
    insert_axis(
        &mut features,
        &COMMONALITY_LABELS,
        &bucket_fractions(&comm_scores, &COMMONALITY_EDGES),
    );

    // ── Tag frequencies ───────────────────────────────────────────────────────
    if let Some(tag_table) = tag_table {
        features.extend(tag_features(tokens, tag_table));
    }

    // ── Entity features ───────────────────────────────────────────────────────
    if let (Some(entities), Some(labels)) = (entities, entity_labels) {
        features.extend(entity_features(entities, labels));
    }

    Ok(features)
}

/// Scores of the distinct known, non-stopword words, ascending.
fn distinct_commonality(tokens: &[TokenRecord]) -> Vec<f64> {
    let distinct: BTreeMap<&str, f64> = tokens
        .iter()
        .filter(|t| !t.stop)
        .filter_map(|t| t.comm_score.map(|s| (t.word.as_str(), s)))
        .collect();
    sorted(&distinct.into_values().collect::<Vec<_>>())
}

fn insert_axis(features: &mut FeatureRow, labels: &[&str], fractions: &[f64]) {
    for (label, frac) in labels.iter().zip(fractions) {
        features.insert((*label).to_string(), *frac);
    }
}

/// Normalised raw-tag frequencies, summed per canonical tag and
/// zero-filled across the whole canonical vocabulary.
fn tag_features(tokens: &[TokenRecord], tag_table: &TagTable) -> FeatureRow {
    let mut out: FeatureRow = tag_table
        .canonical_vocabulary()
        .into_iter()
        .map(|t| (t, 0.0))
        .collect();

    if tokens.is_empty() {
        return out;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tokens {
        *counts.entry(t.tag.as_str()).or_insert(0) += 1;
    }

    let total = tokens.len() as f64;
    for row in tag_table.rows() {
        if let Some(&c) = counts.get(row.tag.as_str()) {
            *out.entry(row.tag_adj.clone()).or_insert(0.0) += c as f64 / total;
        }
    }
    out
}

/// Entity-label fractions over the expected label list plus average
/// entity size. A document without entities gets zeros everywhere.
fn entity_features(entities: &[EntityRecord], labels: &[String]) -> FeatureRow {
    let mut out: FeatureRow = labels.iter().map(|l| (l.clone(), 0.0)).collect();

    if entities.is_empty() {
        out.insert("avg_ent_words".into(), 0.0);
        out.insert("avg_ent_len".into(), 0.0);
        return out;
    }

    let total = entities.len() as f64;
    for e in entities {
        if let Some(v) = out.get_mut(&e.label) {
            *v += 1.0 / total;
        }
    }

    let words: Vec<f64> = entities.iter().map(|e| e.n_words as f64).collect();
    let lens: Vec<f64> = entities.iter().map(|e| e.length as f64).collect();
    out.insert("avg_ent_words".into(), mean(&words).unwrap_or(0.0));
    out.insert("avg_ent_len".into(), mean(&lens).unwrap_or(0.0));
    out
}
