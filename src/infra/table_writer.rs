// ============================================================
// Layer 6: Table Writer
// ============================================================
// Writes numeric tables to CSV for inspection and for models
// that read flat feature tables.
//
// Two layouts:
//
//   per-document feature table   (features command)
//     id,<feature keys in sorted order>,target,standard_error
//     doc-1,0.231000,...,-0.340000,0.480000
//
//   per-example auxiliary table  (assemble command)
//     id,group_id,<columns>
//     doc-1,0,0.231000,...
//
// Values are written with 6 decimal places. Ids are written
// verbatim and must not contain commas.
//
// The raw tag vocabulary behind a feature table is written next
// to it as a JSON array, so a later run can pass it back in and
// get the same tag columns.

use anyhow::{bail, Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::application::feature_use_case::DocumentFeatures;
use crate::data::assembler::{AuxTable, GroupKey};
use crate::data::tag_map::TagTable;

/// Write one row per document. Every row must carry the same keys.
pub fn write_feature_table(path: &Path, rows: &[DocumentFeatures]) -> Result<()> {
    let Some(first) = rows.first() else {
        bail!("No feature rows to write to '{}'", path.display());
    };
    let keys: Vec<&String> = first.values.keys().collect();
    let labelled = first.target.is_some();

    let mut f = create(path)?;

    let mut header = vec!["id".to_string()];
    header.extend(keys.iter().map(|k| k.to_string()));
    if labelled {
        header.push("target".into());
        header.push("standard_error".into());
    }
    writeln!(f, "{}", header.join(","))?;

    for row in rows {
        if row.values.len() != keys.len() || !row.values.keys().eq(keys.iter().copied()) {
            bail!("Document '{}' has a different feature set", row.id);
        }
        let mut cells = vec![row.id.clone()];
        cells.extend(row.values.values().map(|v| format!("{v:.6}")));
        if labelled {
            cells.push(format!("{:.6}", row.target.unwrap_or(f64::NAN)));
            cells.push(format!("{:.6}", row.standard_error.unwrap_or(f64::NAN)));
        }
        writeln!(f, "{}", cells.join(","))?;
    }
    f.flush()?;

    tracing::debug!("Wrote {} feature rows to '{}'", rows.len(), path.display());
    Ok(())
}

/// Write a per-example side table, keyed by (id, group_id).
pub fn write_aux_table(path: &Path, table: &AuxTable, groups: &[GroupKey]) -> Result<()> {
    if table.rows.len() != groups.len() {
        bail!(
            "Table '{}' has {} rows for {} examples",
            table.name,
            table.rows.len(),
            groups.len()
        );
    }

    let mut f = create(path)?;
    writeln!(f, "id,group_id,{}", table.columns.join(","))?;
    for (key, row) in groups.iter().zip(&table.rows) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
        writeln!(f, "{},{},{}", key.id, key.group_id, cells.join(","))?;
    }
    f.flush()?;

    tracing::debug!("Wrote table '{}' to '{}'", table.name, path.display());
    Ok(())
}

/// Sidecar path of the tag vocabulary for a feature table:
/// `features.csv` → `features.tags.json`.
pub fn tag_vocabulary_path(table: &Path) -> PathBuf {
    table.with_extension("tags.json")
}

/// Write the raw tag vocabulary of `table` as a JSON array.
pub fn write_tag_vocabulary(path: &Path, table: &TagTable) -> Result<()> {
    let mut f = create(path)?;
    serde_json::to_writer_pretty(&mut f, &table.raw_tags())?;
    f.flush()?;

    tracing::debug!("Wrote {} raw tags to '{}'", table.len(), path.display());
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let f = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    Ok(BufWriter::new(f))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRow;

    fn row(id: &str, a: f64, b: f64, target: Option<f64>) -> DocumentFeatures {
        let mut values = FeatureRow::new();
        values.insert("b_feature".into(), b);
        values.insert("a_feature".into(), a);
        DocumentFeatures {
            id: id.into(),
            values,
            target,
            standard_error: target.map(|_| 0.5),
        }
    }

    #[test]
    fn test_feature_table_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        write_feature_table(&path, &[row("x", 1.0, 2.0, Some(-0.25)), row("y", 0.5, 0.0, Some(1.0))]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,a_feature,b_feature,target,standard_error");
        assert_eq!(lines[1], "x,1.000000,2.000000,-0.250000,0.500000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_unlabelled_feature_table_has_no_target_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        write_feature_table(&path, &[row("x", 1.0, 2.0, None)]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), "id,a_feature,b_feature");
    }

    #[test]
    fn test_ragged_feature_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut odd = row("y", 0.5, 0.0, None);
        odd.values.insert("c_feature".into(), 1.0);
        let err = write_feature_table(&dir.path().join("f.csv"), &[row("x", 1.0, 2.0, None), odd]);
        assert!(err.is_err());
    }

    #[test]
    fn test_aux_table_keyed_by_group() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("aggregates.csv");
        let table = AuxTable {
            name: "aggregates".into(),
            columns: vec!["length_mean".into(), "words_per_sent".into()],
            rows: vec![vec![0.25, 0.8], vec![0.25, 0.8]],
        };
        let groups = vec![
            GroupKey { id: "a".into(), group_id: 0 },
            GroupKey { id: "a".into(), group_id: 1 },
        ];
        write_aux_table(&path, &table, &groups).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,group_id,length_mean,words_per_sent");
        assert_eq!(lines[2], "a,1,0.250000,0.800000");
    }

    #[test]
    fn test_tag_vocabulary_sits_next_to_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = tag_vocabulary_path(&dir.path().join("features.csv"));
        assert_eq!(path, dir.path().join("features.tags.json"));

        let table = crate::data::tag_map::normalize_tags(["VBZ", "$", "NN"], None);
        write_tag_vocabulary(&path, &table).unwrap();
        let tags = crate::data::loader::load_tag_vocabulary(&path).unwrap();
        assert_eq!(tags, vec!["$", "NN", "VBZ"]);
    }
}
