// ============================================================
// Layer 6: Artifact Store
// ============================================================
// Saves and restores everything an assembly run produces as
// JSON files in one directory.
//
// What gets saved per run:
//   1. schema.json           resolved tensor columns + dropped ones
//   2. assembly_config.json  the exact AssemblyConfig used
//   3. tensor.json           { shape, data } of the training tensor
//   4. targets.json          noisy targets, example order
//   5. groups.json           (id, group_id) per example
//   6. tag_vocabulary.json   raw tags behind the one-hot tag columns
//
// The schema is the piece inference cannot do without: a second
// collection must be assembled with exactly the training columns,
// so the schema is loaded back and handed to the assembler. The
// training row filters and tag vocabulary are loaded back with it.
//
// File layout:
//   artifacts/
//     schema.json
//     assembly_config.json
//     tensor.json
//     targets.json
//     groups.json
//     tag_vocabulary.json

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::PathBuf};

use crate::data::assembler::{AssemblyConfig, ColumnSchema, GroupKey, TrainingTensor};
use crate::data::tag_map::TagTable;

pub const SCHEMA_FILE: &str = "schema.json";
pub const CONFIG_FILE: &str = "assembly_config.json";
pub const TENSOR_FILE: &str = "tensor.json";
pub const TARGETS_FILE: &str = "targets.json";
pub const GROUPS_FILE: &str = "groups.json";
pub const TAGS_FILE: &str = "tag_vocabulary.json";

/// Reads and writes assembly artifacts in one directory.
pub struct SchemaStore {
    dir: PathBuf,
}

impl SchemaStore {
    /// Create the store, creating its directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing store without creating anything.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn save_schema(&self, schema: &ColumnSchema) -> Result<()> {
        self.save_json(SCHEMA_FILE, schema)
    }

    /// Load the schema of a previous run.
    pub fn load_schema(&self) -> Result<ColumnSchema> {
        self.load_json(SCHEMA_FILE).with_context(|| {
            "No column schema found. Run 'assemble' on the training collection first."
        })
    }

    pub fn save_config(&self, cfg: &AssemblyConfig) -> Result<()> {
        self.save_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<AssemblyConfig> {
        self.load_json(CONFIG_FILE)
    }

    pub fn save_tensor(&self, tensor: &TrainingTensor) -> Result<()> {
        self.save_json(TENSOR_FILE, tensor)
    }

    pub fn save_targets(&self, targets: &[f64]) -> Result<()> {
        self.save_json(TARGETS_FILE, &targets)
    }

    pub fn save_groups(&self, groups: &[GroupKey]) -> Result<()> {
        self.save_json(GROUPS_FILE, &groups)
    }

    pub fn save_tag_vocabulary(&self, table: &TagTable) -> Result<()> {
        self.save_json(TAGS_FILE, &table.raw_tags())
    }

    /// Raw tag vocabulary of a previous run; None when that run had
    /// no tag columns.
    pub fn load_tag_vocabulary(&self) -> Result<Option<Vec<String>>> {
        if !self.path(TAGS_FILE).exists() {
            return Ok(None);
        }
        self.load_json(TAGS_FILE).map(Some)
    }

    fn save_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn load_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.path(file);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::resample::ResampleConfig;

    #[test]
    fn test_schema_and_config_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let schema = ColumnSchema {
            columns: vec!["length".into(), "v0".into(), "tag_NN".into()],
            dropped: vec!["punct".into()],
        };
        let cfg = AssemblyConfig {
            seed: Some(7),
            resample: Some(ResampleConfig { n_row: 50, n_rep: 3 }),
            ..AssemblyConfig::default()
        };

        let store = SchemaStore::new(dir.path().join("run")).unwrap();
        store.save_schema(&schema).unwrap();
        store.save_config(&cfg).unwrap();

        let reopened = SchemaStore::open(dir.path().join("run"));
        assert_eq!(reopened.load_schema().unwrap(), schema);
        assert_eq!(reopened.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_missing_schema_is_explained() {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemaStore::open(dir.path());
        let err = store.load_schema().unwrap_err();
        assert!(format!("{err:#}").contains("assemble"));
    }

    #[test]
    fn test_tensor_written_as_shape_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemaStore::new(dir.path()).unwrap();
        let tensor = TrainingTensor {
            shape: [1, 2, 2, 1],
            data: vec![0.5, -1.0, 2.0, 0.0],
        };
        store.save_tensor(&tensor).unwrap();

        let json = fs::read_to_string(store.path(TENSOR_FILE)).unwrap();
        let restored: TrainingTensor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tensor);
        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(raw["shape"], serde_json::json!([1, 2, 2, 1]));
    }

    #[test]
    fn test_tag_vocabulary_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let store = SchemaStore::new(dir.path()).unwrap();
        assert_eq!(store.load_tag_vocabulary().unwrap(), None);

        let table = crate::data::tag_map::normalize_tags(["NN", "$"], None);
        store.save_tag_vocabulary(&table).unwrap();
        assert_eq!(store.load_tag_vocabulary().unwrap(), Some(vec!["$".to_string(), "NN".to_string()]));
    }
}
