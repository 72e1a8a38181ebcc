use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::assembler::TrainingData;

/// One resample group of one document, ready for a sequence model.
/// `inputs` is row-major, `rows * features` long.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: String,
    pub group_id: usize,
    pub rows: usize,
    pub features: usize,
    pub inputs: Vec<f32>,
    pub target: Option<f32>,
}

impl TrainingExample {
    /// Features of one row.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.inputs[i * self.features..(i + 1) * self.features]
    }
}

pub struct TrainingDataset {
    examples: Vec<TrainingExample>,
}

impl TrainingDataset {
    pub fn new(examples: Vec<TrainingExample>) -> Self {
        Self { examples }
    }
}

impl From<&TrainingData> for TrainingDataset {
    fn from(data: &TrainingData) -> Self {
        let [_, rows, features, _] = data.tensor.shape;
        let examples = data
            .groups
            .iter()
            .enumerate()
            .map(|(i, key)| TrainingExample {
                id: key.id.clone(),
                group_id: key.group_id,
                rows,
                features,
                inputs: data.tensor.example(i).to_vec(),
                target: data.targets.as_ref().map(|t| t[i] as f32),
            })
            .collect();
        Self::new(examples)
    }
}

impl Dataset<TrainingExample> for TrainingDataset {
    fn get(&self, index: usize) -> Option<TrainingExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::data::assembler::{ColumnSchema, GroupKey, TrainingData, TrainingTensor};

    /// Two groups of document "a", 2 rows x 3 features, values 1..=12.
    pub fn two_by_three() -> TrainingData {
        TrainingData {
            tensor: TrainingTensor {
                shape: [2, 2, 3, 1],
                data: (1..=12).map(|x| x as f32).collect(),
            },
            targets: Some(vec![1.0, 2.0]),
            groups: vec![
                GroupKey { id: "a".into(), group_id: 0 },
                GroupKey { id: "a".into(), group_id: 1 },
            ],
            schema: ColumnSchema {
                columns: vec!["length".into(), "v0".into(), "v1".into()],
                dropped: Vec::new(),
            },
            aggregates: None,
            quantiles: Vec::new(),
        }
    }
}
