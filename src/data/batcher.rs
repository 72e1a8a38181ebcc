// ============================================================
// Layer 4: Feature Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<TrainingExample>
// into tensors a sequence model can consume.
//
// How batching works here:
//   Input:  N TrainingExamples, each R rows x F features
//   Output: FeatureBatch with inputs of shape [N, R, F, 1]
//
//   Every example's inputs are already flat and row-major, so the
//   batch is one concatenation and a reshape:
//   [e1_r1_f1, e1_r1_f2, ..., eN_rR_fF] → [N, R, F, 1]
//
// The resampler guarantees equal R for every example of a
// collection; no padding is needed.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::assembler::TrainingTensor;
use crate::data::dataset::TrainingExample;

// ─── FeatureBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct FeatureBatch<B: Backend> {
    /// Shape: [batch_size, rows, features, 1]
    pub inputs: Tensor<B, 4>,

    /// Shape: [batch_size]; None for unlabelled examples
    pub targets: Option<Tensor<B, 1>>,
}

// ─── FeatureBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct FeatureBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> FeatureBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TrainingExample, FeatureBatch<B>> for FeatureBatcher<B> {
    fn batch(&self, items: Vec<TrainingExample>) -> FeatureBatch<B> {
        let batch_size = items.len();
        let (rows, features) = items
            .first()
            .map(|e| (e.rows, e.features))
            .unwrap_or((0, 0));

        let flat: Vec<f32> = items.iter().flat_map(|e| e.inputs.iter().copied()).collect();
        let inputs = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, rows, features, 1]);

        // A batch is labelled only if every example in it is
        let targets: Option<Vec<f32>> = items.iter().map(|e| e.target).collect();
        let targets = targets.map(|t| Tensor::<B, 1>::from_floats(t.as_slice(), &self.device));

        FeatureBatch { inputs, targets }
    }
}

impl TrainingTensor {
    /// The whole assembled tensor on one device.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        Tensor::<B, 1>::from_floats(self.data.as_slice(), device).reshape(self.shape)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{fixtures, TrainingDataset};
    use burn::backend::NdArray;
    use burn::data::dataset::Dataset;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shape_and_values() {
        let data = fixtures::two_by_three();
        let ds = TrainingDataset::from(&data);
        let items: Vec<TrainingExample> = (0..ds.len()).filter_map(|i| ds.get(i)).collect();

        let device = Default::default();
        let batch: FeatureBatch<TestBackend> = FeatureBatcher::new(device).batch(items);

        assert_eq!(batch.inputs.dims(), [2, 2, 3, 1]);
        let values: Vec<f32> = batch.inputs.into_data().to_vec().unwrap();
        assert_eq!(values, data.tensor.data);

        let targets: Vec<f32> = batch.targets.unwrap().into_data().to_vec().unwrap();
        assert_eq!(targets, vec![1.0, 2.0]);
    }

    #[test]
    fn test_unlabelled_batch_has_no_targets() {
        let mut data = fixtures::two_by_three();
        data.targets = None;
        let ds = TrainingDataset::from(&data);
        let items: Vec<TrainingExample> = (0..ds.len()).filter_map(|i| ds.get(i)).collect();

        let batch: FeatureBatch<TestBackend> = FeatureBatcher::new(Default::default()).batch(items);
        assert!(batch.targets.is_none());
    }

    #[test]
    fn test_full_tensor_conversion() {
        let data = fixtures::two_by_three();
        let device = Default::default();
        let t: Tensor<TestBackend, 4> = data.tensor.to_tensor(&device);
        assert_eq!(t.dims(), [2, 2, 3, 1]);
    }
}
