// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `features` and `assemble`, and
// their flags. Each argument struct converts into the matching
// application-layer config, so Layer 2 never sees clap types.

use clap::{Args, Subcommand, ValueEnum};

use excerpt_features::application::assemble_use_case::AssembleConfig;
use excerpt_features::application::feature_use_case::FeatureTableConfig;
use excerpt_features::data::assembler::{AggregateConfig, AssemblyConfig, QuantileConfig};
use excerpt_features::data::projection::ProjectionConfig;
use excerpt_features::data::resample::ResampleConfig;
use excerpt_features::features::raw::RawFeatureConfig;
use excerpt_features::features::word_vectors::VectorSummary;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build one scalar feature row per document and write a CSV table
    Features(FeaturesArgs),

    /// Assemble the (example, row, feature, 1) training tensor
    Assemble(AssembleArgs),
}

/// Shared input flags.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Annotated corpus: a JSON Lines file or a directory of JSON files
    #[arg(long, default_value = "data/corpus.jsonl")]
    pub corpus: String,

    /// Word frequency table, a JSON object {word: count}
    #[arg(long)]
    pub freq: Option<String>,

    /// Targets, a JSON array of {id, target, standard_error}
    #[arg(long)]
    pub targets: Option<String>,

    /// Custom raw → canonical tag map (JSON object); replaces the default
    #[arg(long)]
    pub tag_map: Option<String>,

    /// Fixed raw tag vocabulary (JSON array), e.g. the `.tags.json` file
    /// a training run wrote; tags outside it get no column
    #[arg(long)]
    pub tag_vocab: Option<String>,

    /// Leave out part-of-speech tag features
    #[arg(long)]
    pub no_tags: bool,

    /// Seed for every random draw; omitted means a fresh seed per run
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorMode {
    /// Per-dimension quantiles plus fraction of positive values
    Quantiles,
    /// Per-dimension means of equal-frequency buckets
    BucketMeans,
}

/// All arguments for the `features` command.
#[derive(Args, Debug)]
pub struct FeaturesArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output CSV path
    #[arg(long, default_value = "artifacts/features.csv")]
    pub output: String,

    /// Numerator of the commonality score freq_norm / count
    #[arg(long, default_value_t = 1e5)]
    pub freq_norm: f64,

    /// Add word-vector summaries
    #[arg(long, value_enum)]
    pub vectors: Option<VectorMode>,

    /// Percentiles for `--vectors quantiles`
    #[arg(long, value_delimiter = ',', default_value = "20,80")]
    pub percentiles: Vec<u32>,

    /// Bucket count for `--vectors bucket-means`
    #[arg(long, default_value_t = 3)]
    pub nq: usize,

    /// Expected entity labels, comma separated; enables entity features
    #[arg(long, value_delimiter = ',')]
    pub entity_labels: Option<Vec<String>>,

    /// Noisy target replicates per document
    #[arg(long, default_value_t = 1)]
    pub n_rep: usize,
}

impl From<FeaturesArgs> for FeatureTableConfig {
    fn from(a: FeaturesArgs) -> Self {
        let word_vectors = a.vectors.map(|mode| match mode {
            VectorMode::Quantiles => VectorSummary::QuantileValues {
                percentiles: a.percentiles.clone(),
            },
            VectorMode::BucketMeans => VectorSummary::QuantileMeans { nq: a.nq },
        });

        FeatureTableConfig {
            corpus: a.input.corpus,
            frequency_table: a.input.freq,
            targets: a.input.targets,
            output: a.output,
            projection: ProjectionConfig {
                freq_norm: a.freq_norm,
            },
            word_vectors,
            tag_features: !a.input.no_tags,
            tag_map: a.input.tag_map,
            tag_vocabulary: a.input.tag_vocab,
            entity_labels: a.entity_labels,
            n_rep: a.n_rep,
            seed: a.input.seed,
        }
    }
}

/// All arguments for the `assemble` command.
#[derive(Args, Debug)]
pub struct AssembleArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory for schema, config, tensor and side tables
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Artifact directory of a training run; its column schema is enforced
    #[arg(long)]
    pub schema_from: Option<String>,

    /// Columns removed before the tensor is built
    #[arg(long, value_delimiter = ',', default_value = "seq,word,alpha")]
    pub drop_cols: Vec<String>,

    /// Remove punctuation rows
    #[arg(long)]
    pub rem_punct: bool,

    /// Remove stopword rows shorter than --min-stop-len
    #[arg(long)]
    pub rem_stop: bool,

    /// Normalised length below which stopword rows are removed
    #[arg(long, default_value_t = 0.3)]
    pub min_stop_len: f64,

    /// Rows per resample group
    #[arg(long, default_value_t = 100)]
    pub n_row: usize,

    /// Resample groups per document
    #[arg(long, default_value_t = 10)]
    pub n_rep: usize,

    /// Keep every document whole (all documents must have equal length)
    #[arg(long)]
    pub no_resample: bool,

    /// Column whose group deviation drives the target noise
    #[arg(long, default_value = "length")]
    pub tgt_noise_var: String,

    /// Multiplier of the target noise
    #[arg(long, default_value_t = 2.0)]
    pub tgt_noise_mult: f64,

    /// Divisor of token character length
    #[arg(long, default_value_t = 20.0)]
    pub len_norm: f64,

    /// Divisor of embedding components
    #[arg(long, default_value_t = 10.0)]
    pub vec_norm: f64,

    /// Expected embedding dimensionality
    #[arg(long)]
    pub embedding_dim: Option<usize>,

    /// Commonality numerator; smallest count of the frequency table if omitted
    #[arg(long)]
    pub freq_norm: Option<f64>,

    /// Commonality of content words missing from the frequency table
    #[arg(long, default_value_t = 0.5)]
    pub unknown_comm_score: f64,

    /// Write the per-document aggregate table
    #[arg(long)]
    pub aggregates: bool,

    /// Write per-document quantile tables for these columns
    #[arg(long, value_delimiter = ',')]
    pub quantile_cols: Option<Vec<String>>,
}

impl From<AssembleArgs> for AssembleConfig {
    fn from(a: AssembleArgs) -> Self {
        let resample = (!a.no_resample).then_some(ResampleConfig {
            n_row: a.n_row,
            n_rep: a.n_rep,
        });

        AssembleConfig {
            corpus: a.input.corpus,
            frequency_table: a.input.freq,
            targets: a.input.targets,
            artifacts_dir: a.artifacts_dir,
            schema_from: a.schema_from,
            tag_columns: !a.input.no_tags,
            tag_map: a.input.tag_map,
            tag_vocabulary: a.input.tag_vocab,
            raw: RawFeatureConfig {
                len_norm: a.len_norm,
                vec_norm: a.vec_norm,
                embedding_dim: a.embedding_dim,
                freq_norm: a.freq_norm,
                unknown_comm_score: a.unknown_comm_score,
            },
            assembly: AssemblyConfig {
                drop_cols: a.drop_cols,
                rem_punct: a.rem_punct,
                rem_stop: a.rem_stop,
                min_stop_len: a.min_stop_len,
                resample,
                tgt_noise_var: a.tgt_noise_var,
                tgt_noise_mult: a.tgt_noise_mult,
                seed: a.input.seed,
                aggregates: a.aggregates.then(AggregateConfig::default),
                quantiles: a.quantile_cols.map(|columns| QuantileConfig {
                    columns,
                    ..QuantileConfig::default()
                }),
            },
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn test_assemble_defaults_match_config_defaults() {
        let Commands::Assemble(args) = parse(&["excerpt-features", "assemble"]) else {
            panic!("expected assemble");
        };
        let cfg: AssembleConfig = args.into();
        assert_eq!(cfg.assembly, AssemblyConfig::default());
        assert!(cfg.tag_columns);
        assert_eq!(cfg.raw.len_norm, 20.0);
        assert_eq!(cfg.raw.unknown_comm_score, RawFeatureConfig::default().unknown_comm_score);
        assert_eq!(cfg.tag_vocabulary, None);
    }

    #[test]
    fn test_assemble_commonality_flags() {
        let Commands::Assemble(args) = parse(&[
            "excerpt-features",
            "assemble",
            "--freq-norm",
            "12",
            "--unknown-comm-score",
            "0.9",
            "--tag-vocab",
            "run/tag_vocabulary.json",
        ]) else {
            panic!("expected assemble");
        };
        let cfg: AssembleConfig = args.into();
        assert_eq!(cfg.raw.freq_norm, Some(12.0));
        assert_eq!(cfg.raw.unknown_comm_score, 0.9);
        assert_eq!(cfg.tag_vocabulary.as_deref(), Some("run/tag_vocabulary.json"));
    }

    #[test]
    fn test_assemble_flags() {
        let Commands::Assemble(args) = parse(&[
            "excerpt-features",
            "assemble",
            "--no-resample",
            "--rem-stop",
            "--seed",
            "3",
            "--drop-cols",
            "seq,word",
            "--quantile-cols",
            "length",
        ]) else {
            panic!("expected assemble");
        };
        let cfg: AssembleConfig = args.into();
        assert_eq!(cfg.assembly.resample, None);
        assert!(cfg.assembly.rem_stop);
        assert_eq!(cfg.assembly.seed, Some(3));
        assert_eq!(cfg.assembly.drop_cols, vec!["seq", "word"]);
        assert_eq!(cfg.assembly.quantiles.unwrap().columns, vec!["length"]);
    }

    #[test]
    fn test_features_vector_modes() {
        let Commands::Features(args) = parse(&["excerpt-features", "features", "--vectors", "bucket-means", "--nq", "4"])
        else {
            panic!("expected features");
        };
        let cfg: FeatureTableConfig = args.into();
        assert_eq!(cfg.word_vectors, Some(VectorSummary::QuantileMeans { nq: 4 }));
        assert_eq!(cfg.tag_vocabulary, None);

        let Commands::Features(args) = parse(&["excerpt-features", "features", "--tag-vocab", "train.tags.json"]) else {
            panic!("expected features");
        };
        let cfg: FeatureTableConfig = args.into();
        assert_eq!(cfg.tag_vocabulary.as_deref(), Some("train.tags.json"));

        let Commands::Features(args) = parse(&["excerpt-features", "features", "--vectors", "quantiles"]) else {
            panic!("expected features");
        };
        let cfg: FeatureTableConfig = args.into();
        assert_eq!(cfg.word_vectors, Some(VectorSummary::default()));
        assert_eq!(cfg.projection.freq_norm, 1e5);
    }
}
