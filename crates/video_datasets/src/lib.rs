pub mod archive;
pub mod config;
pub mod dataset;
pub mod minibatch;
pub mod readers;
pub mod sampler;
pub mod scheduler;
pub mod sequence;
pub mod transforms;

pub use config::SequenceDatasetConfig;
pub use dataset::{ClipDataset, Dataset, FrameSequenceDataset};
pub use minibatch::SequenceBatch;
