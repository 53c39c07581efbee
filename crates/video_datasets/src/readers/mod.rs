pub mod frame_dir;
pub mod serialized;
pub mod splits;

pub use frame_dir::{DatasetCatalog, SequenceRecord};
pub use serialized::{list_clips, ClipLayout, SerializedClipReader};
pub use splits::{read_eval_splits, split_stems};
