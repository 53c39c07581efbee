//! src/transforms/vision/mod.rs
//!
//! Frame-level operations used by the sequence datasets.
//!
//! ```text
//! transforms/vision/
//! ├── io.rs          → Frame loading (TurboJPEG fast path, `image` fallback)
//! ├── conversion.rs  → Channel depth normalization and frame size checks
//! ├── geometric.rs   → Consistent crop + flip across a frame sequence
//! └── motion.rs      → Motion gating of sampled windows
//! ```
//!
//! A frame loader is typically assembled as:
//!
//! ```ignore
//! use crate::transforms::Transform;
//! use crate::transforms::vision::{EnsureDepth, LoadFrame};
//!
//! let loader = LoadFrame::new().then(EnsureDepth::rgb());
//! let frame = loader.apply(path)?;
//! ```

pub mod conversion;
pub mod geometric;
pub mod io;
pub mod motion;

pub use conversion::{EnsureDepth, EnsureSize, FrameDepth};
pub use geometric::{CropSpec, SpatialTransform};
pub use io::LoadFrame;
pub use motion::{MotionFilter, MIN_L2_DIFF_PER_FRAME};
