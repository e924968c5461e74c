pub mod cascade;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod encoding;
pub mod error;
pub mod projection;

pub use cascade::{upscale_samples, Cascade, VolumeExtent};
pub use config::{CullingMask, DebugSettings, GiSettings, GridConfig};
pub use dispatch::DispatchSize;
pub use encoding::CoarseCombine;
pub use error::VoxcastError;
pub use projection::{ProjectionDevice, TrackedLight};
