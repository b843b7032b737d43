pub mod encode;
pub mod frame;
pub mod modulation;
pub mod raw;
pub mod wave;

pub use encode::{encode_grating, encode_sweep};
pub use frame::FramePainter;
pub use modulation::ResolvedModulation;
pub use raw::convert_raw;
pub use wave::{DriftGeometry, Projection, carrier, drift_geometry, frame_count};
