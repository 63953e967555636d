//! Curates a directory of raw training images: perceptual-hash
//! deduplication, FFT blur detection, and entropy-based low-contrast and
//! outlier filtering. Flagged images are moved aside, never deleted.

pub mod config;
pub mod core;
pub mod session;

pub use crate::config::FilterConfig;
pub use crate::core::FilterError;
pub use crate::core::pipeline::{Filter, Pipeline};
pub use crate::core::report::{Pass, PassReport};
pub use crate::session::Session;
