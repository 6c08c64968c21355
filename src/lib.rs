//! Coreset selection for embedding memory banks.
//!
//! Picks a compact subset of rows that covers the whole matrix under the
//! Euclidean distance, using greedy farthest-point sampling (the 2-approximation
//! of k-center) on an optionally randomly projected copy of the input.
//!
//! ```no_run
//! use coreset::{Coreset, Device};
//!
//! let dim = 512;
//! let vecs: Vec<f32> = (0..dim * 10_000).map(|i| (i % 97) as f32).collect();
//! let coreset = Coreset::new(100, Some(0.9), Device::Host).unwrap();
//! let indices = coreset.select(&vecs, dim).unwrap();
//! assert_eq!(indices.len(), 100);
//! ```

pub mod coreset;
pub mod device;
pub mod distance;
pub mod error;
pub mod projection;
pub mod sampler;
pub mod simd;
pub mod utils;

pub use coreset::{Coreset, select_coreset};
pub use device::{Device, PairwiseDistance};
pub use error::{CoresetError, Result};
pub use sampler::FarthestPointSampler;
