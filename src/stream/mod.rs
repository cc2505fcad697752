//! Stream combinators for UI-facing updates

mod latest;

pub use latest::{Latest, LatestExt};
