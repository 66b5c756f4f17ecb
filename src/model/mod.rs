//! Typed views (DTOs) over the generic attribute maps of the `ejb3` resources.

pub mod pool;

pub use pool::*;
