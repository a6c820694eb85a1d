//! Library entry for integration tests & the demo binary.

pub mod orchard;
pub mod demo;
