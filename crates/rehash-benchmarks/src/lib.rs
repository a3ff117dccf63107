//! rehash benchmarking suite
//!
//! Benchmarks for dual hashing, object codecs and the rewrite engine.

pub mod common;

pub use common::*;
