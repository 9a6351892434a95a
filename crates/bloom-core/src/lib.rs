//! Core types, geometry and trait definitions for the Bloom phenology store.
//!
//! This crate is free of HTTP and database dependencies. The polygon
//! pipeline (distance, hull generation, per-site clustering) and the
//! read-side monthly reduction live here; storage backends and the LLM
//! client implement the traits in [`store`] and [`assistant`].

pub mod assistant;
pub mod cluster;
pub mod error;
pub mod geometry;
pub mod model;
pub mod monthly;
pub mod polygon;
pub mod store;
pub mod view;

pub use error::{Error, Result};
