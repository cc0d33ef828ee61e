//! Mapframe - palette-indexed map-art frames
//!
//! Converts images and extracted video frames into frames of original
//! palette indices for a fixed-palette renderer, written as SMRF containers
//! or nested JSON arrays. This library exposes modules for integration testing.

pub mod error;
pub mod models;
pub mod services;
