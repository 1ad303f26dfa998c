// src/lib.rs

pub mod config;
pub mod disjoint_set;
pub mod error;
pub mod feed;
pub mod geometry;
pub mod inference;
pub mod lane_map;
pub mod pipeline;
pub mod prediction;
pub mod types;
