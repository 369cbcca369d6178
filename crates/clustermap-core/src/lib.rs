#![forbid(unsafe_code)]

//! Gene cluster comparison diagrams: data model and configuration (headless).
//!
//! This crate owns the input document shape, the uid-indexed entity store with its mutable
//! display state, and the deep-mergeable configuration. Scales, grouping, geometry and the
//! interactive render loop live in `clustermap-render`.

pub mod config;
pub mod error;
pub mod model;

pub use config::ClusterMapConfig;
pub use error::{Error, Result};
pub use model::{
    Bp, Cluster, ClusterInput, ClusterMapData, Diagram, Gene, GeneDisplay, GeneInput, GeneRef,
    GroupInput, Link, LinkInput, Locus, LocusDisplay, LocusInput, Strand,
};
