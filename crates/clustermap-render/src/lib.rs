#![forbid(unsafe_code)]

//! Interactive gene cluster comparison diagrams, rendered against an abstract scene graph.
//!
//! [`ClusterMap`] owns a [`DiagramState`] and keeps a [`SceneBackend`] in sync with it. The
//! bundled [`RetainedScene`] backend keeps elements in memory and serializes them to SVG, which
//! is enough for headless rendering and for driving the pointer gestures in tests.

pub mod edit;
pub mod geometry;
pub mod groups;
pub mod interaction;
pub mod overlays;
pub mod plot;
pub mod retained;
pub mod scales;
pub mod scene;
pub mod state;
pub mod svg;

pub use edit::{Prompter, ScriptedPrompter};
pub use groups::{Group, LinkFilter, compute_groups, filter_best_links};
pub use plot::{ClusterMap, build_scene};
pub use retained::{RetainedScene, SceneNode};
pub use scales::ScaleRegistry;
pub use scene::{
    ElementKey, ElementKind, ElementSpec, JoinSummary, PointerEvent, PointerEventKind,
    SceneBackend, SceneBatch, Transition,
};
pub use state::DiagramState;
pub use svg::{SvgRenderOptions, render_scene_svg};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] clustermap_core::Error),
    #[error("unknown {kind}: {uid}")]
    UnknownEntity { kind: &'static str, uid: String },
    #[error("invalid {what}: {message}")]
    InvalidValue { what: &'static str, message: String },
}

impl Error {
    pub(crate) fn unknown(kind: &'static str, uid: impl ToString) -> Self {
        Self::UnknownEntity {
            kind,
            uid: uid.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
