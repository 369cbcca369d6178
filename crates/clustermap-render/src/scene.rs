//! Scene-graph contract between the render loop and whatever keeps the visual elements.
//!
//! The render loop never reads elements back; it describes the complete set of elements of one
//! [`ElementKind`] per [`SceneBackend::join`] and patches single elements for drag feedback.

use crate::svg::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Cluster,
    ClusterInfo,
    ClusterName,
    LocusText,
    Locus,
    TrackBar,
    LocusHover,
    LeftHandle,
    RightHandle,
    Gene,
    GeneLabel,
    Link,
    LinkLabel,
    Legend,
    LegendEntry,
    LegendMarker,
    LegendLabel,
    ScaleBar,
    ScaleBarLine,
    ScaleBarText,
    ColourBar,
    ColourBarGradient,
    ColourBarStop,
    ColourBarRect,
    ColourBarText,
}

impl ElementKind {
    /// SVG element name.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Cluster
            | Self::ClusterInfo
            | Self::Locus
            | Self::Legend
            | Self::LegendEntry
            | Self::ScaleBar
            | Self::ColourBar => "g",
            Self::ClusterName
            | Self::LocusText
            | Self::GeneLabel
            | Self::LinkLabel
            | Self::LegendLabel
            | Self::ScaleBarText
            | Self::ColourBarText => "text",
            Self::TrackBar => "line",
            Self::LocusHover | Self::LeftHandle | Self::RightHandle | Self::ColourBarRect => "rect",
            Self::Gene => "polygon",
            Self::Link | Self::ScaleBarLine => "path",
            Self::LegendMarker => "circle",
            Self::ColourBarGradient => "linearGradient",
            Self::ColourBarStop => "stop",
        }
    }

    /// CSS class written on every element of this kind.
    pub fn class(self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::ClusterInfo => "clusterInfo",
            Self::ClusterName => "clusterText",
            Self::LocusText => "locusText",
            Self::Locus => "locus",
            Self::TrackBar => "trackBar",
            Self::LocusHover => "hover",
            Self::LeftHandle => "leftHandle",
            Self::RightHandle => "rightHandle",
            Self::Gene => "genePolygon",
            Self::GeneLabel => "geneLabel",
            Self::Link => "geneLink",
            Self::LinkLabel => "linkLabel",
            Self::Legend => "legend",
            Self::LegendEntry => "legendEntry",
            Self::LegendMarker => "legendMarker",
            Self::LegendLabel => "legendText",
            Self::ScaleBar => "scaleBar",
            Self::ScaleBarLine => "scaleBarLine",
            Self::ScaleBarText => "scaleBarText",
            Self::ColourBar => "colourBar",
            Self::ColourBarGradient => "colourBarGradient",
            Self::ColourBarStop => "colourBarStop",
            Self::ColourBarRect => "colourBarRect",
            Self::ColourBarText => "colourBarText",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    pub kind: ElementKind,
    pub uid: String,
}

impl ElementKey {
    pub fn new(kind: ElementKind, uid: impl Into<String>) -> Self {
        Self {
            kind,
            uid: uid.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    Click,
    DoubleClick,
    ContextMenu,
    Enter,
    Leave,
}

/// Pointer input delivered by the host, in the pixel space of the target's parent element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: u32,
    pub kind: PointerEventKind,
    pub target: ElementKey,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, target: ElementKey, x: f64, y: f64) -> Self {
        Self {
            pointer_id: 0,
            kind,
            target,
            x,
            y,
        }
    }

    pub fn with_pointer(mut self, pointer_id: u32) -> Self {
        self.pointer_id = pointer_id;
        self
    }
}

/// One element as the render loop wants it to be.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    pub key: ElementKey,
    pub parent: Option<ElementKey>,
    pub attrs: IndexMap<&'static str, String>,
    pub text: Option<String>,
    /// Pointer events the element forwards to [`crate::ClusterMap::dispatch`].
    pub events: Vec<PointerEventKind>,
}

impl ElementSpec {
    pub fn new(kind: ElementKind, uid: impl Into<String>) -> Self {
        Self {
            key: ElementKey::new(kind, uid),
            parent: None,
            attrs: IndexMap::new(),
            text: None,
            events: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: ElementKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.insert(name, value.into());
        self
    }

    /// Numeric attribute, formatted the way every geometry attribute is.
    pub fn num(self, name: &'static str, value: f64) -> Self {
        self.attr(name, fmt(value))
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn on(mut self, events: &[PointerEventKind]) -> Self {
        self.events.extend_from_slice(events);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinSummary {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

/// Element specs grouped by kind, in join order.
#[derive(Debug, Clone, Default)]
pub struct SceneBatch {
    layers: IndexMap<ElementKind, Vec<ElementSpec>>,
}

impl SceneBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind so that it is joined (and emptied) even when nothing gets pushed.
    pub fn declare(&mut self, kind: ElementKind) {
        self.layers.entry(kind).or_default();
    }

    pub fn push(&mut self, spec: ElementSpec) {
        self.layers.entry(spec.key.kind).or_default().push(spec);
    }

    pub fn get(&self, kind: ElementKind) -> &[ElementSpec] {
        self.layers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_layers(self) -> impl Iterator<Item = (ElementKind, Vec<ElementSpec>)> {
        self.layers.into_iter()
    }
}

pub trait SceneBackend {
    /// Reconciles every element of `kind` against `elements`: missing ones are created, existing
    /// ones updated, and the rest removed together with their descendants.
    fn join(
        &mut self,
        kind: ElementKind,
        elements: Vec<ElementSpec>,
        transition: Option<Transition>,
    ) -> JoinSummary;

    /// Updates attributes of one existing element. Returns `false` if there is no such element.
    fn patch(
        &mut self,
        key: &ElementKey,
        attrs: &[(&'static str, String)],
        transition: Option<Transition>,
    ) -> bool;
}
