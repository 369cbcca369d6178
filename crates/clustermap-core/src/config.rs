//! Diagram configuration.
//!
//! Every option has a default, and overrides arrive as (partial) JSON objects that are deep
//! merged into the current configuration. Keys that do not name a known option are ignored with
//! a warning so that configs written for newer versions still load.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterMapConfig {
    pub plot: PlotConfig,
    pub legend: LegendConfig,
    pub colour_bar: ColourBarConfig,
    pub scale_bar: ScaleBarConfig,
    pub link: LinkConfig,
    pub cluster: ClusterConfig,
    pub locus: LocusConfig,
    pub gene: GeneConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlotConfig {
    /// Duration of animated attribute changes, in milliseconds.
    pub transition_duration: u64,
    /// Pixels per kilobase.
    pub scale_factor: f64,
    pub scale_genes: bool,
    pub font_family: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            transition_duration: 250,
            scale_factor: 15.0,
            scale_genes: true,
            font_family: "system-ui, -apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, \
                          Ubuntu, \"Helvetica Neue\", Oxygen, Cantarell, sans-serif"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegendConfig {
    pub entry_height: f64,
    pub font_size: f64,
    pub show: bool,
    pub margin_left: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            entry_height: 18.0,
            font_size: 14.0,
            show: true,
            margin_left: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColourBarConfig {
    pub font_size: f64,
    pub height: f64,
    pub show: bool,
    pub width: f64,
    pub margin_top: f64,
}

impl Default for ColourBarConfig {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            height: 12.0,
            show: true,
            width: 150.0,
            margin_top: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleBarConfig {
    pub colour: String,
    pub font_size: f64,
    pub height: f64,
    /// Length of the bar in base pairs.
    pub base_pair: i64,
    pub show: bool,
    pub stroke: f64,
    pub margin_top: f64,
}

impl Default for ScaleBarConfig {
    fn default() -> Self {
        Self {
            colour: "black".to_string(),
            font_size: 10.0,
            height: 12.0,
            base_pair: 2500,
            show: true,
            stroke: 1.0,
            margin_top: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkConfig {
    pub show: bool,
    /// Draw a single line between gene midpoints instead of a ribbon.
    pub as_line: bool,
    pub straight: bool,
    /// Links with `identity <= threshold` are not drawn.
    pub threshold: f64,
    pub stroke_width: f64,
    /// Fill links with their group colour instead of the identity greyscale.
    pub group_colour: bool,
    pub best_only: bool,
    pub label: LinkLabelConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            show: true,
            as_line: false,
            straight: false,
            threshold: 0.0,
            stroke_width: 0.5,
            group_colour: false,
            best_only: false,
            label: LinkLabelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkLabelConfig {
    pub show: bool,
    pub font_size: f64,
    pub background: bool,
    /// Fraction of the way from the upper gene to the lower gene.
    pub position: f64,
}

impl Default for LinkLabelConfig {
    fn default() -> Self {
        Self {
            show: false,
            font_size: 10.0,
            background: true,
            position: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterConfig {
    pub name_font_size: f64,
    pub loci_font_size: f64,
    pub hide_locus_coordinates: bool,
    /// Vertical gap between cluster rows.
    pub spacing: f64,
    pub align_labels: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name_font_size: 12.0,
            loci_font_size: 10.0,
            hide_locus_coordinates: false,
            spacing: 40.0,
            align_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocusConfig {
    pub track_bar: TrackBarConfig,
    /// Horizontal gap between loci of the same cluster.
    pub spacing: f64,
}

impl Default for LocusConfig {
    fn default() -> Self {
        Self {
            track_bar: TrackBarConfig::default(),
            spacing: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackBarConfig {
    pub colour: String,
    pub stroke: f64,
}

impl Default for TrackBarConfig {
    fn default() -> Self {
        Self {
            colour: "#111".to_string(),
            stroke: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneConfig {
    pub shape: GeneShape,
    pub label: GeneLabelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneShape {
    pub body_height: f64,
    pub tip_height: f64,
    pub tip_length: f64,
    pub stroke: String,
    pub stroke_width: f64,
}

impl Default for GeneShape {
    fn default() -> Self {
        Self {
            body_height: 12.0,
            tip_height: 5.0,
            tip_length: 12.0,
            stroke: "black".to_string(),
            stroke_width: 1.0,
        }
    }
}

impl GeneShape {
    /// Total glyph height, from the top of the arrow tip to its bottom.
    pub fn bottom(&self) -> f64 {
        self.tip_height * 2.0 + self.body_height
    }

    /// Vertical midpoint of the glyph body.
    pub fn midpoint(&self) -> f64 {
        self.tip_height + self.body_height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl LabelAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPosition {
    #[default]
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneLabelConfig {
    pub anchor: LabelAnchor,
    pub font_size: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    pub position: LabelPosition,
    pub spacing: f64,
    pub show: bool,
    /// Horizontal placement as a fraction of the gene length.
    pub start: f64,
    /// Gene identifier shown when no explicit label is set: `uid`, `name`, or a key of the
    /// gene's `names` map.
    pub name: String,
}

impl Default for GeneLabelConfig {
    fn default() -> Self {
        Self {
            anchor: LabelAnchor::Start,
            font_size: 10.0,
            rotation: 25.0,
            position: LabelPosition::Top,
            spacing: 2.0,
            show: false,
            start: 0.5,
            name: "uid".to_string(),
        }
    }
}

impl ClusterMapConfig {
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut config = Self::default();
        config.merge_value(value)?;
        Ok(config)
    }

    pub fn as_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn get_value(&self, dotted_path: &str) -> Option<Value> {
        let root = self.as_value();
        let mut cur = &root;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur.clone())
    }

    /// Sets a single option, e.g. `set_value("link.threshold", json!(0.3))`.
    pub fn set_value(&mut self, dotted_path: &str, value: Value) -> Result<()> {
        let patch = dotted_path
            .rsplit('.')
            .fold(value, |inner, segment| {
                let mut map = Map::new();
                map.insert(segment.to_string(), inner);
                Value::Object(map)
            });
        self.merge_value(&patch)
    }

    /// Deep merges `incoming` into this config. On error the config is left unchanged.
    pub fn merge_value(&mut self, incoming: &Value) -> Result<()> {
        let mut base = serde_json::to_value(&*self)?;
        merge_known_keys(&mut base, incoming, "");
        let merged: Self = serde_json::from_value(base).map_err(|err| Error::InvalidConfig {
            path: "config".to_string(),
            message: err.to_string(),
        })?;
        merged.validate()?;
        *self = merged;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        positive("plot.scaleFactor", self.plot.scale_factor)?;
        positive("legend.entryHeight", self.legend.entry_height)?;
        non_negative("colourBar.width", self.colour_bar.width)?;
        non_negative("colourBar.height", self.colour_bar.height)?;
        if self.scale_bar.base_pair <= 0 {
            return Err(invalid("scaleBar.basePair", "must be a positive number of base pairs"));
        }
        unit_interval("link.threshold", self.link.threshold)?;
        unit_interval("link.label.position", self.link.label.position)?;
        non_negative("cluster.spacing", self.cluster.spacing)?;
        non_negative("locus.spacing", self.locus.spacing)?;
        non_negative("gene.shape.bodyHeight", self.gene.shape.body_height)?;
        non_negative("gene.shape.tipHeight", self.gene.shape.tip_height)?;
        non_negative("gene.shape.tipLength", self.gene.shape.tip_length)?;
        unit_interval("gene.label.start", self.gene.label.start)?;
        Ok(())
    }
}

fn merge_known_keys(base: &mut Value, incoming: &Value, path: &str) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match base_map.get_mut(key) {
                    Some(base_value) => merge_known_keys(base_value, in_value, &child),
                    None => tracing::warn!(key = %child, "ignoring unknown config option"),
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

fn invalid(path: &str, message: &str) -> Error {
    Error::InvalidConfig {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn positive(path: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(path, "must be a positive number"))
    }
}

fn non_negative(path: &str, v: f64) -> Result<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(path, "must be a non-negative number"))
    }
}

fn unit_interval(path: &str, v: f64) -> Result<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(invalid(path, "must be within [0, 1]"))
    }
}
