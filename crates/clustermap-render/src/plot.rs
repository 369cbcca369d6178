//! The interactive diagram: owns the state, keeps a [`SceneBackend`] in sync with it and routes
//! pointer input to the drag controllers and edit prompts.

use crate::edit::{self, Prompter};
use crate::geometry::{link_label_position, link_path, locus_text, points_attr};
use crate::interaction::{
    self, ClusterReorder, Gesture, HandleSide, Interaction, LocusReposition, LocusResize,
    ResizeStep, SlotSwap,
};
use crate::overlays;
use crate::retained::RetainedScene;
use crate::scene::{
    ElementKey, ElementKind, ElementSpec, JoinSummary, PointerEvent, PointerEventKind,
    SceneBackend, SceneBatch, Transition,
};
use crate::state::DiagramState;
use crate::svg::{SvgRenderOptions, fmt, render_scene_svg};
use crate::{Error, Result};
use clustermap_core::{Bp, ClusterMapConfig, ClusterMapData, Diagram};
use indexmap::IndexMap;
use serde_json::{Value, json};

const HANDLE_WIDTH: f64 = 8.0;
const HOVER_FILL: &str = "rgba(0, 0, 0, 0.4)";

type AttrPatch = (ElementKey, Vec<(&'static str, String)>);

pub struct ClusterMap<B: SceneBackend> {
    state: DiagramState,
    backend: B,
    interaction: Interaction,
    prompter: Option<Box<dyn Prompter + Send>>,
}

impl<B: SceneBackend> ClusterMap<B> {
    pub fn new(backend: B, config: ClusterMapConfig) -> Self {
        Self {
            state: DiagramState::new(Diagram::default(), config),
            backend,
            interaction: Interaction::default(),
            prompter: None,
        }
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + Send + 'static) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    /// Swaps the prompter, returning the previous one.
    pub fn set_prompter(
        &mut self,
        prompter: Option<Box<dyn Prompter + Send>>,
    ) -> Option<Box<dyn Prompter + Send>> {
        std::mem::replace(&mut self.prompter, prompter)
    }

    pub fn state(&self) -> &DiagramState {
        &self.state
    }

    pub fn config(&self) -> &ClusterMapConfig {
        &self.state.config
    }

    pub fn diagram(&self) -> &Diagram {
        &self.state.diagram
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn is_dragging(&self) -> bool {
        self.interaction.is_dragging()
    }

    /// Replaces the diagram wholesale. Scales, groups and link opacities start over.
    pub fn load(&mut self, data: ClusterMapData) -> Result<JoinSummary> {
        let diagram = Diagram::from_data(data)?;
        let config = self.state.config.clone();
        self.state = DiagramState::new(diagram, config);
        self.interaction.clear();
        Ok(self.update())
    }

    /// Replaces the entities but keeps layout, groups and opacities of uids that survive.
    pub fn set_data(&mut self, data: ClusterMapData) -> Result<JoinSummary> {
        let diagram = Diagram::from_data(data)?;
        self.state.replace_diagram(diagram);
        self.interaction.clear();
        Ok(self.update())
    }

    /// Refreshes scales and groups, then reconciles every element kind with the backend.
    pub fn update(&mut self) -> JoinSummary {
        self.state.refresh();
        let transition = self.transition();
        let mut total = JoinSummary::default();
        for (kind, elements) in build_scene(&self.state).into_layers() {
            let summary = self.backend.join(kind, elements, transition);
            total.entered += summary.entered;
            total.updated += summary.updated;
            total.exited += summary.exited;
        }
        tracing::debug!(
            entered = total.entered,
            updated = total.updated,
            exited = total.exited,
            "updated scene"
        );
        total
    }

    fn render_only(&mut self, kinds: &[ElementKind]) {
        let transition = self.transition();
        for (kind, elements) in build_scene(&self.state).into_layers() {
            if kinds.contains(&kind) {
                self.backend.join(kind, elements, transition);
            }
        }
    }

    fn transition(&self) -> Option<Transition> {
        let duration_ms = self.state.config.plot.transition_duration;
        (duration_ms > 0).then_some(Transition { duration_ms })
    }

    /// Deep merges a partial config and re-renders. Invalid values leave the config unchanged.
    pub fn update_config(&mut self, patch: &Value) -> Result<JoinSummary> {
        self.state.config.merge_value(patch)?;
        Ok(self.update())
    }

    pub fn set_config_value(&mut self, dotted_path: &str, value: Value) -> Result<JoinSummary> {
        self.state.config.set_value(dotted_path, value)?;
        Ok(self.update())
    }

    /// Zooms to `px_per_kb` pixels per kilobase, keeping user offsets in place.
    pub fn set_scale_factor(&mut self, px_per_kb: f64) -> Result<JoinSummary> {
        self.set_config_value("plot.scaleFactor", json!(px_per_kb))
    }

    pub fn rename_group(&mut self, uid: usize, label: &str) -> Result<()> {
        let group = self
            .state
            .group_mut(uid)
            .ok_or_else(|| Error::unknown("group", uid))?;
        group.label = label.to_string();
        self.state.scales.apply_groups(&self.state.groups);
        self.render_only(&[ElementKind::LegendLabel]);
        Ok(())
    }

    pub fn rename_cluster(&mut self, uid: &str, name: &str) -> Result<()> {
        let cluster = self
            .state
            .diagram
            .cluster_mut(uid)
            .ok_or_else(|| Error::unknown("cluster", uid))?;
        cluster.name = name.to_string();
        self.render_only(&[ElementKind::ClusterName]);
        Ok(())
    }

    pub fn set_gene_label(&mut self, uid: &str, label: &str) -> Result<()> {
        let gene = self
            .state
            .diagram
            .gene_mut(uid)
            .ok_or_else(|| Error::unknown("gene", uid))?;
        gene.label = Some(label.to_string());
        self.render_only(&[ElementKind::GeneLabel]);
        Ok(())
    }

    pub fn set_group_hidden(&mut self, uid: usize, hidden: bool) -> Result<()> {
        let group = self
            .state
            .group_mut(uid)
            .ok_or_else(|| Error::unknown("group", uid))?;
        group.hidden = hidden;
        self.update();
        Ok(())
    }

    pub fn set_group_colour(&mut self, uid: usize, colour: &str) -> Result<()> {
        let colour = edit::parse_colour(colour.trim()).ok_or_else(|| Error::InvalidValue {
            what: "colour",
            message: format!("{colour:?} is not a colour"),
        })?;
        let group = self
            .state
            .group_mut(uid)
            .ok_or_else(|| Error::unknown("group", uid))?;
        group.colour = colour;
        self.update();
        Ok(())
    }

    pub fn set_link_opacity(&mut self, uid: &str, opacity: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(Error::InvalidValue {
                what: "opacity",
                message: format!("{opacity} is outside [0, 1]"),
            });
        }
        if !self.state.diagram.links().iter().any(|link| link.uid == uid) {
            return Err(Error::unknown("link", uid));
        }
        self.state.link_opacity.insert(uid.to_string(), opacity);
        self.patch_links();
        Ok(())
    }

    pub fn set_scale_bar_length(&mut self, base_pair: i64) -> Result<()> {
        if base_pair <= 0 {
            return Err(Error::InvalidValue {
                what: "scale bar length",
                message: format!("{base_pair} is not a positive number of base pairs"),
            });
        }
        self.set_config_value("scaleBar.basePair", json!(base_pair))?;
        Ok(())
    }

    /// Aligns the clicked gene's homologues under it. Returns the shift applied per cluster.
    pub fn anchor_on_gene(&mut self, uid: &str) -> Result<IndexMap<String, f64>> {
        if self.state.diagram.gene(uid).is_none() {
            return Err(Error::unknown("gene", uid));
        }
        let shifts = interaction::anchor_on_gene(&mut self.state, uid);
        self.update();
        Ok(shifts)
    }

    pub fn flip_locus(&mut self, uid: &str) -> Result<()> {
        if !interaction::flip_locus(&mut self.state, uid) {
            return Err(Error::unknown("locus", uid));
        }
        self.update();
        Ok(())
    }

    /// Undoes every flip, trim and horizontal offset.
    pub fn reset_display(&mut self) -> JoinSummary {
        self.state.diagram.reset_display();
        self.state.scales.cluster_offset.retain(|_, _| false);
        self.state.scales.locus_offset.retain(|_, _| false);
        self.update()
    }

    /// Handles one pointer event. Returns `true` if it changed anything or started a gesture.
    ///
    /// Move and up events belong to whatever gesture their pointer started, regardless of the
    /// element under the pointer.
    pub fn dispatch(&mut self, event: PointerEvent) -> bool {
        use PointerEventKind as K;

        match event.kind {
            K::Move => return self.drag_move(event.pointer_id, event.x, event.y),
            K::Up => return self.drag_end(event.pointer_id),
            _ => {}
        }

        let pointer_id = event.pointer_id;
        let uid = event.target.uid.as_str();
        match (event.target.kind, event.kind) {
            (ElementKind::ClusterInfo, K::Down) => {
                let gesture =
                    ClusterReorder::start(&self.state, uid, event.y).map(Gesture::Reorder);
                self.begin(pointer_id, gesture)
            }
            (ElementKind::LocusHover, K::Down) => {
                let gesture =
                    LocusReposition::start(&self.state, uid, event.x).map(Gesture::Reposition);
                self.begin(pointer_id, gesture)
            }
            (ElementKind::LeftHandle, K::Down) => {
                let gesture =
                    LocusResize::start(&self.state, uid, HandleSide::Left).map(Gesture::Resize);
                self.begin(pointer_id, gesture)
            }
            (ElementKind::RightHandle, K::Down) => {
                let gesture =
                    LocusResize::start(&self.state, uid, HandleSide::Right).map(Gesture::Resize);
                self.begin(pointer_id, gesture)
            }
            (ElementKind::Locus, K::DoubleClick) => self.flip_locus(uid).is_ok(),
            (ElementKind::Locus, K::Enter) => self.hover(uid, true),
            (ElementKind::Locus, K::Leave) => self.hover(uid, false),
            (ElementKind::Gene, K::Click) => self.anchor_on_gene(uid).is_ok(),
            (ElementKind::Gene, K::ContextMenu) => self.prompt_gene_label(uid),
            (ElementKind::ClusterName, K::Click) => self.prompt_cluster_name(uid),
            (ElementKind::LegendLabel, K::Click) => self.prompt_group_label(uid),
            (ElementKind::LegendLabel, K::ContextMenu) => uid
                .parse::<usize>()
                .is_ok_and(|group| self.set_group_hidden(group, true).is_ok()),
            (ElementKind::LegendMarker, K::Click) => self.prompt_group_colour(uid),
            (ElementKind::Link, K::Click) => self.prompt_link_opacity(uid),
            (ElementKind::ScaleBarText, K::Click) => self.prompt_scale_bar_length(),
            (kind, event_kind) => {
                tracing::debug!(?kind, uid, ?event_kind, "ignored pointer event");
                false
            }
        }
    }

    fn begin(&mut self, pointer_id: u32, gesture: Option<Gesture>) -> bool {
        match gesture {
            Some(gesture) => {
                self.interaction.begin(pointer_id, gesture);
                true
            }
            None => false,
        }
    }

    fn drag_move(&mut self, pointer_id: u32, x: f64, y: f64) -> bool {
        let Some(gesture) = self.interaction.get_mut(pointer_id) else {
            return false;
        };
        match gesture {
            Gesture::Reorder(reorder) => {
                let swap = reorder.drag(&mut self.state, y);
                let cluster = reorder.cluster.clone();
                self.patch_reorder(&cluster, swap);
            }
            Gesture::Reposition(reposition) => {
                let value = reposition.drag(&mut self.state, x);
                let locus = reposition.locus.clone();
                self.patch_reposition(&locus, value);
            }
            Gesture::Resize(resize) => {
                let Some(step) = resize.drag(&mut self.state, x) else {
                    return false;
                };
                let locus = resize.locus.clone();
                let cluster = resize.cluster.clone();
                self.patch_resize(&locus, &cluster, step);
            }
        }
        true
    }

    fn drag_end(&mut self, pointer_id: u32) -> bool {
        let Some(gesture) = self.interaction.finish(pointer_id) else {
            return false;
        };
        match gesture {
            Gesture::Reorder(reorder) => reorder.end(&mut self.state),
            Gesture::Reposition(reposition) => reposition.end(&mut self.state),
            Gesture::Resize(resize) => resize.end(&mut self.state),
        }
        self.update();
        true
    }

    fn hover(&mut self, locus: &str, on: bool) -> bool {
        if self.interaction.is_dragging() {
            return false;
        }
        let opacity = if on { "1" } else { "0" }.to_string();
        let mut any = false;
        for kind in [
            ElementKind::LocusHover,
            ElementKind::LeftHandle,
            ElementKind::RightHandle,
        ] {
            any |= self.backend.patch(
                &ElementKey::new(kind, locus),
                &[("opacity", opacity.clone())],
                None,
            );
        }
        any
    }

    fn apply(&mut self, patches: Vec<AttrPatch>, transition: Option<Transition>) {
        for (key, attrs) in patches {
            self.backend.patch(&key, &attrs, transition);
        }
    }

    fn patch_links(&mut self) {
        let patches = link_patches(&self.state);
        self.apply(patches, None);
    }

    fn patch_labels_and_legend(&mut self) {
        let placement = self.state.placement();
        let mut patches: Vec<AttrPatch> = self
            .state
            .diagram
            .clusters()
            .map(|cluster| {
                (
                    ElementKey::new(ElementKind::ClusterInfo, cluster.uid.clone()),
                    vec![(
                        "transform",
                        format!("translate({}, 0)", fmt(placement.cluster_info_x(&cluster.uid))),
                    )],
                )
            })
            .collect();
        if let Some(key) = overlays::overlay_key(ElementKind::Legend) {
            patches.push((
                key,
                vec![("transform", overlays::legend_transform(&self.state))],
            ));
        }
        self.apply(patches, None);
    }

    fn patch_reorder(&mut self, cluster: &str, swap: Option<SlotSwap>) {
        let y = self
            .state
            .live
            .cluster_y
            .get(cluster)
            .copied()
            .unwrap_or_else(|| *self.state.scales.cluster_order.get(cluster));
        let patch = (
            ElementKey::new(ElementKind::Cluster, cluster),
            vec![("transform", cluster_transform(&self.state, cluster, y))],
        );
        self.apply(vec![patch], None);
        if let Some(swap) = swap {
            let patch = (
                ElementKey::new(ElementKind::Cluster, swap.displaced.clone()),
                vec![(
                    "transform",
                    cluster_transform(&self.state, &swap.displaced, swap.y),
                )],
            );
            let transition = self.transition();
            self.apply(vec![patch], transition);
        }
        self.patch_links();
    }

    fn patch_reposition(&mut self, locus: &str, value: f64) {
        let patch = (
            ElementKey::new(ElementKind::Locus, locus),
            vec![("transform", format!("translate({}, 0)", fmt(value)))],
        );
        self.apply(vec![patch], None);
        self.patch_links();
        self.patch_labels_and_legend();
    }

    fn patch_resize(&mut self, locus_uid: &str, cluster: &str, step: ResizeStep) {
        let x = |bp: Bp| self.state.scales.x(bp as f64);
        let (start, end) = (x(step.visible_start), x(step.visible_end));
        let key = |kind| ElementKey::new(kind, locus_uid);
        let mut patches: Vec<AttrPatch> = vec![
            (
                key(ElementKind::LeftHandle),
                vec![("x", fmt(start - HANDLE_WIDTH))],
            ),
            (key(ElementKind::RightHandle), vec![("x", fmt(end))]),
            (
                key(ElementKind::LocusHover),
                vec![("x", fmt(start)), ("width", fmt(end - start))],
            ),
            (
                key(ElementKind::TrackBar),
                vec![("x1", fmt(start)), ("x2", fmt(end))],
            ),
        ];
        let label_show = self.state.config.gene.label.show;
        if let Some(locus) = self.state.diagram.locus(locus_uid) {
            for gene in self.state.diagram.genes_of(locus) {
                let display = display_attr(gene.display.visible);
                patches.push((
                    ElementKey::new(ElementKind::Gene, gene.uid.clone()),
                    vec![("display", display.to_string())],
                ));
                patches.push((
                    ElementKey::new(ElementKind::GeneLabel, gene.uid.clone()),
                    vec![("display", display_attr(label_show && gene.display.visible).to_string())],
                ));
            }
        }
        if step.cluster_shift != 0.0 {
            let y = *self.state.scales.cluster_order.get(cluster);
            patches.push((
                ElementKey::new(ElementKind::Cluster, cluster),
                vec![("transform", cluster_transform(&self.state, cluster, y))],
            ));
        }
        self.apply(patches, None);
        self.patch_links();
        self.patch_labels_and_legend();
    }

    fn ask<T>(
        &mut self,
        message: &str,
        default: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let prompter = self.prompter.as_deref_mut()?;
        edit::prompt_until(prompter, message, default, parse)
    }

    fn prompt_group_label(&mut self, uid: &str) -> bool {
        let Ok(group) = uid.parse::<usize>() else {
            return false;
        };
        let Some(current) = self.state.group(group).map(|g| g.label.clone()) else {
            return false;
        };
        self.ask(edit::RENAME_PROMPT, &current, edit::parse_label)
            .is_some_and(|label| self.rename_group(group, &label).is_ok())
    }

    fn prompt_group_colour(&mut self, uid: &str) -> bool {
        let Ok(group) = uid.parse::<usize>() else {
            return false;
        };
        let Some(current) = self.state.group(group).map(|g| g.colour.clone()) else {
            return false;
        };
        self.ask(edit::COLOUR_PROMPT, &current, edit::parse_colour)
            .is_some_and(|colour| self.set_group_colour(group, &colour).is_ok())
    }

    fn prompt_cluster_name(&mut self, uid: &str) -> bool {
        let Some(current) = self.state.diagram.cluster(uid).map(|c| c.name.clone()) else {
            return false;
        };
        self.ask(edit::RENAME_PROMPT, &current, edit::parse_label)
            .is_some_and(|name| self.rename_cluster(uid, &name).is_ok())
    }

    fn prompt_gene_label(&mut self, uid: &str) -> bool {
        let name_key = self.state.config.gene.label.name.clone();
        let Some(current) = self
            .state
            .diagram
            .gene(uid)
            .map(|g| g.label_text(&name_key).to_string())
        else {
            return false;
        };
        self.ask(edit::RENAME_PROMPT, &current, edit::parse_label)
            .is_some_and(|label| self.set_gene_label(uid, &label).is_ok())
    }

    fn prompt_link_opacity(&mut self, uid: &str) -> bool {
        let current = self.state.link_opacity.get(uid).copied().unwrap_or(1.0);
        self.ask(edit::OPACITY_PROMPT, &fmt(current), edit::parse_opacity)
            .is_some_and(|opacity| self.set_link_opacity(uid, opacity).is_ok())
    }

    fn prompt_scale_bar_length(&mut self) -> bool {
        let current = self.state.config.scale_bar.base_pair.to_string();
        self.ask(edit::BASE_PAIR_PROMPT, &current, edit::parse_base_pair)
            .is_some_and(|bp| self.set_scale_bar_length(bp).is_ok())
    }

    /// `[min_x, min_y, width, height]` of everything drawn, with text extents estimated from
    /// font sizes.
    pub fn content_bounds(&self) -> [f64; 4] {
        let state = &self.state;
        let config = &state.config;
        let (min, max) = state
            .placement()
            .global_extent(&[])
            .unwrap_or((0.0, 0.0));

        let info_width = state
            .diagram
            .clusters()
            .map(|cluster| {
                let name = text_width(&cluster.name, config.cluster.name_font_size);
                let loci = text_width(
                    &locus_text(
                        &state.diagram,
                        cluster,
                        config.cluster.hide_locus_coordinates,
                    ),
                    config.cluster.loci_font_size,
                );
                name.max(loci)
            })
            .fold(0.0, f64::max);
        let left = min - 10.0 - info_width;

        let mut right = max;
        let mut bottom = overlays::diagram_bottom(state);
        let bar_x = state.scales.x(config.scale_bar.base_pair as f64);
        if config.legend.show {
            let groups = state.legend_groups();
            let label = groups
                .iter()
                .map(|g| text_width(&g.label, config.legend.font_size))
                .fold(0.0, f64::max);
            right = right.max(max + config.legend.margin_left + config.legend.entry_height + label);
            bottom = bottom.max(config.legend.entry_height * groups.len() as f64);
        }
        if config.scale_bar.show {
            right = right.max(bar_x);
            bottom = bottom.max(
                overlays::diagram_bottom(state)
                    + config.scale_bar.margin_top
                    + config.scale_bar.height
                    + 5.0
                    + config.scale_bar.font_size * 1.5,
            );
        }
        if config.colour_bar.show {
            right = right.max(bar_x + 20.0 + config.colour_bar.width);
            bottom = bottom.max(
                overlays::diagram_bottom(state)
                    + config.colour_bar.margin_top
                    + config.colour_bar.height
                    + 5.0
                    + config.colour_bar.font_size * 1.5,
            );
        }
        let top = if config.gene.label.show {
            -(config.gene.label.spacing + config.gene.label.font_size * 3.0)
        } else {
            0.0
        };
        [left, top, right - left, bottom - top]
    }
}

impl ClusterMap<RetainedScene> {
    pub fn headless(config: ClusterMapConfig) -> Self {
        Self::new(RetainedScene::new(), config)
    }

    pub fn scene(&self) -> &RetainedScene {
        &self.backend
    }

    pub fn to_svg(&self) -> String {
        self.to_svg_with(&SvgRenderOptions::default())
    }

    /// Serializes the current scene. The viewBox defaults to [`Self::content_bounds`].
    pub fn to_svg_with(&self, options: &SvgRenderOptions) -> String {
        let mut options = options.clone();
        if options.viewbox.is_none() {
            options.viewbox = Some(self.content_bounds());
        }
        if options.font_family.is_none() {
            options.font_family = Some(self.state.config.plot.font_family.clone());
        }
        render_scene_svg(&self.backend, &options)
    }
}

fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.6
}

fn display_attr(visible: bool) -> &'static str {
    if visible { "inline" } else { "none" }
}

fn cluster_transform(state: &DiagramState, cluster: &str, y: f64) -> String {
    format!(
        "translate({}, {})",
        fmt(*state.scales.cluster_offset.get(cluster)),
        fmt(y)
    )
}

/// Live `d`/`opacity` of every joined link (and label position), read with drag transforms.
fn link_patches(state: &DiagramState) -> Vec<AttrPatch> {
    let placement = state.placement();
    let config = &state.config.link;
    let mut patches = Vec::new();
    for link in state.visible_links() {
        let anchors = placement.link_anchors(&link.query, &link.target, false);
        let opacity = fmt(state.link_opacity(link));
        let d = anchors
            .as_ref()
            .map(|a| link_path(a, config))
            .unwrap_or_default();
        patches.push((
            ElementKey::new(ElementKind::Link, link.uid.clone()),
            vec![("d", d), ("opacity", opacity.clone())],
        ));
        if config.label.show {
            let position = anchors
                .map(|a| link_label_position(&a, config.label.position))
                .unwrap_or(crate::geometry::Point::new(0.0, 0.0));
            patches.push((
                ElementKey::new(ElementKind::LinkLabel, link.uid.clone()),
                vec![
                    ("x", fmt(position.x)),
                    ("y", fmt(position.y)),
                    ("opacity", opacity),
                ],
            ));
        }
    }
    patches
}

/// Every element of the diagram, by kind. Links come first so they are drawn under the genes.
pub fn build_scene(state: &DiagramState) -> SceneBatch {
    let mut batch = SceneBatch::new();
    links(state, &mut batch);
    clusters(state, &mut batch);
    overlays::legend(state, &mut batch);
    overlays::scale_bar(state, &mut batch);
    overlays::colour_bar(state, &mut batch);
    batch
}

fn links(state: &DiagramState, batch: &mut SceneBatch) {
    batch.declare(ElementKind::Link);
    batch.declare(ElementKind::LinkLabel);
    let placement = state.placement();
    let config = &state.config.link;
    for link in state.visible_links() {
        let anchors = placement.link_anchors(&link.query, &link.target, true);
        let colour = if config.group_colour {
            state.scales.group_colour(&link.query).to_string()
        } else {
            state.scales.score.colour(link.identity)
        };
        let opacity = state.link_opacity(link);
        let d = anchors
            .as_ref()
            .map(|a| link_path(a, config))
            .unwrap_or_default();
        let (fill, stroke) = if config.as_line {
            ("none".to_string(), colour)
        } else {
            (colour, "black".to_string())
        };
        batch.push(
            ElementSpec::new(ElementKind::Link, link.uid.clone())
                .attr("d", d)
                .attr("fill", fill)
                .attr("stroke", stroke)
                .num("stroke-width", config.stroke_width)
                .num("opacity", opacity)
                .attr("cursor", "pointer")
                .on(&[PointerEventKind::Click]),
        );
        if config.label.show {
            let position = anchors
                .map(|a| link_label_position(&a, config.label.position))
                .unwrap_or(crate::geometry::Point::new(0.0, 0.0));
            let mut label = ElementSpec::new(ElementKind::LinkLabel, link.uid.clone())
                .num("x", position.x)
                .num("y", position.y)
                .attr("text-anchor", "middle")
                .attr("dominant-baseline", "middle")
                .attr("font-size", format!("{}px", fmt(config.label.font_size)))
                .num("opacity", opacity)
                .text(format!("{:.2}", link.identity));
            if config.label.background {
                label = label
                    .attr("paint-order", "stroke")
                    .attr("stroke", "white")
                    .attr("stroke-width", "3px");
            }
            batch.push(label);
        }
    }
}

fn clusters(state: &DiagramState, batch: &mut SceneBatch) {
    for kind in [
        ElementKind::Cluster,
        ElementKind::ClusterInfo,
        ElementKind::ClusterName,
        ElementKind::LocusText,
        ElementKind::Locus,
        ElementKind::TrackBar,
        ElementKind::LocusHover,
        ElementKind::LeftHandle,
        ElementKind::RightHandle,
        ElementKind::Gene,
        ElementKind::GeneLabel,
    ] {
        batch.declare(kind);
    }

    let placement = state.placement();
    let config = &state.config;
    let shape = &config.gene.shape;
    let label = &config.gene.label;
    let bottom = shape.bottom();
    let midpoint = shape.midpoint();
    let x = |bp: Bp| state.scales.x(bp as f64);

    for cluster in state.diagram.clusters_by_slot() {
        let y = *state.scales.cluster_order.get(cluster.uid.as_str());
        let root = ElementSpec::new(ElementKind::Cluster, cluster.uid.clone())
            .attr("transform", cluster_transform(state, &cluster.uid, y));
        let root_key = root.key.clone();
        batch.push(root);

        let info = ElementSpec::new(ElementKind::ClusterInfo, cluster.uid.clone())
            .parent(root_key.clone())
            .attr(
                "transform",
                format!("translate({}, 0)", fmt(placement.cluster_info_x(&cluster.uid))),
            )
            .attr("cursor", "grab")
            .on(&[
                PointerEventKind::Down,
                PointerEventKind::Move,
                PointerEventKind::Up,
            ]);
        let info_key = info.key.clone();
        batch.push(info);
        batch.push(
            ElementSpec::new(ElementKind::ClusterName, cluster.uid.clone())
                .parent(info_key.clone())
                .num("y", midpoint)
                .attr("text-anchor", "end")
                .attr("font-size", format!("{}px", fmt(config.cluster.name_font_size)))
                .attr("font-weight", "bold")
                .attr("cursor", "pointer")
                .text(cluster.name.clone())
                .on(&[PointerEventKind::Click]),
        );
        batch.push(
            ElementSpec::new(ElementKind::LocusText, cluster.uid.clone())
                .parent(info_key)
                .num("y", midpoint)
                .attr("text-anchor", "end")
                .attr("dominant-baseline", "hanging")
                .attr("font-size", format!("{}px", fmt(config.cluster.loci_font_size)))
                .text(locus_text(
                    &state.diagram,
                    cluster,
                    config.cluster.hide_locus_coordinates,
                )),
        );

        for locus in state.diagram.loci_of(cluster) {
            let offset = *state.scales.locus_offset.get(locus.uid.as_str());
            let (start, end) = (
                x(locus.display.visible_start),
                x(locus.display.visible_end),
            );
            let group = ElementSpec::new(ElementKind::Locus, locus.uid.clone())
                .parent(root_key.clone())
                .attr("transform", format!("translate({}, 0)", fmt(offset)))
                .on(&[
                    PointerEventKind::DoubleClick,
                    PointerEventKind::Enter,
                    PointerEventKind::Leave,
                ]);
            let locus_key = group.key.clone();
            batch.push(group);

            batch.push(
                ElementSpec::new(ElementKind::TrackBar, locus.uid.clone())
                    .parent(locus_key.clone())
                    .num("x1", start)
                    .num("x2", end)
                    .num("y1", midpoint)
                    .num("y2", midpoint)
                    .attr("stroke", config.locus.track_bar.colour.clone())
                    .num("stroke-width", config.locus.track_bar.stroke),
            );
            let drag = [
                PointerEventKind::Down,
                PointerEventKind::Move,
                PointerEventKind::Up,
            ];
            batch.push(
                ElementSpec::new(ElementKind::LocusHover, locus.uid.clone())
                    .parent(locus_key.clone())
                    .num("x", start)
                    .num("y", 0.0)
                    .num("width", end - start)
                    .num("height", bottom)
                    .attr("fill", HOVER_FILL)
                    .attr("opacity", "0")
                    .attr("cursor", "move")
                    .on(&drag),
            );
            for (kind, handle_x) in [
                (ElementKind::LeftHandle, start - HANDLE_WIDTH),
                (ElementKind::RightHandle, end),
            ] {
                batch.push(
                    ElementSpec::new(kind, locus.uid.clone())
                        .parent(locus_key.clone())
                        .num("x", handle_x)
                        .num("y", 0.0)
                        .num("width", HANDLE_WIDTH)
                        .num("height", bottom)
                        .attr("fill", HOVER_FILL)
                        .attr("opacity", "0")
                        .attr("cursor", "ew-resize")
                        .on(&drag),
                );
            }

            for gene in state.diagram.genes_of(locus) {
                batch.push(
                    ElementSpec::new(ElementKind::Gene, gene.uid.clone())
                        .parent(locus_key.clone())
                        .attr("points", points_attr(&placement.gene_points(gene)))
                        .attr("fill", state.gene_fill(&gene.uid))
                        .attr("stroke", shape.stroke.clone())
                        .num("stroke-width", shape.stroke_width)
                        .attr("display", display_attr(gene.display.visible))
                        .attr("cursor", "pointer")
                        .on(&[PointerEventKind::Click, PointerEventKind::ContextMenu]),
                );
                batch.push(
                    ElementSpec::new(ElementKind::GeneLabel, gene.uid.clone())
                        .parent(locus_key.clone())
                        .attr("transform", placement.label_transform(gene).to_string())
                        .attr("text-anchor", label.anchor.as_str())
                        .attr("font-size", format!("{}px", fmt(label.font_size)))
                        .attr(
                            "display",
                            display_attr(label.show && gene.display.visible),
                        )
                        .text(gene.label_text(&label.name).to_string()),
                );
            }
        }
    }
}
