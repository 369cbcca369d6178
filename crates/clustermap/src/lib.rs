#![forbid(unsafe_code)]

//! `clustermap` draws interactive gene cluster comparison diagrams without a browser.
//!
//! Clusters are rows of loci, loci carry genes drawn as arrows, and links between genes of
//! adjacent rows are drawn as ribbons shaded by identity. Genes connected through links share a
//! homology group and a colour.
//!
//! # Features
//!
//! - `render`: enable the scale registry, interaction controllers and SVG output
//!   (`clustermap::render`)

pub use clustermap_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use clustermap_render::edit::{Prompter, ScriptedPrompter};
    pub use clustermap_render::groups::{Group, LinkFilter, compute_groups, filter_best_links};
    pub use clustermap_render::retained::RetainedScene;
    pub use clustermap_render::scene::{
        ElementKey, ElementKind, JoinSummary, PointerEvent, PointerEventKind, SceneBackend,
    };
    pub use clustermap_render::svg::SvgRenderOptions;
    pub use clustermap_render::{ClusterMap, DiagramState, ScaleRegistry};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] clustermap_core::Error),
        #[error(transparent)]
        Render(#[from] clustermap_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Converts an arbitrary string into a conservative SVG `id` token, so that several
    /// diagrams can be inlined into one document.
    ///
    /// This helper:
    /// - trims whitespace
    /// - replaces unsupported characters with `-`
    /// - ensures the id starts with an ASCII letter by prefixing `cm-` when needed
    pub fn sanitize_svg_id(raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return "cm-untitled".to_string();
        }

        let mut out = String::with_capacity(raw.len() + 4);
        for ch in raw.chars() {
            let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == ':' || ch == '.';
            out.push(if ok { ch } else { '-' });
        }

        let starts_ok = out.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_ok {
            out.insert_str(0, "cm-");
        }

        while out.contains("--") {
            out = out.replace("--", "-");
        }
        let out = out.trim_matches('-');
        if out.is_empty() || out == "cm" {
            return "cm-untitled".to_string();
        }
        out.to_string()
    }

    /// Loads `data` into a headless diagram and runs one full render pass.
    pub fn load_headless(
        data: clustermap_core::ClusterMapData,
        config: clustermap_core::ClusterMapConfig,
    ) -> Result<ClusterMap<RetainedScene>> {
        config.validate()?;
        let mut map = ClusterMap::headless(config);
        map.load(data)?;
        Ok(map)
    }

    /// Parses a JSON document and renders it to a standalone SVG string.
    pub fn render_svg(
        json: &str,
        config: clustermap_core::ClusterMapConfig,
        svg_options: &SvgRenderOptions,
    ) -> Result<String> {
        let data = clustermap_core::ClusterMapData::from_json(json)?;
        let map = load_headless(data, config)?;
        Ok(map.to_svg_with(svg_options))
    }

}
