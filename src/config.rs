use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::Size;

/// Chrome of a block group: everything between its outer bounds and the
/// interior where member steps may rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupGeometry {
    pub padding: f32,
    pub header_height: f32,
    pub boundary_width: f32,
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for GroupGeometry {
    fn default() -> Self {
        Self {
            padding: 20.0,
            header_height: 40.0,
            boundary_width: 4.0,
            min_width: 280.0,
            min_height: 200.0,
        }
    }
}

impl GroupGeometry {
    /// Inset from the outer left/right/bottom edge to the interior.
    pub fn side_inset(&self) -> f32 {
        self.padding + self.boundary_width
    }

    /// Inset from the outer top edge to the interior.
    pub fn top_inset(&self) -> f32 {
        self.header_height + self.padding + self.boundary_width
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between nodes sharing a rank.
    pub node_spacing: f32,
    /// Gap between consecutive ranks.
    pub rank_spacing: f32,
    /// Top-left margin of the laid out canvas.
    pub margin: f32,
    /// Median ordering sweeps per layout.
    pub ordering_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            rank_spacing: 80.0,
            margin: 40.0,
            ordering_passes: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub grid_size: f32,
    /// Distance kept between a pushed element and its pusher.
    pub push_gap: f32,
    /// Minimum separation below which two groups collide.
    pub group_gap: f32,
    pub max_cascade_depth: usize,
    pub default_step_size: Size,
    pub group: GroupGeometry,
    pub layout: LayoutConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            push_gap: 20.0,
            group_gap: 10.0,
            max_cascade_depth: 10,
            default_step_size: Size::new(200.0, 80.0),
            group: GroupGeometry::default(),
            layout: LayoutConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupGeometryFile {
    padding: Option<f32>,
    header_height: Option<f32>,
    boundary_width: Option<f32>,
    min_width: Option<f32>,
    min_height: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    margin: Option<f32>,
    ordering_passes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    grid_size: Option<f32>,
    push_gap: Option<f32>,
    group_gap: Option<f32>,
    max_cascade_depth: Option<usize>,
    step_width: Option<f32>,
    step_height: Option<f32>,
    group: Option<GroupGeometryFile>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<CanvasConfig> {
    let config = CanvasConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 override document and merges it onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<CanvasConfig> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = CanvasConfig::default();

    if let Some(v) = parsed.grid_size {
        if v <= 0.0 {
            anyhow::bail!("gridSize must be positive, got {v}");
        }
        config.grid_size = v;
    }
    if let Some(v) = parsed.push_gap {
        config.push_gap = v.max(0.0);
    }
    if let Some(v) = parsed.group_gap {
        config.group_gap = v.max(0.0);
    }
    if let Some(v) = parsed.max_cascade_depth {
        config.max_cascade_depth = v;
    }
    if let Some(v) = parsed.step_width {
        config.default_step_size.width = v;
    }
    if let Some(v) = parsed.step_height {
        config.default_step_size.height = v;
    }

    if let Some(group) = parsed.group {
        if let Some(v) = group.padding {
            config.group.padding = v;
        }
        if let Some(v) = group.header_height {
            config.group.header_height = v;
        }
        if let Some(v) = group.boundary_width {
            config.group.boundary_width = v;
        }
        if let Some(v) = group.min_width {
            config.group.min_width = v;
        }
        if let Some(v) = group.min_height {
            config.group.min_height = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.rank_spacing {
            config.layout.rank_spacing = v;
        }
        if let Some(v) = layout.margin {
            config.layout.margin = v;
        }
        if let Some(v) = layout.ordering_passes {
            config.layout.ordering_passes = v;
        }
    }

    Ok(config)
}
