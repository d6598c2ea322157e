use serde::{Deserialize, Serialize};
use std::fmt;

use crate::changes::Changeset;
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::geometry::{Point, Rect, Size};

/// Behaviour tag of a step. Trigger variants keep their full tag so they
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepType {
    Start,
    Llm,
    Tool,
    Condition,
    Switch,
    Map,
    Join,
    Subflow,
    Loop,
    Wait,
    Function,
    Router,
    HumanInLoop,
    Filter,
    Split,
    Aggregate,
    Error,
    Note,
    Trigger(String),
    Other(String),
}

impl StepType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "start" => Self::Start,
            "llm" => Self::Llm,
            "tool" => Self::Tool,
            "condition" => Self::Condition,
            "switch" => Self::Switch,
            "map" => Self::Map,
            "join" => Self::Join,
            "subflow" => Self::Subflow,
            "loop" => Self::Loop,
            "wait" => Self::Wait,
            "function" => Self::Function,
            "router" => Self::Router,
            "human_in_loop" => Self::HumanInLoop,
            "filter" => Self::Filter,
            "split" => Self::Split,
            "aggregate" => Self::Aggregate,
            "error" => Self::Error,
            "note" => Self::Note,
            other if other.starts_with("trigger") => Self::Trigger(other.to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Llm => "llm",
            Self::Tool => "tool",
            Self::Condition => "condition",
            Self::Switch => "switch",
            Self::Map => "map",
            Self::Join => "join",
            Self::Subflow => "subflow",
            Self::Loop => "loop",
            Self::Wait => "wait",
            Self::Function => "function",
            Self::Router => "router",
            Self::HumanInLoop => "human_in_loop",
            Self::Filter => "filter",
            Self::Split => "split",
            Self::Aggregate => "aggregate",
            Self::Error => "error",
            Self::Note => "note",
            Self::Trigger(tag) | Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for StepType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for StepType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// Drop region of a group a member rests in. Groups expose a single body zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    #[default]
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Parallel,
    TryCatch,
    Foreach,
    While,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub config: serde_json::Value,
    pub position_x: f32,
    pub position_y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub block_group_id: Option<String>,
    #[serde(default)]
    pub group_role: Option<GroupRole>,
}

impl Step {
    pub fn new(id: impl Into<String>, step_type: StepType, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            step_type,
            config: serde_json::Value::Null,
            position_x: x,
            position_y: y,
            width: None,
            height: None,
            block_group_id: None,
            group_role: None,
        }
    }

    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.block_group_id = Some(group_id.into());
        self.group_role = Some(GroupRole::Body);
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.position_x, self.position_y)
    }

    pub fn size(&self, config: &CanvasConfig) -> Size {
        Size::new(
            self.width.unwrap_or(config.default_step_size.width),
            self.height.unwrap_or(config.default_step_size.height),
        )
    }

    pub fn rect(&self, config: &CanvasConfig) -> Rect {
        Rect::from_parts(self.position(), self.size(config))
    }
}

/// One end of an edge: either a step or a whole group, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Step(String),
    Group(String),
}

impl Endpoint {
    pub fn id(&self) -> &str {
        match self {
            Self::Step(id) | Self::Group(id) => id,
        }
    }

    pub fn is_step(&self, step_id: &str) -> bool {
        matches!(self, Self::Step(id) if id == step_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: Endpoint,
    pub target: Endpoint,
    #[serde(default)]
    pub source_port: Option<String>,
    #[serde(default)]
    pub target_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: Endpoint, target: Endpoint) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            source_port: None,
            target_port: None,
            condition: None,
        }
    }

    pub fn steps(id: impl Into<String>, from: &str, to: &str) -> Self {
        Self::new(id, Endpoint::Step(from.to_string()), Endpoint::Step(to.to_string()))
    }

    pub fn from_port(mut self, port: impl Into<String>) -> Self {
        self.source_port = Some(port.into());
        self
    }

    pub fn touches_step(&self, step_id: &str) -> bool {
        self.source.is_step(step_id) || self.target.is_step(step_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGroup {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GroupKind,
    pub position_x: f32,
    pub position_y: f32,
    pub width: f32,
    pub height: f32,
}

impl BlockGroup {
    pub fn new(id: impl Into<String>, kind: GroupKind, rect: Rect) -> Self {
        Self {
            id: id.into(),
            kind,
            position_x: rect.x,
            position_y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position_x, self.position_y, self.width, self.height)
    }
}

/// A workflow definition as fetched from the backend. Group order is the
/// z-order: the last group is drawn on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub groups: Vec<BlockGroup>,
}

impl Workflow {
    pub fn from_json(input: &str) -> Result<Self, CanvasError> {
        serde_json::from_str(input).map_err(|err| CanvasError::InvalidDocument(err.to_string()))
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&BlockGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn members<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a Step> + 'a {
        self.steps
            .iter()
            .filter(move |step| step.block_group_id.as_deref() == Some(group_id))
    }

    /// Every membership must point at an existing group.
    pub fn validate(&self) -> Result<(), CanvasError> {
        for step in &self.steps {
            if let Some(group_id) = &step.block_group_id {
                if self.group(group_id).is_none() {
                    return Err(CanvasError::DanglingMembership {
                        step_id: step.id.clone(),
                        group_id: group_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies a changeset to this local copy of the workflow.
    pub fn apply(&mut self, changes: &Changeset) {
        for step in &mut self.steps {
            let Some(update) = changes.steps.get(&step.id) else {
                continue;
            };
            step.position_x = update.position.x;
            step.position_y = update.position.y;
            step.group_role = update.parent_group_id.as_ref().map(|_| GroupRole::Body);
            step.block_group_id = update.parent_group_id.clone();
        }
        for group in &mut self.groups {
            let Some(update) = changes.groups.get(&group.id) else {
                continue;
            };
            group.position_x = update.position.x;
            group.position_y = update.position.y;
            group.width = update.size.width;
            group.height = update.size.height;
        }
        if !changes.deleted_edges.is_empty() {
            self.edges
                .retain(|edge| !changes.deleted_edges.contains(&edge.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_type_round_trips_through_tags() {
        for tag in ["llm", "human_in_loop", "trigger_webhook", "custom_block"] {
            let parsed = StepType::from_tag(tag);
            assert_eq!(parsed.as_tag(), tag);
        }
        assert!(matches!(
            StepType::from_tag("trigger_schedule"),
            StepType::Trigger(_)
        ));
        assert!(matches!(StepType::from_tag("webhook"), StepType::Other(_)));
    }

    #[test]
    fn parses_backend_document() {
        let doc = r#"{
            "steps": [
                {"id": "a", "type": "start", "position_x": 0, "position_y": 0},
                {"id": "b", "type": "switch", "config": {"cases": [{"id": "x"}]},
                 "position_x": 40, "position_y": 60, "block_group_id": "g", "group_role": "body"}
            ],
            "edges": [
                {"id": "e1", "source": {"step": "a"}, "target": {"group": "g"}, "source_port": "out"}
            ],
            "groups": [
                {"id": "g", "type": "try_catch", "position_x": 0, "position_y": 0, "width": 400, "height": 300}
            ]
        }"#;
        let workflow = Workflow::from_json(doc).unwrap();
        assert_eq!(workflow.steps[1].group_role, Some(GroupRole::Body));
        assert_eq!(workflow.groups[0].kind, GroupKind::TryCatch);
        assert_eq!(workflow.edges[0].target, Endpoint::Group("g".into()));
        assert_eq!(workflow.members("g").count(), 1);
        assert!(workflow.validate().is_ok());
    }

    #[test]
    fn validate_reports_dangling_membership() {
        let workflow = Workflow {
            steps: vec![Step::new("a", StepType::Tool, 0.0, 0.0).in_group("missing")],
            ..Workflow::default()
        };
        assert_eq!(
            workflow.validate(),
            Err(CanvasError::DanglingMembership {
                step_id: "a".into(),
                group_id: "missing".into()
            })
        );
    }

    #[test]
    fn malformed_document_is_reported() {
        assert!(matches!(
            Workflow::from_json("{\"steps\": 3}"),
            Err(CanvasError::InvalidDocument(_))
        ));
    }
}
