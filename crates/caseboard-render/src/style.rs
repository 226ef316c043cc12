//! Stylesheets and visual constants.

use caseboard_core::SerializableColor;
use peniko::Color;
use thiserror::Error;

/// Where a stylesheet was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOrigin {
    /// Built in or served by the board's own origin.
    SameOrigin,
    /// Linked from another origin; its rules cannot be read.
    CrossOrigin(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("Rules of stylesheet from {0} are not readable")]
    CrossOrigin(String),
}

/// A stylesheet affecting the rendered board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    origin: StyleOrigin,
    rules: Vec<String>,
}

impl StyleSheet {
    pub fn same_origin(rules: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            origin: StyleOrigin::SameOrigin,
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cross_origin(href: impl Into<String>) -> Self {
        Self {
            origin: StyleOrigin::CrossOrigin(href.into()),
            rules: Vec::new(),
        }
    }

    pub fn origin(&self) -> &StyleOrigin {
        &self.origin
    }

    /// The sheet's rules, if they may be read.
    pub fn rules(&self) -> Result<&[String], StyleError> {
        match &self.origin {
            StyleOrigin::SameOrigin => Ok(&self.rules),
            StyleOrigin::CrossOrigin(href) => Err(StyleError::CrossOrigin(href.clone())),
        }
    }
}

/// Join the readable rules of `sheets` into one style block.
///
/// Unreadable sheets are skipped.
pub fn inline_rules(sheets: &[StyleSheet]) -> String {
    let mut block = String::new();
    for sheet in sheets {
        match sheet.rules() {
            Ok(rules) => {
                for rule in rules {
                    block.push_str(rule);
                    block.push('\n');
                }
            }
            Err(e) => log::warn!("skipping stylesheet: {e}"),
        }
    }
    block
}

/// Colors and type used when building a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub node_fill: Color,
    pub node_stroke: Color,
    pub text_color: Color,
    pub edge_color: Color,
    pub selection_color: Color,
    /// Outline of valid connection targets while drafting.
    pub target_color: Color,
    pub font_family: String,
    pub font_size: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            node_fill: Color::WHITE,
            node_stroke: Color::from_rgba8(203, 213, 225, 255),
            text_color: Color::from_rgba8(30, 41, 59, 255),
            edge_color: Color::from_rgba8(100, 116, 139, 255),
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            target_color: Color::from_rgba8(34, 197, 94, 255),
            font_family: "sans-serif".to_string(),
            font_size: 13.0,
        }
    }
}

impl RenderStyle {
    pub fn with_edge_color(mut self, color: Color) -> Self {
        self.edge_color = color;
        self
    }

    /// The board's own stylesheet.
    pub fn stylesheet(&self) -> StyleSheet {
        let hex = |c: Color| SerializableColor::from(c).to_hex();
        StyleSheet::same_origin([
            format!(
                ".node-body {{ fill: {}; stroke: {}; stroke-width: 1; }}",
                hex(self.node_fill),
                hex(self.node_stroke)
            ),
            format!(
                ".node-title, .edge-label {{ fill: {}; font-family: {}; font-size: {}px; }}",
                hex(self.text_color),
                self.font_family,
                self.font_size
            ),
            format!(
                ".selected .node-body, .dragging .node-body {{ stroke: {}; stroke-width: 2; }}",
                hex(self.selection_color)
            ),
            ".dragging { opacity: 0.85; }".to_string(),
            format!(
                ".draft-source .node-body {{ stroke: {}; stroke-width: 2; }}",
                hex(self.selection_color)
            ),
            format!(
                ".draft-target .node-body {{ stroke: {}; stroke-dasharray: 6 3; stroke-width: 2; }}",
                hex(self.target_color)
            ),
            ".edge-hit { stroke: transparent; fill: none; }".to_string(),
            format!(".edge-line {{ stroke: {}; fill: none; }}", hex(self.edge_color)),
            format!(".edge-arrow {{ fill: {}; }}", hex(self.edge_color)),
        ])
    }
}
