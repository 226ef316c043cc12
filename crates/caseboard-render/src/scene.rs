//! Retained scene tree.
//!
//! The board is rendered into a small element tree that serializes to SVG.
//! It is what the display draws and what the exporter copies.

use kurbo::{Affine, Rect};
use std::fmt::Write;

/// Id of the group carrying the camera transform.
pub const VIEWPORT_ID: &str = "viewport";

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// One SVG element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    pub fn with_attr(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Add a class name.
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(index).1)
    }

    pub fn add_class(&mut self, class: &str) {
        match self.attr("class") {
            Some(existing) if existing.split_whitespace().any(|c| c == class) => {}
            Some(existing) => {
                let joined = format!("{existing} {class}");
                self.set_attr("class", joined);
            }
            None => self.set_attr("class", class),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text()),
            }
        }
        out
    }

    /// Depth-first search by `id` attribute.
    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.children().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) => e.find_mut(id),
            Node::Text(_) => None,
        })
    }

    /// Every descendant (including self) carrying `class`.
    pub fn find_all_by_class<'a>(&'a self, class: &str, out: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            out.push(self);
        }
        for child in self.children() {
            child.find_all_by_class(class, out);
        }
    }

    /// Serialize as SVG markup.
    pub fn write_svg(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape_xml(value));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(e) => e.write_svg(out),
                Node::Text(t) => out.push_str(&escape_xml(t)),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        self.write_svg(&mut out);
        out
    }
}

/// Escape text for use in XML content and attribute values.
pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// SVG `transform` attribute value for an affine map.
pub fn transform_attr(transform: Affine) -> String {
    let [a, b, c, d, e, f] = transform.as_coeffs();
    format!("matrix({a} {b} {c} {d} {e} {f})")
}

/// A rendered board: the root group plus the region its content occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub root: Element,
    /// Extent of the content in canvas units, ignoring the camera.
    pub bounds: Rect,
}

impl Scene {
    pub fn new(root: Element, bounds: Rect) -> Self {
        Self { root, bounds }
    }

    /// Region the scene occupies, floored to `min` on each axis.
    pub fn measure(&self, min: kurbo::Size) -> Rect {
        let b = self.bounds;
        Rect::from_origin_size(
            b.origin(),
            (b.width().max(min.width), b.height().max(min.height)),
        )
    }

    /// Copy of the tree with the camera transform removed, i.e. the
    /// untransformed 100% view.
    pub fn detached_copy(&self) -> Element {
        let mut copy = self.root.clone();
        if let Some(viewport) = copy.find_mut(VIEWPORT_ID) {
            viewport.remove_attr("transform");
        }
        copy
    }
}

/// Wrap `content` in an `<svg>` sized to `view` with an inline style block.
pub fn svg_document(content: &Element, view: Rect, style_block: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"{x} {y} {w} {h}\">",
        w = view.width(),
        h = view.height(),
        x = view.x0,
        y = view.y0,
    );
    if !style_block.is_empty() {
        // Serialized as CDATA, like an inlined <style> element.
        let _ = write!(out, "<style><![CDATA[{style_block}]]></style>");
    }
    content.write_svg(&mut out);
    out.push_str("</svg>");
    out
}
