// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Traversal of parsed trees.
//!
//! [`Visitor::visit_node`] matches every [`Node`] variant exhaustively, so a
//! new variant cannot be added without deciding how each visitor treats it.
//! Per-variant methods default to visiting children (composite nodes) or
//! doing nothing (leaves); a visitor overrides only what it renders.

use chrono::{FixedOffset, Offset, Utc};

use crate::node::{FormattingKind, MentionKind, Node};
use crate::timestamp::TimestampStyle;

/// Configuration shared by the plaintext and HTML renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Offset timestamps are shown in. Defaults to UTC.
    ///
    /// Rendering never consults the local clock or time zone, so the same
    /// input always renders the same way.
    pub utc_offset: FixedOffset,

    /// Whether a message made only of emoji renders them large (HTML only).
    pub jumbo_emoji: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
            jumbo_emoji: true,
        }
    }
}

/// A single pass over a node sequence, producing [`Visitor::Output`].
pub trait Visitor {
    /// What the pass produces.
    type Output;

    /// Consumes the visitor once every node has been visited.
    fn finish(self) -> Self::Output;

    /// Literal text.
    fn visit_text(&mut self, _value: &str) {}

    /// Inline formatting. Visits children by default.
    fn visit_formatting(&mut self, _kind: FormattingKind, children: &[Node]) {
        self.visit_nodes(children);
    }

    /// A heading. Visits children by default.
    fn visit_heading(&mut self, _level: u8, children: &[Node]) {
        self.visit_nodes(children);
    }

    /// A list. Visits each item's nodes in order by default.
    fn visit_list(&mut self, _ordered: bool, items: &[Vec<Node>]) {
        for item in items {
            self.visit_nodes(item);
        }
    }

    /// A block quote. Visits children by default.
    fn visit_quote(&mut self, children: &[Node]) {
        self.visit_nodes(children);
    }

    /// Inline or fenced code.
    fn visit_code(&mut self, _language: Option<&str>, _content: &str, _multiline: bool) {}

    /// A link. Visits the label of a masked link by default.
    fn visit_link(&mut self, _url: &str, label: Option<&[Node]>) {
        if let Some(label) = label {
            self.visit_nodes(label);
        }
    }

    /// A mention.
    fn visit_mention(&mut self, _kind: MentionKind, _id: Option<u64>) {}

    /// A custom or standard emoji.
    fn visit_emoji(&mut self, _name: &str, _id: Option<u64>, _animated: bool) {}

    /// A timestamp.
    fn visit_timestamp(&mut self, _epoch_seconds: Option<i64>, _style: TimestampStyle) {}

    /// Dispatches `node` to its per-variant method.
    fn visit_node(&mut self, node: &Node) {
        match node {
            Node::Text { value } => self.visit_text(value),
            Node::Formatting { kind, children } => self.visit_formatting(*kind, children),
            Node::Heading { level, children } => self.visit_heading(*level, children),
            Node::List { ordered, items } => self.visit_list(*ordered, items),
            Node::Quote { children } => self.visit_quote(children),
            Node::CodeBlock {
                language,
                content,
                multiline,
            } => self.visit_code(language.as_deref(), content, *multiline),
            Node::Link { url, label } => self.visit_link(url, label.as_deref()),
            Node::Mention { kind, id } => self.visit_mention(*kind, *id),
            Node::Emoji { name, id, animated } => self.visit_emoji(name, *id, *animated),
            Node::Timestamp {
                epoch_seconds,
                style,
            } => self.visit_timestamp(*epoch_seconds, *style),
        }
    }

    /// Visits `nodes` in order.
    fn visit_nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.visit_node(node);
        }
    }
}

/// Runs `visitor` over `nodes` and returns its output.
pub fn render<V: Visitor>(nodes: &[Node], mut visitor: V) -> V::Output {
    visitor.visit_nodes(nodes);
    visitor.finish()
}
