// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Parsing chat markdown into [`Node`] trees.
//!
//! The parser walks the input left to right. At each position it tries the
//! rules of its table in order; the first match produces a node (recursing
//! into the match's inner content for composite constructs) and the cursor
//! jumps past it. When nothing matches, one character is taken as literal
//! text. Adjacent literal characters, and text produced by rules such as
//! escapes, are merged into a single [`Node::Text`].
//!
//! Two limits bound the work done for hostile input:
//!
//! - Input longer than [`ParseOptions::max_length`] characters is not parsed
//!   at all and comes back as one text node.
//! - Content nested deeper than [`ParseOptions::max_depth`] is kept as
//!   literal text instead of being parsed further.
//!
//! # Example
//!
//! ```
//! use chatmark::{FormattingKind, Node, parser};
//!
//! let nodes = parser::parse("**hi**", parser::DEFAULT_MAX_LENGTH);
//! assert_eq!(
//!     nodes,
//!     [Node::formatting(FormattingKind::Bold, vec![Node::text("hi")])]
//! );
//! ```

use std::ops::Range;

use tracing::{debug, trace};

use crate::emoji::EmojiTable;
use crate::matcher::{Cursor, FULL, Hit, MINIMAL, Scans, Shape, Span, Table};
use crate::node::Node;

/// Longest input, in characters, that is parsed as markdown.
pub const DEFAULT_MAX_LENGTH: usize = 4000;

/// Deepest nesting that is parsed; deeper content stays literal text.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Inputs with more characters than this are returned as plain text.
    pub max_length: usize,
    /// Nesting depth beyond which content is not parsed.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A configured markdown parser.
///
/// The parser holds no per-call state; one instance can be shared freely,
/// including across threads.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'e> {
    options: ParseOptions,
    emoji: &'e EmojiTable,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl Parser<'static> {
    /// Creates a parser that resolves `:shortcodes:` with the built-in table.
    #[must_use]
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            emoji: EmojiTable::builtin(),
        }
    }
}

impl<'e> Parser<'e> {
    /// Replaces the shortcode table.
    #[must_use]
    pub fn with_emoji_table<'t>(self, emoji: &'t EmojiTable) -> Parser<'t> {
        Parser {
            options: self.options,
            emoji,
        }
    }

    /// The shortcode table this parser resolves `:codes:` with.
    #[must_use]
    pub const fn emoji_table(&self) -> &'e EmojiTable {
        self.emoji
    }

    /// The limits this parser applies.
    #[must_use]
    pub const fn options(&self) -> ParseOptions {
        self.options
    }

    /// Parses `text` with every rule.
    #[must_use]
    pub fn parse(&self, text: &str) -> Vec<Node> {
        self.parse_with(text, FULL)
    }

    /// Parses `text` recognizing only mentions; everything else is text.
    #[must_use]
    pub fn parse_minimal(&self, text: &str) -> Vec<Node> {
        self.parse_with(text, MINIMAL)
    }

    /// Lazily yields every emoji in `text`, in document order, at any depth.
    ///
    /// Produces the same nodes as walking the full parse, without building
    /// the tree.
    pub fn extract_emojis<'s>(&'s self, text: &'s str) -> Extract<'s> {
        self.extract(text, Target::Emoji)
    }

    /// Lazily yields every link in `text`, in document order, at any depth.
    ///
    /// A masked link is yielded before any links inside its label.
    pub fn extract_links<'s>(&'s self, text: &'s str) -> Extract<'s> {
        self.extract(text, Target::Link)
    }

    fn parse_with(&self, text: &str, table: Table) -> Vec<Node> {
        if !within_limit(text, self.options.max_length) {
            return vec![Node::text(text)];
        }
        self.builder(text).nodes(
            &Span {
                range: 0..text.len(),
                table,
            },
            0,
        )
    }

    const fn builder<'s>(&'s self, src: &'s str) -> Builder<'s> {
        Builder {
            src,
            emoji: self.emoji,
            max_depth: self.options.max_depth,
        }
    }

    fn extract<'s>(&'s self, text: &'s str, target: Target) -> Extract<'s> {
        Extract::start(self.builder(text), target, self.options.max_length)
    }
}

fn within_limit(text: &str, max_length: usize) -> bool {
    // Byte length bounds char count from above, so most inputs skip the count.
    if text.len() <= max_length {
        return true;
    }
    let chars = text.chars().count();
    if chars > max_length {
        debug!(chars, max_length, "input exceeds length limit, not parsing");
        return false;
    }
    true
}

/// Parses `text` with every rule and the default depth limit.
///
/// Input longer than `max_length` characters is returned as a single text
/// node.
#[must_use]
pub fn parse(text: &str, max_length: usize) -> Vec<Node> {
    Parser::new(ParseOptions {
        max_length,
        ..ParseOptions::default()
    })
    .parse(text)
}

/// Parses `text` recognizing only mentions.
#[must_use]
pub fn parse_minimal(text: &str) -> Vec<Node> {
    Parser::default().parse_minimal(text)
}

/// Lazily yields every emoji node in `text`. See [`Parser::extract_emojis`].
pub fn extract_emojis(text: &str) -> impl Iterator<Item = Node> + '_ {
    let builder = Builder {
        src: text,
        emoji: EmojiTable::builtin(),
        max_depth: DEFAULT_MAX_DEPTH,
    };
    Extract::start(builder, Target::Emoji, DEFAULT_MAX_LENGTH)
}

/// Lazily yields every link node in `text`. See [`Parser::extract_links`].
pub fn extract_links(text: &str) -> impl Iterator<Item = Node> + '_ {
    let builder = Builder {
        src: text,
        emoji: EmojiTable::builtin(),
        max_depth: DEFAULT_MAX_DEPTH,
    };
    Extract::start(builder, Target::Link, DEFAULT_MAX_LENGTH)
}

/// Turns spans into nodes, recursing up to the depth limit.
#[derive(Clone, Copy)]
struct Builder<'s> {
    src: &'s str,
    emoji: &'s EmojiTable,
    max_depth: usize,
}

impl<'s> Builder<'s> {
    fn tokens(&self, range: Range<usize>, table: Table) -> Tokens<'s> {
        Tokens {
            src: self.src,
            emoji: self.emoji,
            pos: range.start,
            end: range.end,
            table,
            pending: None,
            scans: Scans::default(),
        }
    }

    fn nodes(&self, span: &Span, depth: usize) -> Vec<Node> {
        if span.range.is_empty() {
            return Vec::new();
        }
        if depth >= self.max_depth {
            trace!(depth, "nesting limit reached, keeping content literal");
            return vec![Node::text(&self.src[span.range.clone()])];
        }
        let mut out = Vec::new();
        for shape in self.tokens(span.range.clone(), span.table) {
            push_merged(&mut out, self.node(shape, depth + 1));
        }
        out
    }

    fn node(&self, shape: Shape, depth: usize) -> Node {
        match shape {
            Shape::Text(value) => Node::Text { value },
            Shape::Formatting { kind, inner } => Node::Formatting {
                kind,
                children: self.nodes(&inner, depth),
            },
            Shape::Heading { level, inner } => Node::Heading {
                level,
                children: self.nodes(&inner, depth),
            },
            Shape::List { ordered, items } => Node::List {
                ordered,
                items: items.iter().map(|item| self.nodes(item, depth)).collect(),
            },
            Shape::Quote { parts } => {
                let mut children = Vec::new();
                for part in &parts {
                    for node in self.nodes(part, depth) {
                        push_merged(&mut children, node);
                    }
                }
                Node::Quote { children }
            }
            Shape::MaskedLink { url, label } => Node::Link {
                url,
                label: Some(self.nodes(&label, depth)),
            },
            Shape::Leaf(node) => node,
        }
    }
}

/// Appends `node`, merging it into a preceding text node.
fn push_merged(out: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Text { value: last }), Node::Text { value }) = (out.last_mut(), &node) {
        last.push_str(value);
        return;
    }
    out.push(node);
}

/// The cursor loop over one span: yields shapes with literal runs coalesced.
struct Tokens<'s> {
    src: &'s str,
    emoji: &'s EmojiTable,
    pos: usize,
    end: usize,
    table: Table,
    pending: Option<Shape>,
    scans: Scans,
}

impl Tokens<'_> {
    fn recognize(&self) -> Option<Hit> {
        let cursor = Cursor {
            src: self.src,
            at: self.pos,
            end: self.end,
            emoji: self.emoji,
            scans: &self.scans,
        };
        self.table.iter().find_map(|m| {
            let hit = (m.recognize)(&cursor)?;
            trace!(rule = m.name, at = self.pos, len = hit.len, "matched");
            Some(hit)
        })
    }
}

impl Iterator for Tokens<'_> {
    type Item = Shape;

    fn next(&mut self) -> Option<Shape> {
        if let Some(shape) = self.pending.take() {
            return Some(shape);
        }

        let mut text = String::new();
        while self.pos < self.end {
            match self.recognize() {
                Some(Hit {
                    len,
                    shape: Shape::Text(value),
                }) => {
                    text.push_str(&value);
                    self.pos += len;
                }
                Some(Hit { len, shape }) => {
                    debug_assert!(len > 0);
                    self.pos += len;
                    if text.is_empty() {
                        return Some(shape);
                    }
                    self.pending = Some(shape);
                    return Some(Shape::Text(text));
                }
                None => {
                    let Some(ch) = self.src[self.pos..self.end].chars().next() else {
                        break;
                    };
                    text.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }

        (!text.is_empty()).then_some(Shape::Text(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Emoji,
    Link,
}

struct Frame<'s> {
    tokens: Tokens<'s>,
    depth: usize,
}

/// Iterator returned by [`Parser::extract_emojis`] and [`Parser::extract_links`].
///
/// Walks the input with an explicit stack of pending spans, so only the
/// nodes being yielded are ever built.
pub struct Extract<'s> {
    builder: Builder<'s>,
    target: Target,
    stack: Vec<Frame<'s>>,
}

impl<'s> Extract<'s> {
    fn start(builder: Builder<'s>, target: Target, max_length: usize) -> Self {
        let mut stack = Vec::new();
        if within_limit(builder.src, max_length) && !builder.src.is_empty() && builder.max_depth > 0 {
            stack.push(Frame {
                tokens: builder.tokens(0..builder.src.len(), FULL),
                depth: 0,
            });
        }
        Self {
            builder,
            target,
            stack,
        }
    }

    /// Queues child spans so the first one is visited next.
    fn descend(&mut self, spans: &[Span], depth: usize) {
        let depth = depth + 1;
        if depth >= self.builder.max_depth {
            return;
        }
        for span in spans.iter().rev() {
            if !span.range.is_empty() {
                self.stack.push(Frame {
                    tokens: self.builder.tokens(span.range.clone(), span.table),
                    depth,
                });
            }
        }
    }
}

impl Iterator for Extract<'_> {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        loop {
            let frame = self.stack.last_mut()?;
            let depth = frame.depth;
            let Some(shape) = frame.tokens.next() else {
                self.stack.pop();
                continue;
            };

            match shape {
                Shape::Text(_) => {}
                Shape::Leaf(node) => {
                    let wanted = match self.target {
                        Target::Emoji => node.is_emoji(),
                        Target::Link => node.is_link(),
                    };
                    if wanted {
                        return Some(node);
                    }
                }
                Shape::Formatting { inner, .. } | Shape::Heading { inner, .. } => {
                    self.descend(&[inner], depth);
                }
                Shape::List { items: spans, .. } | Shape::Quote { parts: spans } => {
                    self.descend(&spans, depth);
                }
                Shape::MaskedLink { url, label } => {
                    let link = (self.target == Target::Link).then(|| Node::Link {
                        url,
                        label: Some(self.builder.nodes(&label, depth + 1)),
                    });
                    self.descend(&[label], depth);
                    if link.is_some() {
                        return link;
                    }
                }
            }
        }
    }
}
