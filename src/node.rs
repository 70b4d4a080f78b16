// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! The markdown syntax tree.
//!
//! A parsed message is a `Vec<Node>`. Composite nodes own their children
//! outright; nothing points back up the tree, and nothing is mutated after
//! the parser hands the tree over.

use serde::{Deserialize, Serialize};

use crate::timestamp::TimestampStyle;

/// Inline formatting applied to a run of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormattingKind {
    /// `**text**`
    Bold,
    /// `*text*` or `_text_`
    Italic,
    /// `__text__`
    Underline,
    /// `~~text~~`
    Strikethrough,
    /// `||text||`
    Spoiler,
}

/// The target of a mention token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    /// `<@id>`
    User,
    /// `<@!id>`, the legacy nickname form of a user mention.
    UserNickname,
    /// `<#id>`
    Channel,
    /// `<@&id>`
    Role,
    /// `@everyone`
    Everyone,
    /// `@here`
    Here,
}

impl MentionKind {
    /// Returns `true` for mention kinds that carry an id and need resolving.
    #[must_use]
    pub const fn has_target(self) -> bool {
        !matches!(self, Self::Everyone | Self::Here)
    }
}

/// One syntactic unit of a parsed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Literal content.
    Text {
        /// The text, with escapes already removed.
        value: String,
    },

    /// Bold, italic, underline, strikethrough or spoiler content.
    Formatting {
        /// Which formatting applies.
        kind: FormattingKind,
        /// The formatted content.
        children: Vec<Node>,
    },

    /// A `#`, `##` or `###` heading line.
    Heading {
        /// Heading level, 1 through 3.
        level: u8,
        /// The heading content.
        children: Vec<Node>,
    },

    /// A bulleted or numbered list.
    List {
        /// `true` for `1.` style items.
        ordered: bool,
        /// One entry per list item.
        items: Vec<Vec<Node>>,
    },

    /// A block quote (`> `, repeated `> ` lines, or `>>> `).
    Quote {
        /// The quoted content.
        children: Vec<Node>,
    },

    /// An inline code span or a fenced code block.
    CodeBlock {
        /// The fence language tag, if one was given.
        language: Option<String>,
        /// The raw code. Never parsed as markdown.
        content: String,
        /// `true` for fenced blocks.
        multiline: bool,
    },

    /// An auto-link or a masked link.
    Link {
        /// The link target.
        url: String,
        /// The label of a masked link; `None` for a bare URL.
        label: Option<Vec<Node>>,
    },

    /// A mention of a user, channel, role, `@everyone` or `@here`.
    Mention {
        /// What is being mentioned.
        kind: MentionKind,
        /// The snowflake id; absent for `@everyone` and `@here`.
        id: Option<u64>,
    },

    /// A custom emoji or a standard unicode emoji.
    Emoji {
        /// Custom emoji name, or the unicode character(s) of a standard emoji.
        name: String,
        /// Custom emoji id; `None` for standard emoji.
        id: Option<u64>,
        /// Whether a custom emoji is animated.
        animated: bool,
    },

    /// A `<t:...>` timestamp.
    Timestamp {
        /// Seconds since the Unix epoch; `None` when the token names an
        /// out-of-range epoch or an unknown style, which renders as an
        /// invalid date.
        epoch_seconds: Option<i64>,
        /// Requested display style.
        style: TimestampStyle,
    },
}

impl Node {
    /// Creates a [`Node::Text`].
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Creates a [`Node::Formatting`].
    #[must_use]
    pub const fn formatting(kind: FormattingKind, children: Vec<Self>) -> Self {
        Self::Formatting { kind, children }
    }

    /// Returns `true` for custom emoji and standard emoji nodes.
    #[must_use]
    pub const fn is_emoji(&self) -> bool {
        matches!(self, Self::Emoji { .. })
    }

    /// Returns `true` for auto-links and masked links.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Self::Link { .. })
    }

    /// Returns `true` for a text node that holds only whitespace.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text { value } if value.trim().is_empty())
    }
}

/// Reconstructs the source token of a mention, e.g. `<@&123>`.
///
/// Used as the fallback display when a mention cannot be resolved.
#[must_use]
pub fn mention_token(kind: MentionKind, id: Option<u64>) -> String {
    let id = id.map(|id| id.to_string()).unwrap_or_default();
    match kind {
        MentionKind::User => format!("<@{id}>"),
        MentionKind::UserNickname => format!("<@!{id}>"),
        MentionKind::Channel => format!("<#{id}>"),
        MentionKind::Role => format!("<@&{id}>"),
        MentionKind::Everyone => "@everyone".to_owned(),
        MentionKind::Here => "@here".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_token_reproduces_source_syntax() {
        assert_eq!(mention_token(MentionKind::User, Some(1)), "<@1>");
        assert_eq!(mention_token(MentionKind::UserNickname, Some(2)), "<@!2>");
        assert_eq!(mention_token(MentionKind::Channel, Some(3)), "<#3>");
        assert_eq!(mention_token(MentionKind::Role, Some(4)), "<@&4>");
        assert_eq!(mention_token(MentionKind::Everyone, None), "@everyone");
        assert_eq!(mention_token(MentionKind::Here, None), "@here");
    }

    #[test]
    fn only_targeted_mentions_need_resolving() {
        assert!(MentionKind::Role.has_target());
        assert!(MentionKind::UserNickname.has_target());
        assert!(!MentionKind::Everyone.has_target());
        assert!(!MentionKind::Here.has_target());
    }

    #[test]
    fn serializes_with_type_tag() {
        let node = Node::formatting(FormattingKind::Bold, vec![Node::text("hi")]);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["type"], "formatting");
        assert_eq!(json["kind"], "bold");
        assert_eq!(json["children"][0]["value"], "hi");
    }

    #[test]
    fn detects_blank_text() {
        assert!(Node::text("  \n").is_blank_text());
        assert!(!Node::text(" a ").is_blank_text());
        assert!(
            !Node::Emoji {
                name: "x".into(),
                id: None,
                animated: false
            }
            .is_blank_text()
        );
    }
}
