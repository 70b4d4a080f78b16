// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Plain-text rendering.
//!
//! Structural markup is dropped and only the readable content is kept.
//! Masked links lose their label and render as the bare URL, since plain
//! text cannot carry a label and a target separately. Mentions that cannot
//! be resolved render as their original token.

use crate::node::{MentionKind, Node, mention_token};
use crate::parser::Parser;
use crate::resolver::{Resolutions, Resolver};
use crate::timestamp::{TimestampStyle, format_timestamp};
use crate::visitor::{RenderOptions, Visitor, render};

/// Renders a tree as plain text from already-gathered resolutions.
pub struct PlainTextVisitor<'r> {
    out: String,
    resolved: &'r Resolutions,
    options: RenderOptions,
}

impl<'r> PlainTextVisitor<'r> {
    /// Creates a visitor reading identities from `resolved`.
    #[must_use]
    pub const fn new(resolved: &'r Resolutions, options: RenderOptions) -> Self {
        Self {
            out: String::new(),
            resolved,
            options,
        }
    }
}

impl Visitor for PlainTextVisitor<'_> {
    type Output = String;

    fn finish(self) -> String {
        self.out
    }

    fn visit_text(&mut self, value: &str) {
        self.out.push_str(value);
    }

    fn visit_heading(&mut self, _level: u8, children: &[Node]) {
        self.visit_nodes(children);
        self.out.push('\n');
    }

    fn visit_list(&mut self, _ordered: bool, items: &[Vec<Node>]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.visit_nodes(item);
        }
    }

    fn visit_code(&mut self, _language: Option<&str>, content: &str, _multiline: bool) {
        self.out.push_str(content);
    }

    fn visit_link(&mut self, url: &str, _label: Option<&[Node]>) {
        self.out.push_str(url);
    }

    fn visit_mention(&mut self, kind: MentionKind, id: Option<u64>) {
        let info = id.and_then(|id| self.resolved.mention(kind, id));
        match (kind, info) {
            (MentionKind::Everyone | MentionKind::Here, _) | (_, None) => {
                self.out.push_str(&mention_token(kind, id));
            }
            (MentionKind::Channel, Some(channel)) => {
                self.out.push('#');
                self.out.push_str(&channel.display_name);
                if channel.voice {
                    self.out.push_str(" [voice]");
                }
            }
            (MentionKind::User | MentionKind::UserNickname | MentionKind::Role, Some(info)) => {
                self.out.push('@');
                self.out.push_str(&info.display_name);
            }
        }
    }

    fn visit_emoji(&mut self, name: &str, id: Option<u64>, _animated: bool) {
        if id.is_some() {
            self.out.push(':');
            self.out.push_str(name);
            self.out.push(':');
        } else {
            self.out.push_str(name);
        }
    }

    fn visit_timestamp(&mut self, epoch_seconds: Option<i64>, style: TimestampStyle) {
        self.out
            .push_str(&format_timestamp(epoch_seconds, style, self.options.utc_offset));
    }
}

/// Resolves the identities in `nodes` and renders them as plain text.
///
/// # Errors
///
/// Returns the resolver's error if any lookup fails; no partial output is
/// produced.
pub async fn render_plain<R: Resolver + ?Sized>(
    nodes: &[Node],
    resolver: &R,
    options: &RenderOptions,
) -> Result<String, R::Error> {
    let resolved = Resolutions::gather(nodes, resolver).await?;
    Ok(render(nodes, PlainTextVisitor::new(&resolved, *options)))
}

/// Parses `text` and renders it as plain text.
///
/// # Errors
///
/// Returns the resolver's error if any lookup fails.
pub async fn format_plain<R: Resolver + ?Sized>(
    text: &str,
    parser: &Parser<'_>,
    resolver: &R,
    options: &RenderOptions,
) -> Result<String, R::Error> {
    let nodes = parser.parse(text);
    render_plain(&nodes, resolver, options).await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resolver::Directory;

    fn directory() -> Directory {
        Directory::from_json(
            r##"{
                "users": { "1": { "name": "alice", "nickname": "Al" } },
                "roles": { "2": { "name": "mods", "color": "#ff5733" } },
                "channels": { "3": { "name": "general" }, "4": { "name": "lounge", "voice": true } }
            }"##,
        )
        .unwrap()
    }

    async fn plain(text: &str) -> String {
        format_plain(
            text,
            &Parser::default(),
            &directory(),
            &RenderOptions::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn renders_text_unchanged() {
        assert_eq!(plain("hello").await, "hello");
        assert_eq!(plain("").await, "");
    }

    #[tokio::test]
    async fn strips_formatting() {
        assert_eq!(plain("**bold** and *it* ||hidden||").await, "bold and it hidden");
    }

    #[tokio::test]
    async fn keeps_heading_line_break() {
        assert_eq!(plain("# Title\nbody").await, "Title\nbody");
    }

    #[tokio::test]
    async fn joins_list_items_by_line() {
        assert_eq!(plain("- a\n- b\nafter").await, "a\nb\nafter");
    }

    #[tokio::test]
    async fn renders_code_verbatim() {
        assert_eq!(plain("`**x**`").await, "**x**");
        assert_eq!(plain("```rs\nlet x = 1;\n```").await, "let x = 1;");
    }

    #[tokio::test]
    async fn masked_links_render_url() {
        assert_eq!(
            plain("[click here](https://example.com)").await,
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn resolves_mentions() {
        assert_eq!(
            plain("<@1> <@&2> <#3> <#4> @everyone").await,
            "@Al @mods #general #lounge [voice] @everyone"
        );
    }

    #[tokio::test]
    async fn unresolved_mentions_keep_token() {
        assert_eq!(plain("hi <@!99> in <#98>").await, "hi <@!99> in <#98>");
    }

    #[tokio::test]
    async fn renders_emoji() {
        assert_eq!(plain("<:party:5> 😄 :fire:").await, ":party: 😄 🔥");
    }

    #[tokio::test]
    async fn relative_timestamp_uses_fixed_fallback() {
        let relative = plain("<t:1234567890:R>").await;
        assert_eq!(relative, "02/13/2009 23:31");
        assert_eq!(relative, plain("<t:1234567890>").await);
    }

    #[tokio::test]
    async fn unreadable_timestamp_is_invalid_date() {
        assert_eq!(plain("at <t:1:x>").await, "at Invalid date");
    }

    #[tokio::test]
    async fn timestamps_follow_offset() {
        let options = RenderOptions {
            utc_offset: chrono::FixedOffset::east_opt(3600).unwrap(),
            ..RenderOptions::default()
        };
        let out = format_plain("<t:1234567890:t>", &Parser::default(), &directory(), &options)
            .await
            .unwrap();
        assert_eq!(out, "00:31");
    }
}
