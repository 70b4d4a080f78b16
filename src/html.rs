// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML rendering for chat log pages.
//!
//! Every string that came from a message or a resolver (text, code, URLs,
//! display names, emoji names, colors) is entity-encoded before it is
//! written, whether it lands in an attribute or in element content. Only
//! tag structure built here is emitted raw.
//!
//! Link targets are restricted to `http`, `https` and `mailto`; anything
//! else renders its label as plain text. Mention colors are accepted only
//! as `#rrggbb` and are re-emitted as `rgb()` components.

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::emoji::{EmojiTable, default_image_url, display_code};
use crate::node::{FormattingKind, MentionKind, Node, mention_token};
use crate::parser::Parser;
use crate::resolver::{MentionInfo, Resolutions, Resolver};
use crate::timestamp::{TimestampStyle, format_timestamp};
use crate::visitor::{RenderOptions, Visitor, render};

const SPOILER_OPEN: &str = r#"<span class="chatlog__markdown-spoiler chatlog__markdown-spoiler--hidden" onclick="showSpoiler(event, this)">"#;
const QUOTE_OPEN: &str = r#"<div class="chatlog__markdown-quote"><div class="chatlog__markdown-quote-border"></div><div class="chatlog__markdown-quote-content">"#;
const QUOTE_CLOSE: &str = "</div></div>";
const VOICE_SYMBOL: char = '\u{1F50A}';

static MESSAGE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\Ahttps?://(?:discord|discordapp)\.com/channels/.*?/(\d+)/?\z").unwrap()
});

/// Entity-encodes `&`, `<`, `>`, `"` and `'`.
fn encode(text: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(text)
}

/// Whether `url` may be used as an `href`.
///
/// Browsers ignore ASCII whitespace and control characters inside a scheme,
/// so those are removed before the scheme is compared.
fn is_safe_href(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| cleaned.starts_with(scheme))
}

/// Converts a validated `#rrggbb` color into an inline mention style.
fn mention_style(color: &str) -> Option<String> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    Some(format!(
        "color: rgb({r}, {g}, {b}); background-color: rgba({r}, {g}, {b}, 0.1);"
    ))
}

/// Whether a message consists solely of emoji and whitespace.
///
/// Such messages render their emoji large.
#[must_use]
pub fn is_jumbo(nodes: &[Node]) -> bool {
    nodes.iter().any(Node::is_emoji)
        && nodes
            .iter()
            .all(|node| node.is_emoji() || node.is_blank_text())
}

/// Renders a tree as HTML from already-gathered resolutions.
pub struct HtmlVisitor<'r> {
    out: String,
    resolved: &'r Resolutions,
    emoji: &'r EmojiTable,
    options: RenderOptions,
    jumbo: bool,
}

impl<'r> HtmlVisitor<'r> {
    /// Creates a visitor reading identities from `resolved`.
    ///
    /// `jumbo` enlarges emoji; see [`is_jumbo`].
    #[must_use]
    pub fn new(resolved: &'r Resolutions, options: RenderOptions, jumbo: bool) -> Self {
        Self {
            out: String::new(),
            resolved,
            emoji: EmojiTable::builtin(),
            options,
            jumbo,
        }
    }

    /// Uses `emoji` to look up shortcodes for emoji titles.
    #[must_use]
    pub fn with_emoji_table(mut self, emoji: &'r EmojiTable) -> Self {
        self.emoji = emoji;
        self
    }

    fn push_encoded(&mut self, text: &str) {
        self.out.push_str(&encode(text));
    }

    fn mention_span(&mut self, title: Option<&str>, style: Option<&str>, body: &str) {
        self.out.push_str(r#"<span class="chatlog__markdown-mention""#);
        if let Some(title) = title {
            write!(self.out, r#" title="{}""#, encode(title)).unwrap();
        }
        if let Some(style) = style {
            write!(self.out, r#" style="{}""#, encode(style)).unwrap();
        }
        self.out.push('>');
        self.push_encoded(body);
        self.out.push_str("</span>");
    }

    fn style_for(info: &MentionInfo) -> Option<String> {
        let color = info.color.as_deref()?;
        let style = mention_style(color);
        if style.is_none() {
            warn!(color, "ignoring invalid mention color");
        }
        style
    }
}

impl Visitor for HtmlVisitor<'_> {
    type Output = String;

    fn finish(self) -> String {
        self.out
    }

    fn visit_text(&mut self, value: &str) {
        self.push_encoded(value);
    }

    fn visit_formatting(&mut self, kind: FormattingKind, children: &[Node]) {
        let (open, close) = match kind {
            FormattingKind::Bold => ("<strong>", "</strong>"),
            FormattingKind::Italic => ("<em>", "</em>"),
            FormattingKind::Underline => ("<u>", "</u>"),
            FormattingKind::Strikethrough => ("<s>", "</s>"),
            FormattingKind::Spoiler => (SPOILER_OPEN, "</span>"),
        };
        self.out.push_str(open);
        self.visit_nodes(children);
        self.out.push_str(close);
    }

    fn visit_heading(&mut self, level: u8, children: &[Node]) {
        let level = level.clamp(1, 3);
        write!(self.out, "<h{level}>").unwrap();
        self.visit_nodes(children);
        write!(self.out, "</h{level}>").unwrap();
    }

    fn visit_list(&mut self, ordered: bool, items: &[Vec<Node>]) {
        let tag = if ordered { "ol" } else { "ul" };
        write!(self.out, "<{tag}>").unwrap();
        for item in items {
            self.out.push_str("<li>");
            self.visit_nodes(item);
            self.out.push_str("</li>");
        }
        write!(self.out, "</{tag}>").unwrap();
    }

    fn visit_quote(&mut self, children: &[Node]) {
        self.out.push_str(QUOTE_OPEN);
        self.visit_nodes(children);
        self.out.push_str(QUOTE_CLOSE);
    }

    fn visit_code(&mut self, language: Option<&str>, content: &str, multiline: bool) {
        if multiline {
            let highlight = language
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map_or_else(|| "nohighlight".to_owned(), |lang| format!("language-{lang}"));
            write!(
                self.out,
                r#"<code class="chatlog__markdown-pre chatlog__markdown-pre--multiline {}">"#,
                encode(&highlight)
            )
            .unwrap();
        } else {
            self.out
                .push_str(r#"<code class="chatlog__markdown-pre chatlog__markdown-pre--inline">"#);
        }
        self.push_encoded(content);
        self.out.push_str("</code>");
    }

    fn visit_link(&mut self, url: &str, label: Option<&[Node]>) {
        if !is_safe_href(url) {
            warn!(url, "refusing link with unsupported scheme");
            match label {
                Some(label) => self.visit_nodes(label),
                None => self.push_encoded(url),
            }
            return;
        }

        write!(self.out, r#"<a href="{}""#, encode(url)).unwrap();
        if let Some(caps) = MESSAGE_LINK_RE.captures(url) {
            write!(self.out, r#" onclick="scrollToMessage(event, '{}')""#, &caps[1]).unwrap();
        }
        self.out.push('>');
        match label {
            Some(label) => self.visit_nodes(label),
            None => self.push_encoded(url),
        }
        self.out.push_str("</a>");
    }

    fn visit_mention(&mut self, kind: MentionKind, id: Option<u64>) {
        let info = id.and_then(|id| self.resolved.mention(kind, id));
        match (kind, info) {
            (MentionKind::Everyone | MentionKind::Here, _) => {
                self.mention_span(None, None, &mention_token(kind, id));
            }
            (MentionKind::User | MentionKind::UserNickname, Some(user)) => {
                let title = user.full_name.as_deref().unwrap_or(&user.display_name);
                let style = Self::style_for(user);
                self.mention_span(
                    Some(title),
                    style.as_deref(),
                    &format!("@{}", user.display_name),
                );
            }
            (MentionKind::Role, Some(role)) => {
                let style = Self::style_for(role);
                self.mention_span(None, style.as_deref(), &format!("@{}", role.display_name));
            }
            (MentionKind::Channel, Some(channel)) => {
                let symbol = if channel.voice { VOICE_SYMBOL } else { '#' };
                self.mention_span(None, None, &format!("{symbol}{}", channel.display_name));
            }
            (_, None) => {
                let placeholder = match kind {
                    MentionKind::Channel => "#deleted-channel",
                    MentionKind::Role => "@deleted-role",
                    _ => "@Unknown",
                };
                self.mention_span(Some(&mention_token(kind, id)), None, placeholder);
            }
        }
    }

    fn visit_emoji(&mut self, name: &str, id: Option<u64>, animated: bool) {
        let class = if self.jumbo {
            "chatlog__emoji chatlog__emoji--large"
        } else {
            "chatlog__emoji"
        };
        let src = self
            .resolved
            .emoji(name, id, animated)
            .map_or_else(|| default_image_url(name, id, animated), |info| info.image_url.clone());
        let code = display_code(self.emoji, name, id);
        let title = if code == name && id.is_none() {
            name.to_owned()
        } else {
            format!(":{code}:")
        };
        write!(
            self.out,
            r#"<img loading="lazy" class="{class}" alt="{}" title="{}" src="{}">"#,
            encode(name),
            encode(&title),
            encode(&src),
        )
        .unwrap();
    }

    fn visit_timestamp(&mut self, epoch_seconds: Option<i64>, style: TimestampStyle) {
        let offset = self.options.utc_offset;
        let formatted = format_timestamp(epoch_seconds, style, offset);
        let long = format_timestamp(epoch_seconds, TimestampStyle::LongDateShortTime, offset);
        write!(
            self.out,
            r#"<span class="chatlog__markdown-timestamp" title="{}">{}</span>"#,
            encode(&long),
            encode(&formatted),
        )
        .unwrap();
    }
}

/// Resolves the identities in `nodes` and renders them as HTML.
///
/// # Errors
///
/// Returns the resolver's error if any lookup fails; no partial output is
/// produced.
pub async fn render_html<R: Resolver + ?Sized>(
    nodes: &[Node],
    resolver: &R,
    options: &RenderOptions,
) -> Result<String, R::Error> {
    render_html_with(nodes, EmojiTable::builtin(), resolver, options).await
}

async fn render_html_with<R: Resolver + ?Sized>(
    nodes: &[Node],
    emoji: &EmojiTable,
    resolver: &R,
    options: &RenderOptions,
) -> Result<String, R::Error> {
    let resolved = Resolutions::gather(nodes, resolver).await?;
    let jumbo = options.jumbo_emoji && is_jumbo(nodes);
    let visitor = HtmlVisitor::new(&resolved, *options, jumbo).with_emoji_table(emoji);
    Ok(render(nodes, visitor))
}

/// Parses `text` and renders it as HTML.
///
/// # Errors
///
/// Returns the resolver's error if any lookup fails.
pub async fn format_html<R: Resolver + ?Sized>(
    text: &str,
    parser: &Parser<'_>,
    resolver: &R,
    options: &RenderOptions,
) -> Result<String, R::Error> {
    let nodes = parser.parse(text);
    render_html_with(&nodes, parser.emoji_table(), resolver, options).await
}
