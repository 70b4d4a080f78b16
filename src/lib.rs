// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Parse chat-flavored markdown and render it as plain text or HTML.
//!
//! This crate understands the markdown dialect used by chat platforms:
//! bold, italics, underline, strikethrough and spoilers, headings, lists,
//! block quotes, code, links, user/role/channel mentions, custom and standard
//! emoji, and timestamps.
//!
//! # Overview
//!
//! Processing a message happens in two stages:
//!
//! 1. The [`parser`] turns text into a tree of [`Node`]s. Parsing never
//!    fails; anything that is not markup stays literal text.
//! 2. A [`Visitor`] walks the tree. The [`plaintext`] and [`html`] renderers
//!    first ask a [`Resolver`] for the names behind mentions and the images
//!    behind custom emoji, then render from what it returned.
//!
//! # Example
//!
//! ```
//! use chatmark::{Directory, Parser, RenderOptions, html, plaintext};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let directory = Directory::from_json(r#"{ "users": { "1": { "name": "alice" } } }"#).unwrap();
//! let parser = Parser::default();
//! let opts = RenderOptions::default();
//!
//! let text = plaintext::format_plain("**hi** <@1>", &parser, &directory, &opts).await.unwrap();
//! assert_eq!(text, "hi @alice");
//!
//! let markup = html::format_html("**hi**", &parser, &directory, &opts).await.unwrap();
//! assert_eq!(markup, "<strong>hi</strong>");
//! # });
//! ```
//!
//! # Modules
//!
//! - [`node`]: the syntax tree
//! - [`parser`]: markdown parsing and emoji/link extraction
//! - [`visitor`]: tree traversal and shared rendering options
//! - [`resolver`]: identity lookup for mentions and custom emoji
//! - [`plaintext`], [`html`]: the two renderers
//! - [`emoji`], [`timestamp`]: emoji shortcodes and timestamp formatting

#![deny(missing_docs)]

pub mod emoji;
pub mod html;
mod matcher;
pub mod node;
pub mod parser;
pub mod plaintext;
pub mod resolver;
pub mod timestamp;
pub mod visitor;

pub use emoji::EmojiTable;
pub use html::{format_html, render_html};
pub use node::{FormattingKind, MentionKind, Node};
pub use parser::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_LENGTH, ParseOptions, Parser};
pub use plaintext::{format_plain, render_plain};
pub use resolver::{Directory, EmojiInfo, MentionInfo, Resolver};
pub use timestamp::TimestampStyle;
pub use visitor::{RenderOptions, Visitor, render};
