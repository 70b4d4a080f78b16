// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Property-based tests for HTML output escaping.
//!
//! Whatever the input, the only raw markup in the output is the tag
//! structure the renderer builds itself.

use std::sync::LazyLock;

use chatmark::{Directory, Parser, RenderOptions, html};
use proptest::prelude::*;
use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A&(?:[a-zA-Z]+|#[0-9]+|#x[0-9a-fA-F]+);").unwrap());

/// Markup fragments, hostile characters and arbitrary text glued together.
fn message() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        prop::sample::select(vec![
            "**", "*", "__", "_", "~~", "||", "`", "```", "```html\n", "> ", ">>> ", "- ", "1. ",
            "# ", "\n", "\\", "[", "](", ")", "<@1>", "<@&2>", "<#3>", "<a:x:4>", "<:y\">:5>",
            "<t:0:R>", "<t:1:q>", ":smile:", "@everyone", "https://example.com/?a=1&b=\"2\"",
            "<https://x.y/<z>>", "javascript:alert(1)", "&amp;", "&", "<", ">", "\"", "'",
        ])
        .prop_map(str::to_owned),
        "[a-z <>&\"']{1,6}",
        any::<char>().prop_map(String::from),
    ];
    prop::collection::vec(fragment, 0..40).prop_map(|parts| parts.concat())
}

fn render(text: &str) -> String {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let Ok(markup) = runtime.block_on(html::format_html(
        text,
        &Parser::default(),
        &Directory::default(),
        &RenderOptions::default(),
    ));
    markup
}

proptest! {
    /// Outside of tags, output holds no raw `<`, `>` or `"`.
    #[test]
    fn text_outside_tags_is_escaped(text in message()) {
        let markup = render(&text);
        let content = TAG_RE.replace_all(&markup, "");
        prop_assert!(
            !content.contains(['<', '>', '"']),
            "unescaped markup in {content:?} from {text:?}"
        );
    }

    /// Every `&` in the output begins an entity.
    #[test]
    fn ampersands_start_entities(text in message()) {
        let markup = render(&text);
        for (at, _) in markup.match_indices('&') {
            prop_assert!(
                ENTITY_RE.is_match(&markup[at..]),
                "bare ampersand at {at} in {markup:?} from {text:?}"
            );
        }
    }
}
