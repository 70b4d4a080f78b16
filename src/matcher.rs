// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! The ordered grammar rules of chat markdown.
//!
//! Each [`Matcher`] recognizes one lexical form anchored at the cursor. The
//! parser tries the rules of a table in order at every position and takes
//! the first hit, so table order decides which rule wins when two could
//! start at the same character. This is not longest-match.
//!
//! Rules never build child nodes themselves. A composite hit describes its
//! inner content as a [`Span`] of the source plus the table to parse it
//! with; the parser decides whether (and how deep) to recurse.
//!
//! Every rule runs in time linear in the remaining input: delimiter rules
//! scan forward for candidate closers and test a constant-size context
//! around each, and the regex-backed rules use the `regex` crate's finite
//! automata, which never backtrack.

use std::cell::RefCell;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::emoji::EmojiTable;
use crate::node::{FormattingKind, MentionKind, Node};
use crate::timestamp::TimestampStyle;

/// An ordered rule table.
pub(crate) type Table = &'static [Matcher];

/// A grammar rule: a name for diagnostics and an anchored recognizer.
pub(crate) struct Matcher {
    pub name: &'static str,
    pub recognize: fn(&Cursor<'_>) -> Option<Hit>,
}

/// The matching position inside the source.
pub(crate) struct Cursor<'s> {
    pub src: &'s str,
    pub at: usize,
    pub end: usize,
    pub emoji: &'s EmojiTable,
    pub scans: &'s Scans,
}

/// Forward searches remembered across the positions of one span.
///
/// A search answers "first acceptable hit at or after `from`", and whether a
/// hit is acceptable depends only on where it lies, never on the opener
/// asking. The last answer for a key therefore also answers any later query
/// starting between its `from` and its hit. The cursor only moves forward,
/// so each key scans every byte of the span at most once.
#[derive(Default)]
pub(crate) struct Scans(RefCell<Vec<Scan>>);

struct Scan {
    key: &'static str,
    from: usize,
    found: Option<usize>,
}

impl Scan {
    fn covers(&self, from: usize) -> bool {
        from >= self.from && self.found.is_none_or(|at| from <= at)
    }
}

impl Scans {
    fn first_from(
        &self,
        key: &'static str,
        from: usize,
        search: impl FnOnce(usize) -> Option<usize>,
    ) -> Option<usize> {
        let cached = self
            .0
            .borrow()
            .iter()
            .find(|scan| scan.key == key && scan.covers(from))
            .map(|scan| scan.found);
        if let Some(found) = cached {
            return found;
        }

        let found = search(from);
        let scan = Scan { key, from, found };
        let mut scans = self.0.borrow_mut();
        match scans.iter_mut().find(|slot| slot.key == key) {
            Some(slot) => *slot = scan,
            None => scans.push(scan),
        }
        found
    }
}

impl<'s> Cursor<'s> {
    fn rest(&self) -> &'s str {
        &self.src[self.at..self.end]
    }

    /// Line-anchored rules match at the start of the source or after `\n`.
    fn at_line_start(&self) -> bool {
        self.at == 0 || self.src.as_bytes()[self.at - 1] == b'\n'
    }

    fn byte(&self, index: usize) -> Option<u8> {
        (index < self.end).then(|| self.src.as_bytes()[index])
    }

    fn char_at(&self, index: usize) -> Option<char> {
        (index < self.end)
            .then(|| self.src[index..self.end].chars().next())
            .flatten()
    }

    fn char_before(&self, index: usize) -> Option<char> {
        self.src[..index].chars().next_back()
    }
}

/// A region of the source still to be parsed with `table`.
#[derive(Clone)]
pub(crate) struct Span {
    pub range: Range<usize>,
    pub table: Table,
}

impl Span {
    fn full(range: Range<usize>) -> Self {
        Self { range, table: FULL }
    }
}

/// What a rule recognized, before any recursion.
pub(crate) enum Shape {
    Text(String),
    Formatting { kind: FormattingKind, inner: Span },
    Heading { level: u8, inner: Span },
    List { ordered: bool, items: Vec<Span> },
    Quote { parts: Vec<Span> },
    MaskedLink { url: String, label: Span },
    Leaf(Node),
}

/// A successful match: bytes consumed from the cursor and what was seen.
pub(crate) struct Hit {
    pub len: usize,
    pub shape: Shape,
}

impl Hit {
    const fn new(len: usize, shape: Shape) -> Self {
        Self { len, shape }
    }
}

/// All rules, in priority order.
pub(crate) static FULL: Table = &[
    SHRUG,
    IGNORED_SYMBOL,
    ESCAPE,
    HEADING,
    CODE_FENCE,
    CODE_INLINE,
    ITALIC_BOLD,
    ITALIC_UNDERLINE,
    BOLD,
    ITALIC,
    UNDERLINE,
    ITALIC_UNDERSCORE,
    STRIKETHROUGH,
    SPOILER,
    QUOTE_MULTILINE,
    QUOTE_REPEATED,
    QUOTE_LINE,
    LIST,
    EVERYONE,
    HERE,
    USER_MENTION,
    ROLE_MENTION,
    CHANNEL_MENTION,
    CUSTOM_EMOJI,
    UNICODE_EMOJI,
    SHORTCODE_EMOJI,
    TIMESTAMP,
    MASKED_LINK,
    AUTO_LINK,
    HIDDEN_LINK,
];

/// Mentions only.
pub(crate) static MINIMAL: Table = &[
    EVERYONE,
    HERE,
    USER_MENTION,
    ROLE_MENTION,
    CHANNEL_MENTION,
];

static BOLD_ONLY: Table = &[BOLD];
static UNDERLINE_ONLY: Table = &[UNDERLINE];

// Literal text

const SHRUG_TEXT: &str = r"¯\_(ツ)_/¯";

const SHRUG: Matcher = Matcher {
    name: "shrug",
    recognize: |c| {
        c.rest()
            .starts_with(SHRUG_TEXT)
            .then(|| Hit::new(SHRUG_TEXT.len(), Shape::Text(SHRUG_TEXT.to_owned())))
    },
};

/// Symbols that look like emoji but stay text outside an emoji sequence.
const IGNORED_SYMBOLS: &[char] = &[
    '\u{26A7}', '\u{2640}', '\u{2642}', '\u{2695}', '\u{267E}', '\u{00A9}', '\u{00AE}', '\u{2122}',
];

const IGNORED_SYMBOL: Matcher = Matcher {
    name: "ignored_symbol",
    recognize: |c| {
        let ch = c.char_at(c.at)?;
        IGNORED_SYMBOLS
            .contains(&ch)
            .then(|| Hit::new(ch.len_utf8(), Shape::Text(ch.to_string())))
    },
};

const ESCAPE: Matcher = Matcher {
    name: "escape",
    recognize: |c| {
        if c.byte(c.at)? != b'\\' {
            return None;
        }
        let ch = c.char_at(c.at + 1)?;
        let escapable = is_escapable_symbol(ch)
            || !(ch.is_ascii_alphanumeric() || ch.is_whitespace());
        escapable.then(|| Hit::new(1 + ch.len_utf8(), Shape::Text(ch.to_string())))
    },
};

/// Non-ASCII symbols that may be escaped, including a few whitespace-like
/// code points that punctuation escaping alone would reject.
fn is_escapable_symbol(ch: char) -> bool {
    matches!(ch,
        '\u{10000}'..='\u{10FFFF}'
        | '\u{2000}'..='\u{2BFF}'
        | '\u{2E00}'..='\u{2E7F}'
        | '\u{3000}'..='\u{303F}'
        | '\u{FE00}'..='\u{FE0F}'
        | '\u{00A0}'..='\u{00FF}')
}

// Headings, code

const HEADING: Matcher = Matcher {
    name: "heading",
    recognize: |c| {
        if !c.at_line_start() {
            return None;
        }
        let rest = c.rest();
        let level = rest.bytes().take_while(|&b| b == b'#').count();
        if !(1..=3).contains(&level) {
            return None;
        }
        let gap = inline_space(c.char_at(c.at + level)?)?;
        let start = c.at + level + gap;
        // The line break is mandatory; without it this is plain text.
        let newline = c.src[start..c.end].find('\n')? + start;
        (newline > start).then(|| {
            Hit::new(
                newline + 1 - c.at,
                Shape::Heading {
                    level: u8::try_from(level).unwrap_or(3),
                    inner: Span::full(start..newline),
                },
            )
        })
    },
};

/// Length of `ch` if it is whitespace other than a line break.
fn inline_space(ch: char) -> Option<usize> {
    (ch.is_whitespace() && ch != '\n').then(|| ch.len_utf8())
}

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A```(?:(\w*)\n)?(.+?)```").unwrap());

const CODE_FENCE: Matcher = Matcher {
    name: "code_fence",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("```") {
            return None;
        }
        find_from(c, "```", c.at + 3)?;
        let caps = CODE_FENCE_RE.captures(rest)?;
        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|lang| !lang.is_empty())
            .map(str::to_owned);
        let content = caps[2].trim_matches(['\r', '\n']).to_owned();
        Some(Hit::new(
            caps[0].len(),
            Shape::Leaf(Node::CodeBlock {
                language,
                content,
                multiline: true,
            }),
        ))
    },
};

const CODE_INLINE: Matcher = Matcher {
    name: "code_inline",
    recognize: |c| {
        let rest = c.rest();
        let ticks = if rest.starts_with("``") {
            2
        } else if rest.starts_with('`') {
            1
        } else {
            return None;
        };
        // Prefer the double-tick form; fall back to single like a backtracking `{1,2}`.
        (1..=ticks).rev().find_map(|n| {
            let body = &rest[n..];
            let content_len = body.find('`')?;
            let closer = &body[content_len..];
            (content_len > 0 && closer.len() >= n && closer.as_bytes()[..n].iter().all(|&b| b == b'`'))
                .then(|| {
                    Hit::new(
                        n + content_len + n,
                        Shape::Leaf(Node::CodeBlock {
                            language: None,
                            content: body[..content_len].to_owned(),
                            multiline: false,
                        }),
                    )
                })
        })
    },
};

// Formatting

/// Finds the first closing `delim` at or after `from` for which `accept`
/// holds, mirroring a lazy `(.+?)` followed by a guarded closer. Delimiters
/// are ASCII, and each delimiter has a single `accept` rule, so results are
/// shared between openers through [`Scans`].
fn find_closer(
    c: &Cursor<'_>,
    from: usize,
    delim: &'static str,
    accept: impl Fn(usize) -> bool,
) -> Option<usize> {
    let lead = char::from(delim.as_bytes()[0]);
    c.scans.first_from(delim, from, |from| {
        let mut pos = from;
        while pos < c.end {
            let found = c.src[pos..c.end].find(lead)? + pos;
            if c.src[found..c.end].starts_with(delim) && accept(found) {
                return Some(found);
            }
            pos = found + 1;
        }
        None
    })
}

/// First occurrence of `needle` at or after `from`.
fn find_from(c: &Cursor<'_>, needle: &'static str, from: usize) -> Option<usize> {
    c.scans
        .first_from(needle, from, |from| c.src[from..c.end].find(needle).map(|i| from + i))
}

/// Start of the search for a closer: one content character past `content`.
fn after_first_char(c: &Cursor<'_>, content: usize) -> Option<usize> {
    c.char_at(content).map(|ch| content + ch.len_utf8())
}

/// `open` + lazy content + `close`, optionally requiring the closer not be
/// followed by `forbid_after`.
fn delimited(
    c: &Cursor<'_>,
    delim: &'static str,
    forbid_after: Option<u8>,
    kind: FormattingKind,
) -> Option<Hit> {
    if !c.rest().starts_with(delim) {
        return None;
    }
    let content = c.at + delim.len();
    let search = after_first_char(c, content)?;
    let close = find_closer(c, search, delim, |at| {
        forbid_after.is_none_or(|b| c.byte(at + delim.len()) != Some(b))
    })?;
    Some(Hit::new(
        close + delim.len() - c.at,
        Shape::Formatting {
            kind,
            inner: Span::full(content..close),
        },
    ))
}

/// `***x***` and `___x___`: an italic wrapper whose content is parsed with
/// only the inner rule, so the result is Italic[Bold[x]] or Italic[Underline[x]].
fn italic_wrapping(c: &Cursor<'_>, ch: u8, inner_table: Table) -> Option<Hit> {
    let closer = match ch {
        b'*' => "***",
        b'_' => "___",
        _ => return None,
    };
    if !c.rest().starts_with(closer) {
        return None;
    }
    let search = after_first_char(c, c.at + 3)?;
    let close = find_closer(c, search, closer, |at| c.byte(at + 3) != Some(ch))?;
    Some(Hit::new(
        close + 3 - c.at,
        Shape::Formatting {
            kind: FormattingKind::Italic,
            inner: Span {
                range: c.at + 1..close + 2,
                table: inner_table,
            },
        },
    ))
}

const ITALIC_BOLD: Matcher = Matcher {
    name: "italic_bold",
    recognize: |c| italic_wrapping(c, b'*', BOLD_ONLY),
};

const ITALIC_UNDERLINE: Matcher = Matcher {
    name: "italic_underline",
    recognize: |c| italic_wrapping(c, b'_', UNDERLINE_ONLY),
};

const BOLD: Matcher = Matcher {
    name: "bold",
    recognize: |c| delimited(c, "**", Some(b'*'), FormattingKind::Bold),
};

const ITALIC: Matcher = Matcher {
    name: "italic",
    recognize: |c| {
        if c.byte(c.at)? != b'*' {
            return None;
        }
        let content = c.at + 1;
        if c.char_at(content)?.is_whitespace() {
            return None;
        }
        let search = after_first_char(c, content)?;
        let close = find_closer(c, search, "*", |at| {
            let before = c.char_before(at).is_some_and(|ch| !ch.is_whitespace() && ch != '*');
            before && c.byte(at + 1) != Some(b'*')
        })?;
        Some(Hit::new(
            close + 1 - c.at,
            Shape::Formatting {
                kind: FormattingKind::Italic,
                inner: Span::full(content..close),
            },
        ))
    },
};

const UNDERLINE: Matcher = Matcher {
    name: "underline",
    recognize: |c| delimited(c, "__", Some(b'_'), FormattingKind::Underline),
};

const ITALIC_UNDERSCORE: Matcher = Matcher {
    name: "italic_underscore",
    recognize: |c| {
        if c.byte(c.at)? != b'_' {
            return None;
        }
        let content = c.at + 1;
        let search = after_first_char(c, content)?;
        // The closer must not run into a word, so `snake_case_names` stay text.
        let close = find_closer(c, search, "_", |at| {
            !c.char_at(at + 1).is_some_and(is_word_char)
        })?;
        Some(Hit::new(
            close + 1 - c.at,
            Shape::Formatting {
                kind: FormattingKind::Italic,
                inner: Span::full(content..close),
            },
        ))
    },
};

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

const STRIKETHROUGH: Matcher = Matcher {
    name: "strikethrough",
    recognize: |c| delimited(c, "~~", None, FormattingKind::Strikethrough),
};

const SPOILER: Matcher = Matcher {
    name: "spoiler",
    recognize: |c| delimited(c, "||", None, FormattingKind::Spoiler),
};

// Quotes and lists

const QUOTE_MULTILINE: Matcher = Matcher {
    name: "quote_multiline",
    recognize: |c| {
        if !c.at_line_start() || !c.rest().starts_with(">>>") {
            return None;
        }
        let gap = c.char_at(c.at + 3).filter(|ch| ch.is_whitespace())?;
        let start = c.at + 3 + gap.len_utf8();
        (start < c.end).then(|| {
            Hit::new(
                c.end - c.at,
                Shape::Quote {
                    parts: vec![Span::full(start..c.end)],
                },
            )
        })
    },
};

/// Parses one `> ` line at `at`, returning the content span (including its
/// line break, if any) and the position after it.
fn quote_line(c: &Cursor<'_>, at: usize) -> Option<(Range<usize>, usize)> {
    if c.byte(at)? != b'>' {
        return None;
    }
    let gap = inline_space(c.char_at(at + 1)?)?;
    let start = at + 1 + gap;
    let end = c.src[start..c.end]
        .find('\n')
        .map_or(c.end, |i| start + i + 1);
    Some((start..end, end))
}

const QUOTE_REPEATED: Matcher = Matcher {
    name: "quote_repeated",
    recognize: |c| {
        if !c.at_line_start() {
            return None;
        }
        let mut parts = Vec::new();
        let mut pos = c.at;
        while let Some((content, next)) = quote_line(c, pos) {
            parts.push(Span::full(content));
            pos = next;
            if c.byte(next - 1) != Some(b'\n') {
                break;
            }
        }
        (parts.len() >= 2).then(|| Hit::new(pos - c.at, Shape::Quote { parts }))
    },
};

const QUOTE_LINE: Matcher = Matcher {
    name: "quote_line",
    recognize: |c| {
        if !c.at_line_start() {
            return None;
        }
        let (content, next) = quote_line(c, c.at)?;
        let has_text = c.src[content.clone()].trim_end_matches('\n').chars().next().is_some();
        has_text.then(|| {
            Hit::new(
                next - c.at,
                Shape::Quote {
                    parts: vec![Span::full(content)],
                },
            )
        })
    },
};

/// Length of a list marker plus its trailing space at `at`, and whether it
/// is an ordered (`1.`) marker.
fn list_marker(c: &Cursor<'_>, at: usize) -> Option<(usize, bool)> {
    let (len, ordered) = match c.byte(at)? {
        b'-' | b'*' => (1, false),
        b'0'..=b'9' => {
            let digits = c.src[at..c.end]
                .bytes()
                .take_while(u8::is_ascii_digit)
                .count();
            if digits > 9 || c.byte(at + digits) != Some(b'.') {
                return None;
            }
            (digits + 1, true)
        }
        _ => return None,
    };
    matches!(c.byte(at + len), Some(b' ' | b'\t')).then_some((len + 1, ordered))
}

fn line_end(c: &Cursor<'_>, from: usize) -> usize {
    c.src[from..c.end].find('\n').map_or(c.end, |i| from + i)
}

const LIST: Matcher = Matcher {
    name: "list",
    recognize: |c| {
        if !c.at_line_start() {
            return None;
        }
        let indent_len = c.rest().bytes().take_while(|&b| b == b' ' || b == b'\t').count();
        let indent = &c.src[c.at..c.at + indent_len];

        let mut items = Vec::new();
        let mut ordered = None;
        let mut pos = c.at + indent_len;
        loop {
            let Some((marker_len, item_ordered)) = list_marker(c, pos) else {
                break;
            };
            if ordered.is_some_and(|o| o != item_ordered) {
                break;
            }
            let start = pos + marker_len;
            let mut end = line_end(c, start);
            if end == start {
                break;
            }
            // Lines indented past the list's own indentation continue the item.
            while end < c.end {
                let next = end + 1;
                let continues = c.char_at(next).is_some_and(|ch| ch == ' ' || ch == '\t')
                    && c.src[next + 1..c.end].starts_with(indent);
                if !continues {
                    break;
                }
                end = line_end(c, next);
            }
            ordered = Some(item_ordered);
            items.push(Span::full(start..end));
            pos = end;
            // The break after the final item is left for the surrounding text.
            if end < c.end && list_marker(c, end + 1).is_some_and(|(_, o)| Some(o) == ordered) {
                pos = end + 1;
            } else {
                break;
            }
        }

        let ordered = ordered?;
        Some(Hit::new(pos - c.at, Shape::List { ordered, items }))
    },
};

// Mentions

fn mention(kind: MentionKind, id: Option<u64>, len: usize) -> Hit {
    Hit::new(len, Shape::Leaf(Node::Mention { kind, id }))
}

const EVERYONE: Matcher = Matcher {
    name: "everyone",
    recognize: |c| {
        c.rest()
            .starts_with("@everyone")
            .then(|| mention(MentionKind::Everyone, None, "@everyone".len()))
    },
};

const HERE: Matcher = Matcher {
    name: "here",
    recognize: |c| {
        c.rest()
            .starts_with("@here")
            .then(|| mention(MentionKind::Here, None, "@here".len()))
    },
};

static USER_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A<@(!)?(\d+)>").unwrap());
static ROLE_MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A<@&(\d+)>").unwrap());
static CHANNEL_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A<#!?(\d+)>").unwrap());

const USER_MENTION: Matcher = Matcher {
    name: "user_mention",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("<@") {
            return None;
        }
        let caps = USER_MENTION_RE.captures(rest)?;
        let id = caps[2].parse().ok()?;
        let kind = if caps.get(1).is_some() {
            MentionKind::UserNickname
        } else {
            MentionKind::User
        };
        Some(mention(kind, Some(id), caps[0].len()))
    },
};

const ROLE_MENTION: Matcher = Matcher {
    name: "role_mention",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("<@&") {
            return None;
        }
        let caps = ROLE_MENTION_RE.captures(rest)?;
        let id = caps[1].parse().ok()?;
        Some(mention(MentionKind::Role, Some(id), caps[0].len()))
    },
};

const CHANNEL_MENTION: Matcher = Matcher {
    name: "channel_mention",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("<#") {
            return None;
        }
        let caps = CHANNEL_MENTION_RE.captures(rest)?;
        let id = caps[1].parse().ok()?;
        Some(mention(MentionKind::Channel, Some(id), caps[0].len()))
    },
};

// Emoji

static CUSTOM_EMOJI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A<(a)?:([^:>\n]+):(\d+)>").unwrap());

const CUSTOM_EMOJI: Matcher = Matcher {
    name: "custom_emoji",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with('<') {
            return None;
        }
        let caps = CUSTOM_EMOJI_RE.captures(rest)?;
        let id = caps[3].parse().ok()?;
        Some(Hit::new(
            caps[0].len(),
            Shape::Leaf(Node::Emoji {
                name: caps[2].to_owned(),
                id: Some(id),
                animated: caps.get(1).is_some(),
            }),
        ))
    },
};

/// Regional-indicator pairs, keycaps, and pictographs optionally joined
/// into zero-width-joiner sequences.
static UNICODE_EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    let base = concat!(
        r"(?:[\x{1F000}-\x{1FAFF}]|[",
        r"\x{2600}-\x{2604}\x{260E}\x{2611}\x{2614}-\x{2615}\x{2618}\x{261D}\x{2620}",
        r"\x{2622}-\x{2623}\x{2626}\x{262A}\x{262E}-\x{262F}\x{2638}-\x{263A}",
        r"\x{2640}\x{2642}\x{2648}-\x{2653}\x{265F}-\x{2660}\x{2663}\x{2665}-\x{2666}",
        r"\x{2668}\x{267B}\x{267E}-\x{267F}\x{2692}-\x{2697}\x{2699}\x{269B}-\x{269C}",
        r"\x{26A0}-\x{26A1}\x{26A7}\x{26AA}-\x{26AB}\x{26B0}-\x{26B1}\x{26BD}-\x{26BE}",
        r"\x{26C4}-\x{26C5}\x{26C8}\x{26CE}-\x{26CF}\x{26D1}\x{26D3}-\x{26D4}",
        r"\x{26E9}-\x{26EA}\x{26F0}-\x{26F5}\x{26F7}-\x{26FA}\x{26FD}",
        r"])\x{FE0F}?",
    );
    Regex::new(&format!(
        r"\A(?:[\x{{1F1E6}}-\x{{1F1FF}}]{{2}}|[0-9#*]\x{{FE0F}}?\x{{20E3}}|{base}(?:\x{{200D}}{base})*)"
    ))
    .unwrap()
});

const UNICODE_EMOJI: Matcher = Matcher {
    name: "unicode_emoji",
    recognize: |c| {
        let first = c.byte(c.at)?;
        if first.is_ascii() && !matches!(first, b'0'..=b'9' | b'#' | b'*') {
            return None;
        }
        let m = UNICODE_EMOJI_RE.find(c.rest())?;
        Some(Hit::new(
            m.len(),
            Shape::Leaf(Node::Emoji {
                name: m.as_str().to_owned(),
                id: None,
                animated: false,
            }),
        ))
    },
};

static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A:([\w+\-]+):").unwrap());

const SHORTCODE_EMOJI: Matcher = Matcher {
    name: "shortcode_emoji",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with(':') {
            return None;
        }
        let caps = SHORTCODE_RE.captures(rest)?;
        let emoji = c.emoji.emoji(&caps[1])?;
        Some(Hit::new(
            caps[0].len(),
            Shape::Leaf(Node::Emoji {
                name: emoji.to_owned(),
                id: None,
                animated: false,
            }),
        ))
    },
};

// Timestamps and links

static TIMESTAMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A<t:(-?\d+)(?::(\w))?>").unwrap());

const TIMESTAMP: Matcher = Matcher {
    name: "timestamp",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("<t:") {
            return None;
        }
        let caps = TIMESTAMP_RE.captures(rest)?;
        // An unknown style or an epoch outside i64 still consumes the token,
        // but carries no date.
        let style = match caps.get(2) {
            Some(code) => code.as_str().chars().next().and_then(TimestampStyle::from_code),
            None => Some(TimestampStyle::default()),
        };
        let (style, epoch_seconds) = style
            .zip(caps[1].parse::<i64>().ok())
            .map_or((TimestampStyle::default(), None), |(style, secs)| {
                (style, Some(secs))
            });
        Some(Hit::new(
            caps[0].len(),
            Shape::Leaf(Node::Timestamp {
                epoch_seconds,
                style,
            }),
        ))
    },
};

static MASKED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A\[(.+?)\]\((.+?)\)").unwrap());

const MASKED_LINK: Matcher = Matcher {
    name: "masked_link",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with('[') {
            return None;
        }
        // Cheap check that `](` and a later `)` sit on this line.
        let line_end = find_from(c, "\n", c.at).unwrap_or(c.end);
        let middle = find_from(c, "](", c.at).filter(|&at| at < line_end)?;
        find_from(c, ")", middle + 3).filter(|&at| at < line_end)?;
        let caps = MASKED_LINK_RE.captures(rest)?;
        let label = caps.get(1)?;
        Some(Hit::new(
            caps[0].len(),
            Shape::MaskedLink {
                url: caps[2].to_owned(),
                label: Span::full(c.at + label.start()..c.at + label.end()),
            },
        ))
    },
};

static AUTO_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\Ahttps?://\S*[^.,:;"'\s]"#).unwrap());
static HIDDEN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\A<(https?://\S*[^.,:;"'\s])>"#).unwrap());

fn bare_link(url: &str, len: usize) -> Hit {
    Hit::new(
        len,
        Shape::Leaf(Node::Link {
            url: url.to_owned(),
            label: None,
        }),
    )
}

const AUTO_LINK: Matcher = Matcher {
    name: "auto_link",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("http") {
            return None;
        }
        let m = AUTO_LINK_RE.find(rest)?;
        Some(bare_link(m.as_str(), m.len()))
    },
};

const HIDDEN_LINK: Matcher = Matcher {
    name: "hidden_link",
    recognize: |c| {
        let rest = c.rest();
        if !rest.starts_with("<http") {
            return None;
        }
        let caps = HIDDEN_LINK_RE.captures(rest)?;
        Some(bare_link(&caps[1], caps[0].len()))
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    fn recognize(table: Table, text: &str) -> Option<(&'static str, usize)> {
        let scans = Scans::default();
        let cursor = Cursor {
            src: text,
            at: 0,
            end: text.len(),
            emoji: EmojiTable::builtin(),
            scans: &scans,
        };
        table
            .iter()
            .find_map(|m| (m.recognize)(&cursor).map(|hit| (m.name, hit.len)))
    }

    fn rule(text: &str) -> Option<&'static str> {
        recognize(FULL, text).map(|(name, _)| name)
    }

    #[test]
    fn rule_names_are_unique() {
        let mut names: Vec<_> = FULL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FULL.len());
    }

    #[test]
    fn shrug_wins_over_escape() {
        assert_eq!(rule(r"¯\_(ツ)_/¯ hi"), Some("shrug"));
        assert_eq!(rule(r"\_"), Some("escape"));
    }

    #[test]
    fn escape_rejects_letters_and_whitespace() {
        assert_eq!(rule(r"\a"), None);
        assert_eq!(rule("\\ "), None);
        assert_eq!(rule("\\\u{3000}"), Some("escape"));
    }

    #[test]
    fn italic_wrappers_take_priority_over_bold_and_underline() {
        assert_eq!(rule("***x***"), Some("italic_bold"));
        assert_eq!(rule("___x___"), Some("italic_underline"));
        assert_eq!(rule("**x**"), Some("bold"));
        assert_eq!(rule("__x__"), Some("underline"));
    }

    #[test]
    fn bold_closer_skips_runs_of_asterisks() {
        // The first `**` is followed by another `*`, so the closer is the last two.
        assert_eq!(recognize(FULL, "**a***"), Some(("bold", 6)));
    }

    #[test]
    fn italic_requires_tight_delimiters() {
        // A spaced asterisk at line start is a bullet, not emphasis.
        assert_eq!(rule("* x*"), Some("list"));
        assert_eq!(rule("*x *"), None);
        assert_eq!(rule("*x*"), Some("italic"));
    }

    #[test]
    fn italic_underscore_ignores_intra_word_closers() {
        assert_eq!(rule("_snake_case"), None);
        assert_eq!(recognize(FULL, "_a_b_ c"), Some(("italic_underscore", 5)));
    }

    #[test]
    fn inline_code_falls_back_to_single_tick() {
        assert_eq!(recognize(FULL, "``a``"), Some(("code_inline", 5)));
        assert_eq!(recognize(FULL, "`a` b"), Some(("code_inline", 3)));
        assert_eq!(rule("``a`"), None);
    }

    #[test]
    fn heading_needs_line_break() {
        assert_eq!(rule("# title"), None);
        assert_eq!(rule("# title\n"), Some("heading"));
        assert_eq!(rule("#### title\n"), None);
    }

    #[test]
    fn scans_answer_later_queries_from_earlier_searches() {
        let scans = Scans::default();
        let searches = std::cell::Cell::new(0);
        let search = |found: Option<usize>| {
            let searches = &searches;
            move |_: usize| {
                searches.set(searches.get() + 1);
                found
            }
        };

        assert_eq!(scans.first_from("_", 1, search(Some(10))), Some(10));
        assert_eq!(scans.first_from("_", 10, search(Some(99))), Some(10));
        assert_eq!(scans.first_from("__", 10, search(None)), None);
        assert_eq!(scans.first_from("_", 11, search(None)), None);
        assert_eq!(scans.first_from("_", 40, search(Some(99))), None);
        assert_eq!(scans.first_from("__", 12, search(Some(99))), None);
        assert_eq!(searches.get(), 3);
    }

    #[test]
    fn masked_link_needs_target_on_same_line() {
        assert_eq!(rule("[a](b)"), Some("masked_link"));
        assert_eq!(rule("[a]()"), None);
        assert_eq!(rule("[a](\nb)"), None);
        assert_eq!(rule("[[[a"), None);
    }

    #[test]
    fn line_rules_need_line_start() {
        let text = "a # title\n";
        let scans = Scans::default();
        let cursor = Cursor {
            src: text,
            at: 2,
            end: text.len(),
            emoji: EmojiTable::builtin(),
            scans: &scans,
        };
        assert!((HEADING.recognize)(&cursor).is_none());
    }

    #[test]
    fn repeated_quote_needs_two_lines() {
        assert_eq!(rule("> a\n> b"), Some("quote_repeated"));
        assert_eq!(rule("> a\nb"), Some("quote_line"));
        assert_eq!(rule(">>> a\nb"), Some("quote_multiline"));
    }

    #[test]
    fn list_leaves_trailing_break() {
        assert_eq!(recognize(FULL, "- a\n- b\nrest"), Some(("list", 7)));
        assert_eq!(recognize(FULL, "1. a\n2. b"), Some(("list", 9)));
        assert_eq!(recognize(FULL, "- a\n1. b"), Some(("list", 3)));
    }

    #[test]
    fn mentions_distinguish_kinds() {
        assert_eq!(rule("<@1>"), Some("user_mention"));
        assert_eq!(rule("<@!1>"), Some("user_mention"));
        assert_eq!(rule("<@&1>"), Some("role_mention"));
        assert_eq!(rule("<#1>"), Some("channel_mention"));
        assert_eq!(rule("<@99999999999999999999999>"), None);
    }

    #[test]
    fn emoji_rules() {
        assert_eq!(rule("<a:dance:1>"), Some("custom_emoji"));
        assert_eq!(rule("😄"), Some("unicode_emoji"));
        assert_eq!(rule("🇺🇸"), Some("unicode_emoji"));
        assert_eq!(rule("1\u{FE0F}\u{20E3}"), Some("unicode_emoji"));
        assert_eq!(rule(":smile:"), Some("shortcode_emoji"));
        assert_eq!(rule(":not_a_real_code:"), None);
        assert_eq!(rule("©"), Some("ignored_symbol"));
    }

    #[test]
    fn zwj_sequences_are_one_emoji() {
        let text = "👩\u{200D}💻";
        assert_eq!(recognize(FULL, text), Some(("unicode_emoji", text.len())));
    }

    #[test]
    fn timestamp_keeps_unreadable_tokens() {
        assert_eq!(rule("<t:1>"), Some("timestamp"));
        assert_eq!(rule("<t:1:R>"), Some("timestamp"));
        assert_eq!(rule("<t:1:x>"), Some("timestamp"));
        assert_eq!(rule("<t:99999999999999999999>"), Some("timestamp"));
    }

    #[test]
    fn links() {
        assert_eq!(rule("[a](https://x.y)"), Some("masked_link"));
        assert_eq!(
            recognize(FULL, "https://example.com/a."),
            Some(("auto_link", 21))
        );
        assert_eq!(rule("<https://example.com>"), Some("hidden_link"));
        assert_eq!(rule("http:"), None);
    }

    #[test]
    fn minimal_table_only_knows_mentions() {
        assert_eq!(recognize(MINIMAL, "**x**"), None);
        assert_eq!(recognize(MINIMAL, "@here"), Some(("here", 5)));
    }
}
