// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Emoji shortcodes and image URLs.
//!
//! The [`EmojiTable`] maps canonical shortcodes (`smile`) to unicode emoji
//! (`😄`) and back. The parser uses it to recognize `:smile:` tokens; the
//! renderers use it to title standard emoji with their shortcode. A small
//! built-in table covers the common cases, and callers with a complete
//! index can supply their own.

use std::collections::HashMap;
use std::sync::LazyLock;

const CUSTOM_EMOJI_BASE: &str = "https://cdn.discordapp.com/emojis";
const TWEMOJI_BASE: &str = "https://cdn.jsdelivr.net/gh/twitter/twemoji@latest/assets/svg";

const VARIATION_SELECTOR: char = '\u{FE0F}';
const ZERO_WIDTH_JOINER: char = '\u{200D}';

static BUILTIN: LazyLock<EmojiTable> = LazyLock::new(|| BUILTIN_PAIRS.iter().copied().collect());

/// Bidirectional mapping between shortcodes and unicode emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmojiTable {
    by_code: HashMap<String, String>,
    by_emoji: HashMap<String, String>,
}

impl EmojiTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of common emoji.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Adds a mapping. The first code registered for an emoji stays its
    /// canonical code; later aliases only resolve in the code direction.
    pub fn insert(&mut self, code: impl Into<String>, emoji: impl Into<String>) {
        let code = code.into();
        let emoji = emoji.into();
        self.by_emoji
            .entry(emoji.clone())
            .or_insert_with(|| code.clone());
        self.by_code.insert(code, emoji);
    }

    /// Looks up the emoji for a shortcode given without colons.
    #[must_use]
    pub fn emoji(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    /// Looks up the canonical shortcode for an emoji.
    #[must_use]
    pub fn code(&self, emoji: &str) -> Option<&str> {
        self.by_emoji.get(emoji).map(String::as_str)
    }

    /// Number of shortcodes in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

impl<C: Into<String>, E: Into<String>> FromIterator<(C, E)> for EmojiTable {
    fn from_iter<I: IntoIterator<Item = (C, E)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (code, emoji) in iter {
            table.insert(code, emoji);
        }
        table
    }
}

impl<C: Into<String>, E: Into<String>> Extend<(C, E)> for EmojiTable {
    fn extend<I: IntoIterator<Item = (C, E)>>(&mut self, iter: I) {
        for (code, emoji) in iter {
            self.insert(code, emoji);
        }
    }
}

/// The code shown for an emoji: the name of a custom emoji, or the
/// shortcode of a standard one (falling back to the character itself).
#[must_use]
pub fn display_code<'a>(table: &'a EmojiTable, name: &'a str, id: Option<u64>) -> &'a str {
    if id.is_some() {
        return name;
    }
    table.code(name).unwrap_or(name)
}

/// Default image URL for an emoji.
///
/// Custom emoji point at the platform CDN; standard emoji point at the
/// Twemoji SVG for their codepoints.
#[must_use]
pub fn default_image_url(name: &str, id: Option<u64>, animated: bool) -> String {
    match id {
        Some(id) => {
            let ext = if animated { "gif" } else { "png" };
            format!("{CUSTOM_EMOJI_BASE}/{id}.{ext}")
        }
        None => format!("{TWEMOJI_BASE}/{}.svg", twemoji_id(name)),
    }
}

/// Hyphen-joined hex codepoints, as Twemoji names its assets.
///
/// Variation selectors are dropped unless the sequence contains a
/// zero-width joiner.
fn twemoji_id(emoji: &str) -> String {
    let keep_selectors = emoji.contains(ZERO_WIDTH_JOINER);
    emoji
        .chars()
        .filter(|&c| keep_selectors || c != VARIATION_SELECTOR)
        .map(|c| format!("{:x}", u32::from(c)))
        .collect::<Vec<_>>()
        .join("-")
}

const BUILTIN_PAIRS: &[(&str, &str)] = &[
    ("grinning", "😀"),
    ("smiley", "😃"),
    ("smile", "😄"),
    ("grin", "😁"),
    ("laughing", "😆"),
    ("sweat_smile", "😅"),
    ("rofl", "🤣"),
    ("joy", "😂"),
    ("slight_smile", "🙂"),
    ("upside_down", "🙃"),
    ("wink", "😉"),
    ("blush", "😊"),
    ("innocent", "😇"),
    ("heart_eyes", "😍"),
    ("star_struck", "🤩"),
    ("kissing_heart", "😘"),
    ("yum", "😋"),
    ("stuck_out_tongue", "😛"),
    ("zany_face", "🤪"),
    ("hugging", "🤗"),
    ("thinking", "🤔"),
    ("zipper_mouth", "🤐"),
    ("neutral_face", "😐"),
    ("expressionless", "😑"),
    ("no_mouth", "😶"),
    ("smirk", "😏"),
    ("unamused", "😒"),
    ("rolling_eyes", "🙄"),
    ("grimacing", "😬"),
    ("relieved", "😌"),
    ("pensive", "😔"),
    ("sleepy", "😪"),
    ("sleeping", "😴"),
    ("mask", "😷"),
    ("nauseated_face", "🤢"),
    ("sneezing_face", "🤧"),
    ("hot_face", "🥵"),
    ("cold_face", "🥶"),
    ("dizzy_face", "😵"),
    ("exploding_head", "🤯"),
    ("cowboy", "🤠"),
    ("partying_face", "🥳"),
    ("sunglasses", "😎"),
    ("nerd", "🤓"),
    ("confused", "😕"),
    ("worried", "😟"),
    ("slight_frown", "🙁"),
    ("open_mouth", "😮"),
    ("astonished", "😲"),
    ("flushed", "😳"),
    ("pleading_face", "🥺"),
    ("fearful", "😨"),
    ("cold_sweat", "😰"),
    ("cry", "😢"),
    ("sob", "😭"),
    ("scream", "😱"),
    ("confounded", "😖"),
    ("persevere", "😣"),
    ("disappointed", "😞"),
    ("sweat", "😓"),
    ("weary", "😩"),
    ("tired_face", "😫"),
    ("yawning_face", "🥱"),
    ("triumph", "😤"),
    ("rage", "😡"),
    ("angry", "😠"),
    ("skull", "💀"),
    ("poop", "💩"),
    ("clown", "🤡"),
    ("ghost", "👻"),
    ("alien", "👽"),
    ("robot", "🤖"),
    ("eyes", "👀"),
    ("wave", "👋"),
    ("ok_hand", "👌"),
    ("pinching_hand", "🤏"),
    ("v", "✌️"),
    ("crossed_fingers", "🤞"),
    ("metal", "🤘"),
    ("point_left", "👈"),
    ("point_right", "👉"),
    ("point_up_2", "👆"),
    ("point_down", "👇"),
    ("thumbsup", "👍"),
    ("+1", "👍"),
    ("thumbsdown", "👎"),
    ("-1", "👎"),
    ("fist", "✊"),
    ("punch", "👊"),
    ("clap", "👏"),
    ("raised_hands", "🙌"),
    ("open_hands", "👐"),
    ("pray", "🙏"),
    ("handshake", "🤝"),
    ("muscle", "💪"),
    ("brain", "🧠"),
    ("heart", "❤️"),
    ("orange_heart", "🧡"),
    ("yellow_heart", "💛"),
    ("green_heart", "💚"),
    ("blue_heart", "💙"),
    ("purple_heart", "💜"),
    ("black_heart", "🖤"),
    ("broken_heart", "💔"),
    ("sparkling_heart", "💖"),
    ("100", "💯"),
    ("boom", "💥"),
    ("dizzy", "💫"),
    ("sweat_drops", "💦"),
    ("zzz", "💤"),
    ("fire", "🔥"),
    ("sparkles", "✨"),
    ("star", "⭐"),
    ("zap", "⚡"),
    ("sunny", "☀️"),
    ("cloud", "☁️"),
    ("snowflake", "❄️"),
    ("rainbow", "🌈"),
    ("tada", "🎉"),
    ("confetti_ball", "🎊"),
    ("gift", "🎁"),
    ("trophy", "🏆"),
    ("medal", "🏅"),
    ("soccer", "⚽"),
    ("basketball", "🏀"),
    ("video_game", "🎮"),
    ("dart", "🎯"),
    ("musical_note", "🎵"),
    ("notes", "🎶"),
    ("microphone", "🎤"),
    ("headphones", "🎧"),
    ("art", "🎨"),
    ("books", "📚"),
    ("pencil", "📝"),
    ("pushpin", "📌"),
    ("paperclip", "📎"),
    ("link", "🔗"),
    ("lock", "🔒"),
    ("key", "🔑"),
    ("hammer", "🔨"),
    ("wrench", "🔧"),
    ("gear", "⚙️"),
    ("bulb", "💡"),
    ("mag", "🔍"),
    ("bell", "🔔"),
    ("speaker", "🔈"),
    ("loud_sound", "🔊"),
    ("computer", "💻"),
    ("keyboard", "⌨️"),
    ("iphone", "📱"),
    ("email", "📧"),
    ("calendar", "📅"),
    ("hourglass", "⌛"),
    ("alarm_clock", "⏰"),
    ("rocket", "🚀"),
    ("airplane", "✈️"),
    ("car", "🚗"),
    ("house", "🏠"),
    ("earth_americas", "🌎"),
    ("moon", "🌙"),
    ("sun_with_face", "🌞"),
    ("coffee", "☕"),
    ("tea", "🍵"),
    ("beer", "🍺"),
    ("wine_glass", "🍷"),
    ("pizza", "🍕"),
    ("hamburger", "🍔"),
    ("fries", "🍟"),
    ("cake", "🍰"),
    ("cookie", "🍪"),
    ("apple", "🍎"),
    ("banana", "🍌"),
    ("avocado", "🥑"),
    ("dog", "🐶"),
    ("cat", "🐱"),
    ("mouse", "🐭"),
    ("fox", "🦊"),
    ("bear", "🐻"),
    ("panda_face", "🐼"),
    ("frog", "🐸"),
    ("monkey", "🐒"),
    ("see_no_evil", "🙈"),
    ("penguin", "🐧"),
    ("bird", "🐦"),
    ("snake", "🐍"),
    ("crab", "🦀"),
    ("bug", "🐛"),
    ("bee", "🐝"),
    ("unicorn", "🦄"),
    ("rose", "🌹"),
    ("sunflower", "🌻"),
    ("seedling", "🌱"),
    ("evergreen_tree", "🌲"),
    ("four_leaf_clover", "🍀"),
    ("white_check_mark", "✅"),
    ("heavy_check_mark", "✔️"),
    ("x", "❌"),
    ("warning", "⚠️"),
    ("no_entry", "⛔"),
    ("question", "❓"),
    ("exclamation", "❗"),
    ("red_circle", "🔴"),
    ("green_circle", "🟢"),
    ("blue_circle", "🔵"),
    ("arrow_up", "⬆️"),
    ("arrow_down", "⬇️"),
    ("arrow_left", "⬅️"),
    ("arrow_right", "➡️"),
    ("one", "1️⃣"),
    ("two", "2️⃣"),
    ("three", "3️⃣"),
    ("flag_us", "🇺🇸"),
    ("flag_gb", "🇬🇧"),
    ("flag_de", "🇩🇪"),
    ("flag_fr", "🇫🇷"),
    ("flag_jp", "🇯🇵"),
    ("rainbow_flag", "🏳️‍🌈"),
    ("man_technologist", "👨‍💻"),
    ("woman_technologist", "👩‍💻"),
];
