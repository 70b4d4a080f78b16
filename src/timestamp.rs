// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Timestamp styles and absolute date formatting.
//!
//! A `<t:epoch:S>` token names one of eight display styles. Seven of them
//! describe an absolute rendering. The eighth, `R`, means "relative to now",
//! which has no meaning once a message is frozen into an export, so it is
//! rendered with the same absolute fallback as an unstyled timestamp.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Text rendered for an epoch value outside chrono's representable range.
pub const INVALID_DATE: &str = "Invalid date";

/// Display style of a timestamp token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampStyle {
    /// `t`: short time, `16:20`.
    #[serde(rename = "t")]
    ShortTime,
    /// `T`: long time, `16:20:30`.
    #[serde(rename = "T")]
    LongTime,
    /// `d`: short date, `04/20/2021`.
    #[serde(rename = "d")]
    ShortDate,
    /// `D`: long date, `April 20, 2021`.
    #[serde(rename = "D")]
    LongDate,
    /// `f`: long date with short time.
    #[serde(rename = "f")]
    LongDateShortTime,
    /// `F`: weekday, long date and short time.
    #[serde(rename = "F")]
    FullDateTime,
    /// `g`: short date with short time; used when a token names no style.
    #[default]
    #[serde(rename = "g")]
    ShortDateTime,
    /// `R`: relative to the reader's clock.
    #[serde(rename = "R")]
    Relative,
}

impl TimestampStyle {
    /// Parses a style letter. `r` is accepted as an alias of `R`.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        Some(match code {
            't' => Self::ShortTime,
            'T' => Self::LongTime,
            'd' => Self::ShortDate,
            'D' => Self::LongDate,
            'f' => Self::LongDateShortTime,
            'F' => Self::FullDateTime,
            'g' => Self::ShortDateTime,
            'R' | 'r' => Self::Relative,
            _ => return None,
        })
    }

    /// The style letter as written in a token.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::ShortTime => 't',
            Self::LongTime => 'T',
            Self::ShortDate => 'd',
            Self::LongDate => 'D',
            Self::LongDateShortTime => 'f',
            Self::FullDateTime => 'F',
            Self::ShortDateTime => 'g',
            Self::Relative => 'R',
        }
    }

    /// Whether this style can be rendered as an absolute date.
    #[must_use]
    pub const fn is_absolute(self) -> bool {
        !matches!(self, Self::Relative)
    }

    /// The style actually used for rendering. Relative timestamps fall back
    /// to [`TimestampStyle::ShortDateTime`].
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Relative => Self::ShortDateTime,
            other => other,
        }
    }

    const fn pattern(self) -> &'static str {
        match self.effective() {
            Self::ShortTime => "%H:%M",
            Self::LongTime => "%H:%M:%S",
            Self::ShortDate => "%m/%d/%Y",
            Self::LongDate => "%B %d, %Y",
            Self::LongDateShortTime => "%B %d, %Y %H:%M",
            Self::FullDateTime => "%A, %B %d, %Y %H:%M",
            Self::ShortDateTime | Self::Relative => "%m/%d/%Y %H:%M",
        }
    }
}

/// Formats `epoch_seconds` in the given style and offset.
///
/// Never returns an empty string: a missing epoch, or one chrono cannot
/// represent, renders as [`INVALID_DATE`].
#[must_use]
pub fn format_timestamp(
    epoch_seconds: Option<i64>,
    style: TimestampStyle,
    offset: FixedOffset,
) -> String {
    epoch_seconds
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || INVALID_DATE.to_owned(),
            |dt| {
                dt.with_timezone(&offset)
                    .format(style.pattern())
                    .to_string()
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2009-02-13 23:31:30 UTC
    const EPOCH: i64 = 1_234_567_890;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn formats_each_absolute_style() {
        let cases = [
            (TimestampStyle::ShortTime, "23:31"),
            (TimestampStyle::LongTime, "23:31:30"),
            (TimestampStyle::ShortDate, "02/13/2009"),
            (TimestampStyle::LongDate, "February 13, 2009"),
            (TimestampStyle::LongDateShortTime, "February 13, 2009 23:31"),
            (
                TimestampStyle::FullDateTime,
                "Friday, February 13, 2009 23:31",
            ),
            (TimestampStyle::ShortDateTime, "02/13/2009 23:31"),
        ];

        for (style, expected) in cases {
            assert_eq!(format_timestamp(Some(EPOCH), style, utc()), expected, "{style:?}");
        }
    }

    #[test]
    fn relative_uses_short_date_time_fallback() {
        let relative = format_timestamp(Some(EPOCH), TimestampStyle::Relative, utc());

        assert_eq!(relative, "02/13/2009 23:31");
        assert!(!relative.is_empty());
    }

    #[test]
    fn applies_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            format_timestamp(Some(EPOCH), TimestampStyle::ShortTime, plus_two),
            "01:31"
        );
    }

    #[test]
    fn out_of_range_epoch_is_invalid_date() {
        assert_eq!(
            format_timestamp(Some(i64::MAX), TimestampStyle::ShortDate, utc()),
            INVALID_DATE
        );
        assert_eq!(
            format_timestamp(None, TimestampStyle::ShortDate, utc()),
            INVALID_DATE
        );
    }

    #[test]
    fn parses_style_codes() {
        for code in ['t', 'T', 'd', 'D', 'f', 'F', 'g', 'R'] {
            let style = TimestampStyle::from_code(code).unwrap();
            assert_eq!(style.code(), code);
        }
        assert_eq!(
            TimestampStyle::from_code('r'),
            Some(TimestampStyle::Relative)
        );
        assert_eq!(TimestampStyle::from_code('x'), None);
        assert!(!TimestampStyle::Relative.is_absolute());
    }
}
