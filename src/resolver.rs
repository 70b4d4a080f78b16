// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Identity resolution for mentions and emoji.
//!
//! Renderers do not know who `<@123>` is. A [`Resolver`] supplied by the
//! caller maps mention ids and emoji to display data, possibly by awaiting
//! an external lookup. Rendering a message happens in two steps:
//!
//! 1. [`Resolutions::gather`] walks the tree, collects each distinct mention
//!    and emoji once, and awaits all of their lookups together.
//! 2. A synchronous visitor renders the tree from the gathered table.
//!
//! Only step 1 suspends. Independent messages can be rendered concurrently
//! by the caller; nothing here is shared between render calls.
//!
//! [`Directory`] is a ready-made resolver backed by a JSON file.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::future::Future;
use std::path::{Path, PathBuf};

use futures::future::{try_join, try_join_all};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::debug;

use crate::emoji::default_image_url;
use crate::node::{MentionKind, Node};
use crate::visitor::{Visitor, render};

/// Display data for a resolved user, role or channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionInfo {
    /// Name shown in the mention, without the `@` or `#` prefix.
    pub display_name: String,
    /// A longer form shown on hover, such as a user's account name.
    pub full_name: Option<String>,
    /// Highlight color as `#rrggbb`, for users and roles.
    pub color: Option<String>,
    /// Set for voice channels.
    pub voice: bool,
}

/// Display data for an emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiInfo {
    /// Image location for the emoji.
    pub image_url: String,
}

/// Maps identities found in messages to display data.
///
/// Implementations may suspend, e.g. to fill a cache from a remote API on
/// first use. Returning `Ok(None)` from [`Resolver::resolve_mention`] means
/// "not found" (a deleted user or stale id) and renders a fallback; an `Err`
/// aborts rendering of that message.
pub trait Resolver: Sync {
    /// Failure surfaced by the underlying lookup.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resolves a user, nickname, role or channel mention.
    fn resolve_mention(
        &self,
        kind: MentionKind,
        id: u64,
    ) -> impl Future<Output = Result<Option<MentionInfo>, Self::Error>> + Send;

    /// Resolves an emoji image. Defaults to the public CDN location.
    fn resolve_emoji(
        &self,
        name: &str,
        id: Option<u64>,
        animated: bool,
    ) -> impl Future<Output = Result<EmojiInfo, Self::Error>> + Send {
        let image_url = default_image_url(name, id, animated);
        async move { Ok(EmojiInfo { image_url }) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EmojiKey {
    name: String,
    id: Option<u64>,
    animated: bool,
}

/// Resolved display data for every identity in one message.
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    mentions: HashMap<(MentionKind, u64), Option<MentionInfo>>,
    emoji: HashMap<EmojiKey, EmojiInfo>,
}

impl Resolutions {
    /// Resolves each distinct mention and emoji in `nodes` exactly once.
    ///
    /// # Errors
    ///
    /// Returns the first resolver error; nothing is rendered in that case.
    pub async fn gather<R: Resolver + ?Sized>(nodes: &[Node], resolver: &R) -> Result<Self, R::Error> {
        let wanted = render(nodes, Wanted::default());

        let mentions = try_join_all(wanted.mentions.into_iter().map(|(kind, id)| async move {
            debug!(?kind, id, "resolving mention");
            let info = resolver.resolve_mention(kind, id).await?;
            if info.is_none() {
                debug!(?kind, id, "mention not found");
            }
            Ok::<_, R::Error>(((kind, id), info))
        }));
        let emoji = try_join_all(wanted.emoji.into_iter().map(|key| async move {
            debug!(name = %key.name, id = ?key.id, "resolving emoji");
            let info = resolver
                .resolve_emoji(&key.name, key.id, key.animated)
                .await?;
            Ok::<_, R::Error>((key, info))
        }));
        let (mentions, emoji) = try_join(mentions, emoji).await?;

        Ok(Self {
            mentions: mentions.into_iter().collect(),
            emoji: emoji.into_iter().collect(),
        })
    }

    /// Display data for a mention, or `None` if it was not found.
    #[must_use]
    pub fn mention(&self, kind: MentionKind, id: u64) -> Option<&MentionInfo> {
        self.mentions.get(&(kind, id)).and_then(Option::as_ref)
    }

    /// Image data for an emoji, if it was gathered.
    #[must_use]
    pub fn emoji(&self, name: &str, id: Option<u64>, animated: bool) -> Option<&EmojiInfo> {
        self.emoji.get(&EmojiKey {
            name: name.to_owned(),
            id,
            animated,
        })
    }
}

/// Collects distinct identities in first-seen order.
#[derive(Default)]
struct Wanted {
    mentions: Vec<(MentionKind, u64)>,
    emoji: Vec<EmojiKey>,
    seen_mentions: HashSet<(MentionKind, u64)>,
    seen_emoji: HashSet<EmojiKey>,
}

impl Visitor for Wanted {
    type Output = Self;

    fn finish(self) -> Self {
        self
    }

    fn visit_mention(&mut self, kind: MentionKind, id: Option<u64>) {
        if let Some(id) = id.filter(|_| kind.has_target())
            && self.seen_mentions.insert((kind, id))
        {
            self.mentions.push((kind, id));
        }
    }

    fn visit_emoji(&mut self, name: &str, id: Option<u64>, animated: bool) {
        let key = EmojiKey {
            name: name.to_owned(),
            id,
            animated,
        };
        if self.seen_emoji.insert(key.clone()) {
            self.emoji.push(key);
        }
    }
}

/// A user known to a [`Directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Account name.
    pub name: String,
    /// Server nickname, shown instead of the account name when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Top role color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A role known to a [`Directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Role name.
    pub name: String,
    /// Role color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A channel known to a [`Directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Channel name.
    pub name: String,
    /// Whether this is a voice channel.
    #[serde(default)]
    pub voice: bool,
}

/// Errors from [`Directory::load`].
#[derive(Debug, Snafu)]
pub enum DirectoryError {
    /// The file could not be read.
    #[snafu(display("failed to read directory {}: {source}", path.display()))]
    ReadDirectory {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid directory document.
    #[snafu(display("failed to parse directory {}: {source}", path.display()))]
    ParseDirectory {
        /// The file that was being parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// A fixed set of users, roles and channels, loaded from JSON.
///
/// ```json
/// {
///   "users": { "1": { "name": "alice", "nickname": "Al", "color": "#ff0000" } },
///   "roles": { "2": { "name": "mods", "color": "#00ff00" } },
///   "channels": { "3": { "name": "general" }, "4": { "name": "lounge", "voice": true } },
///   "emoji_base_url": "https://media.example.com/emojis"
/// }
/// ```
///
/// Lookups never fail; unknown ids resolve to "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directory {
    /// Users by id.
    pub users: HashMap<u64, UserEntry>,
    /// Roles by id.
    pub roles: HashMap<u64, RoleEntry>,
    /// Channels by id.
    pub channels: HashMap<u64, ChannelEntry>,
    /// Replaces the CDN base for custom emoji images, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji_base_url: Option<String>,
}

impl Directory {
    /// Parses a directory document.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid directory document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a directory file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path).context(ReadDirectorySnafu { path })?;
        Self::from_json(&json).context(ParseDirectorySnafu { path })
    }

    fn lookup(&self, kind: MentionKind, id: u64) -> Option<MentionInfo> {
        match kind {
            MentionKind::User | MentionKind::UserNickname => {
                self.users.get(&id).map(|user| MentionInfo {
                    display_name: user.nickname.clone().unwrap_or_else(|| user.name.clone()),
                    full_name: Some(user.name.clone()),
                    color: user.color.clone(),
                    voice: false,
                })
            }
            MentionKind::Role => self.roles.get(&id).map(|role| MentionInfo {
                display_name: role.name.clone(),
                color: role.color.clone(),
                ..MentionInfo::default()
            }),
            MentionKind::Channel => self.channels.get(&id).map(|channel| MentionInfo {
                display_name: channel.name.clone(),
                voice: channel.voice,
                ..MentionInfo::default()
            }),
            MentionKind::Everyone | MentionKind::Here => None,
        }
    }
}

impl Resolver for Directory {
    type Error = Infallible;

    async fn resolve_mention(
        &self,
        kind: MentionKind,
        id: u64,
    ) -> Result<Option<MentionInfo>, Infallible> {
        Ok(self.lookup(kind, id))
    }

    async fn resolve_emoji(
        &self,
        name: &str,
        id: Option<u64>,
        animated: bool,
    ) -> Result<EmojiInfo, Infallible> {
        let image_url = match (&self.emoji_base_url, id) {
            (Some(base), Some(id)) => {
                let ext = if animated { "gif" } else { "png" };
                format!("{}/{id}.{ext}", base.trim_end_matches('/'))
            }
            _ => default_image_url(name, id, animated),
        };
        Ok(EmojiInfo { image_url })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::parser::Parser;

    fn directory() -> Directory {
        Directory::from_json(
            r##"{
                "users": { "1": { "name": "alice", "nickname": "Al", "color": "#ff0000" },
                           "5": { "name": "bob" } },
                "roles": { "2": { "name": "mods", "color": "#00ff00" } },
                "channels": { "3": { "name": "general" }, "4": { "name": "lounge", "voice": true } }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn parses_directory_json() {
        let dir = directory();

        assert_eq!(dir.users[&1].nickname.as_deref(), Some("Al"));
        assert!(dir.channels[&4].voice);
        assert!(!dir.channels[&3].voice);
        assert_eq!(dir.emoji_base_url, None);
    }

    #[test]
    fn rejects_malformed_directory() {
        assert!(Directory::from_json(r#"{"users": []}"#).is_err());
    }

    #[test]
    fn load_reports_path() {
        let err = Directory::load(Path::new("/nonexistent/dir.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir.json"));
    }

    #[tokio::test]
    async fn directory_prefers_nickname() {
        let dir = directory();

        let al = dir.resolve_mention(MentionKind::User, 1).await.unwrap().unwrap();
        assert_eq!(al.display_name, "Al");
        assert_eq!(al.full_name.as_deref(), Some("alice"));
        assert_eq!(al.color.as_deref(), Some("#ff0000"));

        let bob = dir
            .resolve_mention(MentionKind::UserNickname, 5)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.display_name, "bob");
    }

    #[tokio::test]
    async fn directory_unknown_ids_are_not_found() {
        let dir = directory();

        assert_eq!(dir.resolve_mention(MentionKind::User, 99).await.unwrap(), None);
        assert_eq!(dir.resolve_mention(MentionKind::Role, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn directory_emoji_base_override() {
        let dir = Directory {
            emoji_base_url: Some("https://media.example.com/e/".into()),
            ..Directory::default()
        };

        let custom = dir.resolve_emoji("x", Some(7), true).await.unwrap();
        assert_eq!(custom.image_url, "https://media.example.com/e/7.gif");

        let standard = dir.resolve_emoji("😄", None, false).await.unwrap();
        assert_eq!(standard.image_url, default_image_url("😄", None, false));
    }

    /// Counts lookups to check deduplication.
    #[derive(Default)]
    struct Counting {
        mentions: AtomicUsize,
        emoji: AtomicUsize,
    }

    impl Resolver for Counting {
        type Error = Infallible;

        async fn resolve_mention(
            &self,
            _kind: MentionKind,
            id: u64,
        ) -> Result<Option<MentionInfo>, Infallible> {
            self.mentions.fetch_add(1, Ordering::Relaxed);
            Ok(Some(MentionInfo {
                display_name: format!("user{id}"),
                ..MentionInfo::default()
            }))
        }

        async fn resolve_emoji(
            &self,
            name: &str,
            _id: Option<u64>,
            _animated: bool,
        ) -> Result<EmojiInfo, Infallible> {
            self.emoji.fetch_add(1, Ordering::Relaxed);
            Ok(EmojiInfo {
                image_url: name.to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn gather_resolves_each_identity_once() {
        let nodes = Parser::default().parse("<@1> <@1> **<@1> <@2>** 😄 😄 <:x:9> @here");
        let counting = Counting::default();

        let resolved = Resolutions::gather(&nodes, &counting).await.unwrap();

        assert_eq!(counting.mentions.load(Ordering::Relaxed), 2);
        assert_eq!(counting.emoji.load(Ordering::Relaxed), 2);
        assert_eq!(
            resolved.mention(MentionKind::User, 2).map(|m| m.display_name.as_str()),
            Some("user2")
        );
        assert!(resolved.emoji("x", Some(9), false).is_some());
        assert!(resolved.emoji("x", Some(9), true).is_none());
    }

    /// Tracks how many mention lookups are suspended at once.
    #[derive(Default)]
    struct Slow {
        in_flight: AtomicUsize,
        most_in_flight: AtomicUsize,
    }

    impl Resolver for Slow {
        type Error = Infallible;

        async fn resolve_mention(
            &self,
            _kind: MentionKind,
            id: u64,
        ) -> Result<Option<MentionInfo>, Infallible> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.most_in_flight.fetch_max(now, Ordering::SeqCst);
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(MentionInfo {
                display_name: format!("user{id}"),
                ..MentionInfo::default()
            }))
        }
    }

    #[tokio::test]
    async fn gather_overlaps_lookups() {
        let nodes = Parser::default().parse("<@1> <@2> <@3> <@4> <@5>");
        let slow = Slow::default();

        let resolved = Resolutions::gather(&nodes, &slow).await.unwrap();

        assert_eq!(slow.most_in_flight.load(Ordering::SeqCst), 5);
        assert_eq!(slow.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(
            resolved.mention(MentionKind::User, 4).map(|m| m.display_name.as_str()),
            Some("user4")
        );
    }

    struct Failing;

    impl Resolver for Failing {
        type Error = std::io::Error;

        async fn resolve_mention(
            &self,
            _kind: MentionKind,
            _id: u64,
        ) -> Result<Option<MentionInfo>, std::io::Error> {
            Err(std::io::Error::other("lookup failed"))
        }
    }

    #[tokio::test]
    async fn gather_propagates_resolver_errors() {
        let nodes = Parser::default().parse("hi <@1>");

        let err = Resolutions::gather(&nodes, &Failing).await.unwrap_err();
        assert_eq!(err.to_string(), "lookup failed");
    }

    #[tokio::test]
    async fn gather_skips_resolver_without_identities() {
        let nodes = Parser::default().parse("plain **text** @everyone");

        let resolved = Resolutions::gather(&nodes, &Failing).await.unwrap();
        assert!(resolved.mention(MentionKind::User, 1).is_none());
    }
}
