//! Git commit object
//!
//! Only the header block of a commit is interpreted:
//!
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! Merge commits list several `parent` lines; only the first one is kept.

use crate::artifacts::objects::object_id::ObjectId;
use chrono::{DateTime, FixedOffset};

/// Header fields of one commit found while scanning a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommit {
    id: ObjectId,
    /// Root tree; `None` only for malformed commits
    tree: Option<ObjectId>,
    /// First parent, `None` for root commits
    parent: Option<ObjectId>,
    /// `Name <email>` without the trailing timestamp and timezone
    author: String,
    committer: String,
    committed_at: Option<DateTime<FixedOffset>>,
}

impl GitCommit {
    /// Decode a commit body
    ///
    /// Unknown headers (gpgsig, encoding, mergetag...) are ignored and parsing
    /// stops at the blank line that starts the message. A missing or invalid
    /// `tree` line yields a commit without a tree instead of an error.
    pub fn parse(id: ObjectId, body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body);

        let mut tree = None;
        let mut parent = None;
        let mut author = String::new();
        let mut committer = String::new();
        let mut committed_at = None;

        for line in body.lines() {
            if line.is_empty() {
                break;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.first().copied() {
                Some("tree") if tree.is_none() => {
                    tree = tokens.get(1).and_then(|t| ObjectId::try_parse(t).ok());
                }
                Some("parent") if parent.is_none() => {
                    parent = tokens.get(1).and_then(|t| ObjectId::try_parse(t).ok());
                }
                Some("author") => author = identity(&tokens),
                Some("committer") => {
                    committer = identity(&tokens);
                    committed_at = timestamp(&tokens);
                }
                _ => {}
            }
        }

        GitCommit {
            id,
            tree,
            parent,
            author,
            committer,
            committed_at,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn tree_oid(&self) -> Option<&ObjectId> {
        self.tree.as_ref()
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parent.as_ref()
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn committer(&self) -> &str {
        &self.committer
    }

    pub fn committed_at(&self) -> Option<DateTime<FixedOffset>> {
        self.committed_at
    }
}

/// Text between the header tag and the trailing timestamp/timezone pair
fn identity(tokens: &[&str]) -> String {
    let end = tokens.len().saturating_sub(2).max(1);
    tokens.get(1..end).map(|t| t.join(" ")).unwrap_or_default()
}

fn timestamp(tokens: &[&str]) -> Option<DateTime<FixedOffset>> {
    let [.., seconds, zone] = tokens else {
        return None;
    };
    let seconds = seconds.parse::<i64>().ok()?;
    let offset = parse_timezone(zone)?;

    DateTime::from_timestamp(seconds, 0).map(|utc| utc.with_timezone(&offset))
}

/// Parse a `+hhmm`/`-hhmm` timezone field
fn parse_timezone(zone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
