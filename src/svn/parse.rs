//! Parsers for svn text and XML output
//!
//! The XML emitted by `svn log --xml` and `svn info --xml` is regular
//! enough to be read with a handful of patterns.

use crate::error::{Error, Result};
use crate::types::{ChangedPath, LogEntry};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static CONFLICT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^C\s+(.+)$").expect("valid regex"));
static COMMITTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Committed revision (\d+)\.").expect("valid regex"));
static REVISION_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"revision="(\d+)""#).expect("valid regex"));
static AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<author>(.*?)</author>").expect("valid regex"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<date>(.*?)</date>").expect("valid regex"));
static MSG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<msg>(.*?)</msg>").expect("valid regex"));
static PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<path\s([^>]*)>(.*?)</path>").expect("valid regex"));
static ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"action="(.)""#).expect("valid regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<url>(.*?)</url>").expect("valid regex"));

/// Placeholder returned when a revision has no log message
pub const NO_MESSAGE: &str = "No message found";

/// Conflicted paths reported by `svn merge`
///
/// `C <path>` lines yield the path; tree-conflict summary lines are kept
/// verbatim so the operator still sees them.
pub fn merge_conflicts(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            if let Some(caps) = CONFLICT_LINE.captures(line) {
                Some(caps[1].trim().to_string())
            } else if line.contains("Tree conflict") || line.contains("conflict discovered") {
                Some(line.trim().to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Revision created by `svn commit`
pub fn committed_revision(output: &str) -> Result<u64> {
    COMMITTED
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| {
            Error::Parse(format!(
                "no 'Committed revision' line in commit output: {}",
                output.trim()
            ))
        })
}

/// Decode the five predefined XML entities
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Entries from `svn log --xml [--verbose]`
///
/// Entries without a revision attribute are skipped.
pub fn log_entries(xml: &str) -> Vec<LogEntry> {
    xml.split("<logentry")
        .skip(1)
        .filter_map(|entry| {
            let revision = REVISION_ATTR.captures(entry)?[1].parse().ok()?;
            let author = AUTHOR
                .captures(entry)
                .map_or_else(|| "Unknown".to_string(), |c| decode_entities(&c[1]));
            let date = DATE
                .captures(entry)
                .and_then(|c| DateTime::parse_from_rfc3339(&c[1]).ok())
                .map(|d| d.with_timezone(&Utc));
            let message = MSG
                .captures(entry)
                .map(|c| decode_entities(&c[1]))
                .unwrap_or_default();
            let changed_paths = PATH
                .captures_iter(entry)
                .map(|c| ChangedPath {
                    action: ACTION
                        .captures(&c[1])
                        .map_or_else(|| "?".to_string(), |a| a[1].to_string()),
                    path: decode_entities(&c[2]),
                })
                .collect();

            Some(LogEntry {
                revision,
                author,
                date,
                message,
                changed_paths,
            })
        })
        .collect()
}

/// First log message in `svn log --xml` output, trimmed
///
/// An empty or missing message yields [`NO_MESSAGE`].
pub fn last_message(xml: &str) -> String {
    let message = MSG
        .captures(xml)
        .map(|c| decode_entities(&c[1]))
        .unwrap_or_default();
    let message = message.trim();
    if message.is_empty() {
        NO_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// Revisions listed by `svn mergeinfo --show-revs merged` (`r123` lines)
pub fn merged_revisions(stdout: &str) -> Vec<u64> {
    stdout
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('r').unwrap_or(line).parse().ok())
        .collect()
}

/// Repository URL from `svn info --xml`
pub fn info_url(xml: &str) -> Option<String> {
    URL.captures(xml)
        .map(|c| decode_entities(&c[1]))
        .filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<log>
<logentry
   revision="1420">
<author>mika</author>
<date>2024-03-05T08:15:30.123456Z</date>
<paths>
<path
   kind="file"
   action="M">/trunk/Server/Data/items.xml</path>
<path
   kind="file"
   action="A">/trunk/Server/Data/new &amp; shiny.xml</path>
</paths>
<msg>Fix drop table &lt;boss&gt;
second line</msg>
</logentry>
<logentry
   revision="1419">
<date>bogus</date>
<msg></msg>
</logentry>
</log>"#;

    #[test]
    fn test_merge_conflicts_text_and_tree() {
        let out = "--- Merging r900 into 'Server/Data':\n\
                   U    Server/Data/a.xml\n\
                   C    Server/Data/b.xml\n\
                   Tree conflict on 'Server/Data/c.xml'\n";
        let conflicts = merge_conflicts(out);
        assert_eq!(
            conflicts,
            vec![
                "Server/Data/b.xml".to_string(),
                "Tree conflict on 'Server/Data/c.xml'".to_string()
            ]
        );
    }

    #[test]
    fn test_merge_conflicts_clean() {
        assert!(merge_conflicts("--- Merging r1 into '.':\nU    a.txt\n").is_empty());
    }

    #[test]
    fn test_committed_revision() {
        let out = "Sending        a.xml\nTransmitting file data .done\nCommitting transaction...\nCommitted revision 1421.\n";
        assert_eq!(committed_revision(out).unwrap(), 1421);
    }

    #[test]
    fn test_committed_revision_missing_is_parse_error() {
        assert!(matches!(committed_revision(""), Err(Error::Parse(_))));
    }

    #[test]
    fn test_log_entries() {
        let entries = log_entries(LOG_XML);
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.revision, 1420);
        assert_eq!(first.author, "mika");
        assert!(first.date.is_some());
        assert_eq!(first.message, "Fix drop table <boss>\nsecond line");
        assert_eq!(first.changed_paths.len(), 2);
        assert_eq!(first.changed_paths[0].action, "M");
        assert_eq!(first.changed_paths[1].path, "/trunk/Server/Data/new & shiny.xml");

        let second = &entries[1];
        assert_eq!(second.author, "Unknown");
        assert!(second.date.is_none());
        assert!(second.message.is_empty());
    }

    #[test]
    fn test_last_message() {
        assert_eq!(last_message(LOG_XML), "Fix drop table <boss>\nsecond line");
        assert_eq!(last_message("<log></log>"), NO_MESSAGE);
    }

    #[test]
    fn test_merged_revisions() {
        assert_eq!(merged_revisions("r10\nr11\n\nr15\nnoise\n"), vec![10, 11, 15]);
    }

    #[test]
    fn test_info_url() {
        let xml = "<info><entry><url>svn://host/repo/trunk</url></entry></info>";
        assert_eq!(info_url(xml).as_deref(), Some("svn://host/repo/trunk"));
        assert_eq!(info_url("<info/>"), None);
    }
}
