use chrono::{Datelike, Month, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use super::mode::{parse_mode, EntryKind, FileMode};
use crate::{
    error::{Error, SftpResult},
    utils,
};

const LINK_ARROW: &str = " -> ";

/// One entry of a long directory listing.
///
/// `desc` is the entry name. `root` is the directory the listing was made
/// in; for symlinks it also carries ` -> <target directory>`. Entries sort by
/// name, then size and modification time, and compare equal on those three.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatEntry {
    pub desc: String,
    pub root: String,
    pub mode: FileMode,
    pub nlink: u64,
    pub user: String,
    pub group: String,
    pub size: u64,
    /// Seconds since the epoch
    pub mtime: f64,
    /// Raw link target as printed by the server
    pub link_target: Option<String>,
}

impl StatEntry {
    /// Returns the object kind of this entry, symlinks are not followed
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.mode.kind().unwrap_or(EntryKind::File)
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind() == EntryKind::File
    }

    #[must_use]
    pub fn is_symlink(&self) -> bool {
        self.kind() == EntryKind::Symlink
    }

    /// Returns the size of the file
    #[must_use]
    pub fn len(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the last modification time
    #[must_use]
    pub fn modified(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs_f64(self.mtime.max(0.0))
    }
}

impl PartialEq for StatEntry {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.size == other.size && self.mtime == other.mtime
    }
}

impl PartialOrd for StatEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.desc.cmp(&other.desc).then(self.size.cmp(&other.size)) {
            Ordering::Equal => self.mtime.partial_cmp(&other.mtime),
            ordering => Some(ordering),
        }
    }
}

/// Splits a listing line into its eight metadata columns and the free-form name
fn split_fields(line: &str) -> Option<([&str; 8], &str)> {
    let mut fields = [""; 8];
    let mut rest = line;

    for field in &mut fields {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        *field = &rest[..end];
        rest = &rest[end..];
    }

    let name = rest.trim_start();
    if name.is_empty() {
        return None;
    }

    Some((fields, name))
}

/// Parses one line of a long listing:
/// `<mode> <nlink> <user> <group> <size> <month> <day> <year|HH:MM> <name...>`
pub fn parse_line(line: &str, root: &str) -> SftpResult<StatEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let ([mode, nlink, user, group, size, month, day, year_or_time], name) =
        split_fields(line).ok_or_else(|| Error::parse(line, "expected at least 9 fields"))?;

    let whole_line = |err: Error| match err {
        Error::Parse { reason, .. } => Error::parse(line, reason),
        other => other,
    };

    let mode = parse_mode(mode).map_err(whole_line)?;
    let nlink = nlink
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid link count {nlink:?}")))?;
    let size = size
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid size {size:?}")))?;
    let mtime = parse_date(month, day, year_or_time).map_err(whole_line)?;

    let mut entry = StatEntry {
        desc: name.to_owned(),
        root: root.to_owned(),
        mode,
        nlink,
        user: user.to_owned(),
        group: group.to_owned(),
        size,
        mtime,
        link_target: None,
    };

    if mode.kind() == Some(EntryKind::Symlink) {
        match name.split(LINK_ARROW).collect::<Vec<_>>()[..] {
            [link, target] => {
                entry.desc = link.to_owned();
                entry.root = format!("{root}{LINK_ARROW}{}", utils::dirname(target));
                entry.link_target = Some(target.to_owned());
            }
            _ => warn!("unexpected symlink syntax {name:?}, keeping it as the entry name"),
        }
    }

    Ok(entry)
}

/// Converts the `ls` timestamp columns to seconds since the epoch (UTC).
///
/// The third column is either a year, for old entries, or `HH:MM` for recent
/// ones in which case the current year is assumed.
pub fn parse_date(month: &str, day: &str, year_or_time: &str) -> SftpResult<f64> {
    let context = || format!("{month} {day} {year_or_time}");

    let month = month
        .parse::<Month>()
        .map_err(|_| Error::parse(context(), format!("invalid month {month:?}")))?
        .number_from_month();
    let day: u32 = day
        .parse()
        .map_err(|_| Error::parse(context(), format!("invalid day {day:?}")))?;

    let (year, hour, minute) = match year_or_time.split_once(':') {
        Some((hour, minute)) => (
            Utc::now().year(),
            hour.parse::<u32>()
                .map_err(|_| Error::parse(context(), "invalid hour"))?,
            minute
                .parse::<u32>()
                .map_err(|_| Error::parse(context(), "invalid minute"))?,
        ),
        None => (
            year_or_time
                .parse::<i32>()
                .map_err(|_| Error::parse(context(), "invalid year"))?,
            0,
            0,
        ),
    };

    let datetime = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| Error::parse(context(), "date out of range"))?;

    Ok(datetime.and_utc().timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regular_file_with_spaces() {
        let entry = parse_line(
            "-rw-r--r--    1 demo     users        1024 Mar 04  2021 annual report.txt",
            "/pub/",
        )
        .unwrap();

        assert_eq!(entry.desc, "annual report.txt");
        assert_eq!(entry.root, "/pub/");
        assert!(entry.is_file());
        assert_eq!(entry.nlink, 1);
        assert_eq!(entry.user, "demo");
        assert_eq!(entry.group, "users");
        assert_eq!(entry.len(), 1024);
        assert_eq!(entry.mtime, 1_614_816_000.0);
        assert_eq!(entry.link_target, None);
    }

    #[test]
    fn test_parse_directory() {
        let entry =
            parse_line("drwxr-xr-x 3 root root 4096 Oct 17 2019 example\r\n", "/pub/").unwrap();
        assert!(entry.is_dir());
        assert_eq!(entry.desc, "example");
        assert_eq!(entry.mode.permissions(), 0o755);
    }

    #[test]
    fn test_parse_symlink() {
        let entry = parse_line(
            "lrwxrwxrwx 1 root root 11 Jan 01 2020 latest -> releases/v2/readme.md",
            "/pub/",
        )
        .unwrap();

        assert!(entry.is_symlink());
        assert_eq!(entry.desc, "latest");
        assert_eq!(entry.root, "/pub/ -> releases/v2");
        assert_eq!(entry.link_target.as_deref(), Some("releases/v2/readme.md"));
    }

    #[test]
    fn test_parse_symlink_without_arrow_keeps_raw_name() {
        let entry = parse_line("lrwxrwxrwx 1 root root 11 Jan 01 2020 dangling", "/").unwrap();
        assert!(entry.is_symlink());
        assert_eq!(entry.desc, "dangling");
        assert_eq!(entry.root, "/");
        assert_eq!(entry.link_target, None);
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(matches!(
            parse_line("drwxr-xr-x 3 root root 4096 Oct 17 2019", "/"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            parse_line("drwxr-xr-x+ 3 root root 4096 Oct 17 2019 x", "/"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            parse_line("drwxr-xr-x many root root 4096 Oct 17 2019 x", "/"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_date_year_form() {
        assert_eq!(parse_date("Jan", "1", "1970").unwrap(), 0.0);
        assert_eq!(parse_date("Feb", "29", "2020").unwrap(), 1_582_934_400.0);
    }

    #[test]
    fn test_parse_date_time_form_uses_current_year() {
        let year = Utc::now().year();
        let expected = NaiveDate::from_ymd_opt(year, 6, 15)
            .and_then(|d| d.and_hms_opt(13, 45, 0))
            .unwrap()
            .and_utc()
            .timestamp() as f64;

        assert_eq!(parse_date("Jun", "15", "13:45").unwrap(), expected);
    }

    #[test]
    fn test_parse_date_errors() {
        assert!(parse_date("Foo", "1", "2020").is_err());
        assert!(parse_date("Jan", "32", "2020").is_err());
        assert!(parse_date("Jan", "1", "25:99").is_err());
    }

    #[test]
    fn test_entry_ordering_and_equality() {
        let a = parse_line("-rw-r--r-- 1 u g 5 Jan 01 2020 a", "/x/").unwrap();
        let b = parse_line("-rw-r--r-- 1 u g 5 Jan 01 2020 b", "/x/").unwrap();
        let a_elsewhere = parse_line("-rwx------ 2 v h 5 Jan 01 2020 a", "/y/").unwrap();

        assert!(a < b);
        assert_eq!(a, a_elsewhere);
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_ordering_agrees_with_equality() {
        let small = parse_line("-rw-r--r-- 1 u g 5 Jan 01 2020 a", "/x/").unwrap();
        let large = parse_line("-rw-r--r-- 1 u g 9 Jan 01 2020 a", "/x/").unwrap();
        let newer = parse_line("-rw-r--r-- 1 u g 5 Feb 01 2020 a", "/x/").unwrap();

        assert_ne!(small, large);
        assert_ne!(small.partial_cmp(&large), Some(Ordering::Equal));
        assert!(small < large);
        assert!(small < newer);
        assert_eq!(small.partial_cmp(&small.clone()), Some(Ordering::Equal));
    }
}
