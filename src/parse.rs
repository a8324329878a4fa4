//! Line parsers for the three `git log` output shapes.
//!
//! Every parser is best-effort: a line that does not fit its format is skipped,
//! never reported. The iterator adapters keep parsing lazy so only the reduced
//! aggregates outlive a line.

use crate::git::query::COMMIT_FIELD_SEPARATOR;
use crate::model::CommitRecord;
use chrono::DateTime;
use chrono_tz::Tz;

/// One `--numstat` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumStatEntry {
    Text {
        insertions: u64,
        deletions: u64,
        path: String,
    },
    /// git prints `-` for both counts when it considers the file binary
    Binary { path: String },
}

/// `<timestamp>|<subject>`, with the date taken in `tz` rather than the
/// committer's own offset.
pub fn parse_commit_line(line: &str, tz: &Tz) -> Option<CommitRecord> {
    let (stamp, subject) = line.split_once(COMMIT_FIELD_SEPARATOR)?;
    let instant = DateTime::parse_from_rfc3339(stamp.trim()).ok()?;
    Some(CommitRecord {
        date: instant.with_timezone(tz).date_naive(),
        message: subject.trim().to_string(),
    })
}

pub fn parse_numstat_line(line: &str) -> Option<NumStatEntry> {
    let mut fields = line.splitn(3, '\t');
    let added = fields.next()?.trim();
    let deleted = fields.next()?.trim();
    let path = fields.next()?.trim();
    if path.is_empty() {
        return None;
    }

    match (added.parse::<u64>(), deleted.parse::<u64>()) {
        (Ok(insertions), Ok(deletions)) => Some(NumStatEntry::Text {
            insertions,
            deletions,
            path: path.to_string(),
        }),
        _ if is_placeholder(added) && is_placeholder(deleted) => Some(NumStatEntry::Binary {
            path: path.to_string(),
        }),
        _ => None,
    }
}

fn is_placeholder(field: &str) -> bool {
    !field.is_empty() && field.parse::<u64>().is_err()
}

pub fn parse_name_line(line: &str) -> Option<&str> {
    let path = line.trim();
    (!path.is_empty()).then_some(path)
}

pub fn commit_records<I>(lines: I, tz: Tz) -> impl Iterator<Item = CommitRecord>
where
    I: IntoIterator<Item = String>,
{
    lines
        .into_iter()
        .filter_map(move |line| parse_commit_line(&line, &tz))
}

pub fn numstat_entries<I>(lines: I) -> impl Iterator<Item = NumStatEntry>
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().filter_map(|line| parse_numstat_line(&line))
}

pub fn changed_paths<I>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = String>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_name_line(&line).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn commit_dates_use_the_analysis_zone() {
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        // 20:00 in New York is already the next morning in Tokyo
        let rec = parse_commit_line("2025-06-20T20:00:00-04:00|feat: add parser", &tokyo).unwrap();
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
        assert_eq!(rec.message, "feat: add parser");

        let rec = parse_commit_line("2025-06-20T20:00:00-04:00|feat: add parser", &Tz::UTC).unwrap();
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2025, 6, 21).unwrap());
        let ny: Tz = "America/New_York".parse().unwrap();
        let rec = parse_commit_line("2025-06-20T20:00:00-04:00|x", &ny).unwrap();
        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());
    }

    #[test]
    fn subject_keeps_later_separators() {
        let rec = parse_commit_line("2025-01-02T03:04:05+00:00|a | b", &Tz::UTC).unwrap();
        assert_eq!(rec.message, "a | b");
    }

    #[test]
    fn malformed_commit_lines_are_skipped() {
        let recs: Vec<_> = commit_records(
            lines(&[
                "no separator here",
                "yesterday|bad timestamp",
                "",
                "2025-01-02T03:04:05Z|ok",
            ]),
            Tz::UTC,
        )
        .collect();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].message, "ok");
    }

    #[test]
    fn numstat_text_and_binary_rows() {
        assert_eq!(
            parse_numstat_line("12\t4\tfoo.go"),
            Some(NumStatEntry::Text {
                insertions: 12,
                deletions: 4,
                path: "foo.go".to_string()
            })
        );
        assert_eq!(
            parse_numstat_line("-\t-\tbinary.png"),
            Some(NumStatEntry::Binary {
                path: "binary.png".to_string()
            })
        );
    }

    #[test]
    fn numstat_noise_is_skipped() {
        let entries: Vec<_> = numstat_entries(lines(&[
            "",
            "3\t1",
            "x y z",
            "7\t\tmissing.rs",
            "1\t2\tpath with\ttab.txt",
        ]))
        .collect();
        assert_eq!(
            entries,
            vec![NumStatEntry::Text {
                insertions: 1,
                deletions: 2,
                path: "path with\ttab.txt".to_string()
            }]
        );
    }

    #[test]
    fn name_only_skips_blank_separators() {
        let paths: Vec<_> = changed_paths(lines(&["src/a.rs", "", "  ", "src/b.rs", "src/a.rs"])).collect();
        assert_eq!(paths, vec!["src/a.rs", "src/b.rs", "src/a.rs"]);
    }
}
