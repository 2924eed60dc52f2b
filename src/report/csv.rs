//! CSV report writer

use super::ReportRow;
use std::io::{self, Write};

const HEADER: [&str; 16] = [
    "file_name",
    "file_path",
    "classification",
    "reason",
    "format",
    "bitrate",
    "sample_rate",
    "channels",
    "duration",
    "cutoff_frequency",
    "high_freq_energy",
    "spectral_presence",
    "has_content_above_20k",
    "dynamic_range",
    "file_size",
    "error",
];

/// Quote a field when it contains a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fields(row: &ReportRow) -> [String; 16] {
    [
        escape(&row.file_name),
        escape(&row.file_path),
        row.classification.to_string(),
        escape(&row.reason),
        escape(&row.format),
        opt(row.bitrate),
        opt(row.sample_rate),
        opt(row.channels),
        opt(row.duration.map(|d| format!("{:.2}", d))),
        opt(row.cutoff_frequency.map(|c| format!("{:.0}", c))),
        opt(row.high_freq_energy.map(|e| format!("{:.2}", e))),
        opt(row.spectral_presence.map(|p| format!("{:.2}", p))),
        opt(row.has_content_above_20k),
        opt(row.dynamic_range.map(|d| format!("{:.2}", d))),
        row.file_size.to_string(),
        row.error.as_deref().map(escape).unwrap_or_default(),
    ]
}

pub fn write<W: Write>(writer: &mut W, rows: &[ReportRow]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER.join(","))?;
    for row in rows {
        writeln!(writer, "{}", fields(row).join(","))?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classification, ClassificationOutcome};
    use crate::report::tests::{analyzed, row, sample_features};

    fn render(rows: &[ReportRow]) -> String {
        let mut out = Vec::new();
        write(&mut out, rows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_header_only_for_empty_batch() {
        let out = render(&[]);
        assert_eq!(out.lines().count(), 1);
        assert_eq!(out.lines().next().unwrap().split(',').count(), HEADER.len());
    }

    #[test]
    fn test_row_values() {
        let out = render(&[row(Classification::Fake)]);
        let line = out.lines().nth(1).unwrap();
        let cols: Vec<&str> = line.split(',').collect();

        assert_eq!(cols.len(), HEADER.len());
        assert_eq!(cols[0], "x.flac");
        assert_eq!(cols[2], "fake");
        assert_eq!(cols[5], "880000");
        assert_eq!(cols[8], ""); // duration unknown
        assert_eq!(cols[9], "16000");
        assert_eq!(cols[10], "-78.50");
        assert_eq!(cols[12], "false");
        assert_eq!(cols[13], ""); // dynamic range unknown
        assert_eq!(cols[14], "25000000");
        assert_eq!(cols[15], "");
    }

    #[test]
    fn test_reason_with_comma_is_quoted() {
        let outcome = ClassificationOutcome::new(Classification::Suspicious, "320kbps, cutoff at 17000 Hz");
        let r = ReportRow::new(&analyzed("a.mp3", Some(sample_features()), None), &outcome);
        let out = render(&[r]);
        assert!(out.contains("\"320kbps, cutoff at 17000 Hz\""));
    }

    #[test]
    fn test_error_row_has_empty_features() {
        let outcome = ClassificationOutcome::new(Classification::Error, "Decode error: truncated");
        let r = ReportRow::new(&analyzed("bad.flac", None, Some("Decode error: truncated")), &outcome);
        let out = render(&[r]);
        let cols: Vec<&str> = out.lines().nth(1).unwrap().split(',').collect();

        assert_eq!(cols[2], "error");
        assert!(cols[9..14].iter().all(|c| c.is_empty()));
        assert_eq!(cols[15], "Decode error: truncated");
    }
}
