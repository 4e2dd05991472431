//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00] Another line
//! [00:20.00][01:10.50] Repeated chorus

use crate::lyrics::model::LyricLine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// `[mm:ss.xx]`, `[mm:ss.xxx]` or `[mm:ss:xx]`
static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d{2}):(\d{2})[.:](\d{2,3})\]").expect("timestamp pattern is valid")
});

/// Metadata tags like `[ar:Artist]` or `[ti:Title]`
static METADATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[a-zA-Z]+:").expect("metadata pattern is valid"));

/// Parse timestamp-tagged lyrics.
///
/// Lines without any timestamp are kept as untimed lines and sorted after every
/// timed line. A line carrying several timestamps is emitted once per timestamp.
pub fn parse_timed(content: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || METADATA.is_match(line) {
            continue;
        }

        let mut timestamps = Vec::new();
        let mut text_start = 0;
        for caps in TIMESTAMP.captures_iter(line) {
            if let Some(whole) = caps.get(0) {
                text_start = whole.end();
            }
            if let (Some(min), Some(sec), Some(frac)) = (caps.get(1), caps.get(2), caps.get(3))
                && let Some(secs) = timestamp_secs(min.as_str(), sec.as_str(), frac.as_str())
            {
                timestamps.push(secs);
            }
        }

        if timestamps.is_empty() {
            lines.push(LyricLine::untimed(line));
            continue;
        }

        // Text follows the last tag
        let text = line[text_start..].trim();
        if text.is_empty() {
            continue;
        }
        lines.extend(timestamps.into_iter().map(|ts| LyricLine::timed(ts, text)));
    }

    // Stable: equal timestamps keep their file order
    lines.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    lines
}

/// Parse plain lyrics: one untimed line per non-empty input line.
pub fn parse_plain(content: &str) -> Vec<LyricLine> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(LyricLine::untimed)
        .collect()
}

/// Convert the captured tag parts to seconds.
fn timestamp_secs(min: &str, sec: &str, frac: &str) -> Option<f64> {
    let min: f64 = min.parse().ok()?;
    let sec: f64 = sec.parse().ok()?;
    let scale = match frac.len() {
        2 => 100.0,
        3 => 1000.0,
        _ => return None,
    };
    let frac: f64 = frac.parse().ok()?;
    Some(min * 60.0 + sec + frac / scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_timestamp_secs() {
        assert!(approx(timestamp_secs("00", "12", "34").unwrap(), 12.34));
        assert!(approx(timestamp_secs("01", "30", "00").unwrap(), 90.0));
        assert!(approx(timestamp_secs("00", "12", "340").unwrap(), 12.34));
        assert!(approx(timestamp_secs("02", "05", "005").unwrap(), 125.005));
        assert_eq!(timestamp_secs("00", "12", "3"), None);
    }

    #[test]
    fn test_parse_lrc() {
        let lrc = r#"
[ti:Test Song]
[ar:Test Artist]
[00:12.34]First line
[00:15.00]Second line
"#;
        let lines = parse_timed(lrc);
        assert_eq!(lines.len(), 2);
        assert!(approx(lines[0].timestamp.unwrap(), 12.34));
        assert_eq!(lines[0].text, "First line");
        assert_eq!(lines[1].text, "Second line");
    }

    #[test]
    fn test_sorts_by_timestamp() {
        let lines = parse_timed("[00:12.50]Hello\n[00:05.00]World");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].timestamp, Some(5.0));
        assert_eq!(lines[0].text, "World");
        assert_eq!(lines[1].timestamp, Some(12.5));
        assert_eq!(lines[1].text, "Hello");
    }

    #[test]
    fn test_colon_separated_fraction() {
        let lines = parse_timed("[01:02:50]Colon style");
        assert_eq!(lines.len(), 1);
        assert!(approx(lines[0].timestamp.unwrap(), 62.5));
    }

    #[test]
    fn test_multiple_timestamps_duplicate_text() {
        let lines = parse_timed("[00:20.00][01:10.50] Chorus line ");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Chorus line");
        assert_eq!(lines[1].text, "Chorus line");
        assert_eq!(lines[0].timestamp, Some(20.0));
        assert_eq!(lines[1].timestamp, Some(70.5));
    }

    #[test]
    fn test_metadata_never_emitted() {
        let lines = parse_timed("[ar:Artist Name]\n[length:03:20]\n[00:01.00]Only lyric");
        assert_eq!(lines.len(), 1);
        assert!(lines.iter().all(|l| !l.text.contains("Artist Name")));
    }

    #[test]
    fn test_tag_without_text_is_dropped() {
        let lines = parse_timed("[00:01.00]\n[00:02.00]  \n[00:03.00]Words");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Words");
    }

    #[test]
    fn test_untimed_lines_sort_last() {
        let lines = parse_timed("Written by someone\n[00:09.00]Late\n[00:03.00]Early");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "Early");
        assert_eq!(lines[1].text, "Late");
        assert_eq!(lines[2].timestamp, None);
        assert_eq!(lines[2].text, "Written by someone");
    }

    #[test]
    fn test_equal_timestamps_keep_file_order() {
        let lines = parse_timed("[00:04.00]first\n[00:04.00]second\n[00:01.00]zero");
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["zero", "first", "second"]);
    }

    #[test]
    fn test_output_is_sorted_and_round_trips() {
        let tags = [(3, 7, "25"), (0, 59, "99"), (1, 0, "010"), (0, 0, "00")];
        let lrc: String = tags
            .iter()
            .enumerate()
            .map(|(i, (m, s, f))| format!("[{m:02}:{s:02}.{f}]line {i}\n"))
            .collect();
        let lines = parse_timed(&lrc);
        assert_eq!(lines.len(), tags.len());
        assert!(lines.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        for (i, (m, s, f)) in tags.iter().enumerate() {
            let frac: f64 = f.parse::<f64>().unwrap() / 10f64.powi(f.len() as i32);
            let expected = *m as f64 * 60.0 + *s as f64 + frac;
            let line = lines.iter().find(|l| l.text == format!("line {i}")).unwrap();
            assert!(approx(line.timestamp.unwrap(), expected));
        }
    }

    #[test]
    fn test_parse_plain() {
        let lines = parse_plain("  First  \n\n[00:01.00]Kept verbatim\r\nLast\n");
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.timestamp.is_none()));
        assert_eq!(lines[0].text, "First");
        assert_eq!(lines[1].text, "[00:01.00]Kept verbatim");
        assert_eq!(lines[2].text, "Last");
    }
}
