//! Compact text charts.
//!
//! One row per line: a time in seconds, a colon, then one character per lane,
//! e.g. `1.250: 1 0 2` or `1.250: 102`. Blank lines and lines starting with
//! `#` or `//` are skipped. Lane characters are `0`/`.` empty, `1` single,
//! `2` hold start, `H` hold body, `3` hold end, `S` swipe, `B` bomb,
//! `R` random and `I` igc. Hold durations are derived from the markers.
use crate::game::level_map::{LevelError, LevelMap, LevelMapRow, NUM_LANES, Result};
use crate::game::note::NoteType;
use log::info;

pub fn parse_chart(text: &str) -> Result<LevelMap> {
    let rows = parse_chart_rows(text.as_bytes())?;
    info!("Parsed {} chart rows.", rows.len());
    LevelMap::from_rows(rows)
}

pub fn parse_chart_rows(bytes: &[u8]) -> Result<Vec<LevelMapRow>> {
    let mut rows = Vec::new();

    for (i, line) in bytes.split(|&b| b == b'\n').enumerate() {
        let line_no = i + 1;
        let line = line.strip_suffix(b"\r").unwrap_or(line).trim_ascii();
        if line.is_empty() || line.starts_with(b"#") || line.starts_with(b"//") {
            continue;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(chart_error(line_no, "expected '<time>: <lanes>'"));
        };
        let time = std::str::from_utf8(&line[..colon])
            .ok()
            .and_then(|s| s.trim().parse::<f32>().ok())
            .ok_or_else(|| chart_error(line_no, "time is not a number"))?;

        let mut lane_types = [NoteType::Empty; NUM_LANES];
        let mut found = 0;
        for &ch in line[colon + 1..].iter().filter(|b| !b.is_ascii_whitespace()) {
            let kind = NoteType::from_chart_char(ch).ok_or_else(|| {
                chart_error(line_no, &format!("unknown lane character '{}'", ch as char))
            })?;
            if found < NUM_LANES {
                lane_types[found] = kind;
            }
            found += 1;
        }
        if found != NUM_LANES {
            return Err(LevelError::LaneCount {
                row: rows.len(),
                expected: NUM_LANES,
                found,
            });
        }

        rows.push(LevelMapRow { time, lane_types });
    }

    Ok(rows)
}

fn chart_error(line: usize, message: &str) -> LevelError {
    LevelError::Chart {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_and_compact_rows() {
        let text = "# warmup\n0.0: 1 0 0\r\n\n// hold\n0.5: 2S0\n1.5: 3 0 B\n";
        let map = parse_chart(text).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.rows()[1].lane_types, [NoteType::BegHold, NoteType::Swipe, NoteType::Empty]);
        assert_eq!(map.rows()[2].lane_types[2], NoteType::Bomb);
        assert_eq!(map.hold_table(0).unwrap()[0].duration, 1.0);
    }

    #[test]
    fn reports_the_offending_line() {
        let err = parse_chart("0.0: 1 0 0\n0.5: 1 X 0\n").unwrap_err();
        assert!(
            matches!(err, LevelError::Chart { line: 2, .. }),
            "unexpected error {:?}",
            err
        );
        assert!(matches!(
            parse_chart("abc: 1 0 0").unwrap_err(),
            LevelError::Chart { line: 1, .. }
        ));
        assert!(matches!(
            parse_chart("0.0 1 0 0").unwrap_err(),
            LevelError::Chart { line: 1, .. }
        ));
    }

    #[test]
    fn wrong_lane_count_is_rejected() {
        assert!(matches!(
            parse_chart("0.0: 1 0").unwrap_err(),
            LevelError::LaneCount { found: 2, .. }
        ));
        assert!(matches!(
            parse_chart("0.0: 1 0 0 1").unwrap_err(),
            LevelError::LaneCount { found: 4, .. }
        ));
    }

    #[test]
    fn chart_times_must_increase() {
        assert!(matches!(
            parse_chart("1.0: 1 0 0\n0.5: 1 0 0").unwrap_err(),
            LevelError::NonIncreasingTime { .. }
        ));
    }
}
