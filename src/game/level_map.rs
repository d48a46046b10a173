use crate::game::chart;
use crate::game::note::NoteType;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const NUM_LANES: usize = 3;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("row {row}: time {time} does not come after {previous}")]
    NonIncreasingTime { row: usize, time: f32, previous: f32 },

    #[error("row {row}: expected {expected} lanes, found {found}")]
    LaneCount { row: usize, expected: usize, found: usize },

    #[error("lane {lane} is out of range (level has {lanes} lanes)")]
    LaneOutOfRange { lane: usize, lanes: usize },

    #[error("lane {lane}: hold table has {entries} entries but the map has {holds} BEG_HOLD notes")]
    HoldTableTooShort { lane: usize, entries: usize, holds: usize },

    #[error("{what} speed must be positive, got {value}")]
    InvalidSpeed { what: &'static str, value: f32 },

    #[error("expected one RNG per lane ({expected}), got {found}")]
    RngCount { expected: usize, found: usize },

    #[error("chart line {line}: {message}")]
    Chart { line: usize, message: String },

    #[error("failed to read level: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse level JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LevelError>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LevelMapRow {
    pub time: f32,
    pub lane_types: [NoteType; NUM_LANES],
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldEntry {
    pub start_time: f32,
    pub duration: f32,
}

impl HoldEntry {
    #[inline(always)]
    pub fn end_time(&self) -> f32 {
        self.start_time + self.duration
    }
}

// On-disk shape. Lane arrays stay unsized here so a short row is reported
// instead of failing inside serde.
#[derive(Debug, Deserialize)]
struct RawRow {
    time: f32,
    lanes: Vec<NoteType>,
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    rows: Vec<RawRow>,
    #[serde(default)]
    holds: Option<Vec<Vec<HoldEntry>>>,
}

/// Immutable, validated note map plus one hold-duration table per lane.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelMap {
    rows: Vec<LevelMapRow>,
    holds: Vec<Vec<HoldEntry>>,
}

impl LevelMap {
    /// Validates `rows` against explicit per-lane hold tables.
    pub fn new(rows: Vec<LevelMapRow>, holds: Vec<Vec<HoldEntry>>) -> Result<Self> {
        validate_times(&rows)?;
        if holds.len() > NUM_LANES {
            return Err(LevelError::LaneOutOfRange {
                lane: holds.len() - 1,
                lanes: NUM_LANES,
            });
        }
        let mut holds = holds;
        holds.resize_with(NUM_LANES, Vec::new);

        for (lane, table) in holds.iter().enumerate() {
            let needed = count_beg_holds(&rows, lane);
            if table.len() < needed {
                return Err(LevelError::HoldTableTooShort {
                    lane,
                    entries: table.len(),
                    holds: needed,
                });
            }
        }

        let map = Self { rows, holds };
        map.log_summary();
        Ok(map)
    }

    /// Builds the hold tables by pairing each BEG_HOLD with the next END_HOLD
    /// in the same lane.
    pub fn from_rows(rows: Vec<LevelMapRow>) -> Result<Self> {
        validate_times(&rows)?;
        let holds = derive_hold_tables(&rows);
        Self::new(rows, holds)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawLevel = serde_json::from_str(text)?;
        let mut rows = Vec::with_capacity(raw.rows.len());
        for (i, r) in raw.rows.into_iter().enumerate() {
            let found = r.lanes.len();
            let lane_types: [NoteType; NUM_LANES] =
                r.lanes.try_into().map_err(|_| LevelError::LaneCount {
                    row: i,
                    expected: NUM_LANES,
                    found,
                })?;
            rows.push(LevelMapRow {
                time: r.time,
                lane_types,
            });
        }
        match raw.holds {
            Some(holds) => Self::new(rows, holds),
            None => Self::from_rows(rows),
        }
    }

    /// Loads a `.json` level, or a text chart for any other extension.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading level map from '{}'.", path.display());
        let text = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            chart::parse_chart(&text)
        }
    }

    #[inline(always)]
    pub fn rows(&self) -> &[LevelMapRow] {
        &self.rows
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn hold_table(&self, lane: usize) -> Result<&[HoldEntry]> {
        self.holds
            .get(lane)
            .map(Vec::as_slice)
            .ok_or(LevelError::LaneOutOfRange {
                lane,
                lanes: NUM_LANES,
            })
    }

    /// Time of the last row, or 0 for an empty map.
    pub fn last_time(&self) -> f32 {
        self.rows.last().map_or(0.0, |r| r.time)
    }

    fn log_summary(&self) {
        let spawns = self
            .rows
            .iter()
            .flat_map(|r| r.lane_types.iter())
            .filter(|t| !t.is_continuation())
            .count();
        let holds: usize = self.holds.iter().map(Vec::len).sum();
        info!(
            "Level map ready: {} rows, {} spawn markers, {} holds, ends at {:.2}s.",
            self.rows.len(),
            spawns,
            holds,
            self.last_time()
        );
    }
}

fn validate_times(rows: &[LevelMapRow]) -> Result<()> {
    for (i, pair) in rows.windows(2).enumerate() {
        let (previous, time) = (pair[0].time, pair[1].time);
        // Negated form also rejects NaN.
        if !(time > previous) {
            return Err(LevelError::NonIncreasingTime {
                row: i + 1,
                time,
                previous,
            });
        }
    }
    Ok(())
}

fn count_beg_holds(rows: &[LevelMapRow], lane: usize) -> usize {
    rows.iter()
        .filter(|r| r.lane_types[lane] == NoteType::BegHold)
        .count()
}

fn derive_hold_tables(rows: &[LevelMapRow]) -> Vec<Vec<HoldEntry>> {
    let mut tables: Vec<Vec<HoldEntry>> = vec![Vec::new(); NUM_LANES];
    let mut open: [Option<f32>; NUM_LANES] = [None; NUM_LANES];

    for row in rows {
        for (lane, &kind) in row.lane_types.iter().enumerate() {
            match kind {
                NoteType::BegHold => {
                    if let Some(start) = open[lane].replace(row.time) {
                        warn!(
                            "Lane {}: hold at {:.3}s restarted at {:.3}s before its END_HOLD.",
                            lane, start, row.time
                        );
                        tables[lane].push(HoldEntry {
                            start_time: start,
                            duration: row.time - start,
                        });
                    }
                }
                NoteType::EndHold => match open[lane].take() {
                    Some(start) => tables[lane].push(HoldEntry {
                        start_time: start,
                        duration: row.time - start,
                    }),
                    None => warn!("Lane {}: END_HOLD at {:.3}s has no BEG_HOLD.", lane, row.time),
                },
                _ => {}
            }
        }
    }

    for (lane, start) in open.iter().enumerate() {
        if let Some(start) = *start {
            warn!("Lane {}: hold at {:.3}s never ends; using zero duration.", lane, start);
            tables[lane].push(HoldEntry {
                start_time: start,
                duration: 0.0,
            });
        }
    }
    for (lane, table) in tables.iter().enumerate() {
        debug!("Lane {}: derived {} hold entries.", lane, table.len());
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::note::NoteType::{BegHold, Empty, EndHold, Hold, Single};

    fn row(time: f32, lanes: [NoteType; NUM_LANES]) -> LevelMapRow {
        LevelMapRow {
            time,
            lane_types: lanes,
        }
    }

    #[test]
    fn rejects_non_increasing_time() {
        let rows = vec![
            row(0.0, [Single, Empty, Empty]),
            row(1.0, [Empty, Single, Empty]),
            row(1.0, [Empty, Empty, Single]),
        ];
        let err = LevelMap::from_rows(rows).unwrap_err();
        assert!(
            matches!(err, LevelError::NonIncreasingTime { row: 2, .. }),
            "unexpected error {:?}",
            err
        );

        let backwards = vec![row(2.0, [Single; 3]), row(1.0, [Single; 3])];
        assert!(LevelMap::from_rows(backwards).is_err());
    }

    #[test]
    fn short_hold_table_fails_fast() {
        let rows = vec![
            row(0.0, [BegHold, Empty, Empty]),
            row(1.0, [EndHold, Empty, Empty]),
            row(2.0, [BegHold, Empty, Empty]),
            row(3.0, [EndHold, Empty, Empty]),
        ];
        let holds = vec![vec![HoldEntry {
            start_time: 0.0,
            duration: 1.0,
        }]];
        let err = LevelMap::new(rows, holds).unwrap_err();
        assert!(matches!(
            err,
            LevelError::HoldTableTooShort {
                lane: 0,
                entries: 1,
                holds: 2
            }
        ));
    }

    #[test]
    fn too_many_hold_tables_is_a_lane_error() {
        let holds = vec![Vec::new(); NUM_LANES + 1];
        let err = LevelMap::new(vec![row(0.0, [Single; 3])], holds).unwrap_err();
        assert!(matches!(err, LevelError::LaneOutOfRange { lane: 3, .. }));
    }

    #[test]
    fn hold_tables_are_derived_from_markers() {
        let rows = vec![
            row(0.5, [BegHold, Single, Empty]),
            row(1.0, [Hold, Empty, BegHold]),
            row(2.5, [EndHold, Empty, Hold]),
            row(3.0, [Empty, Empty, EndHold]),
        ];
        let map = LevelMap::from_rows(rows).unwrap();
        assert_eq!(
            map.hold_table(0).unwrap(),
            &[HoldEntry {
                start_time: 0.5,
                duration: 2.0
            }]
        );
        assert!(map.hold_table(1).unwrap().is_empty());
        assert_eq!(map.hold_table(2).unwrap()[0].end_time(), 3.0);
        assert!(map.hold_table(NUM_LANES).is_err());
    }

    #[test]
    fn json_levels_load_with_or_without_hold_tables() {
        let text = r#"{
            "rows": [
                { "time": 0.0, "lanes": ["SINGLE", "EMPTY", "EMPTY"] },
                { "time": 1.0, "lanes": ["BEG_HOLD", "SWIPE", "EMPTY"] },
                { "time": 2.0, "lanes": ["END_HOLD", "EMPTY", "IGC"] }
            ]
        }"#;
        let map = LevelMap::from_json_str(text).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.hold_table(0).unwrap()[0].duration, 1.0);

        let explicit = r#"{
            "rows": [ { "time": 0.0, "lanes": ["BEG_HOLD", "EMPTY", "EMPTY"] } ],
            "holds": [ [ { "start_time": 0.0, "duration": 4.0 } ] ]
        }"#;
        let map = LevelMap::from_json_str(explicit).unwrap();
        assert_eq!(map.hold_table(0).unwrap()[0].duration, 4.0);
    }

    #[test]
    fn json_rows_with_the_wrong_lane_count_are_rejected() {
        let text = r#"{ "rows": [ { "time": 0.0, "lanes": ["SINGLE", "EMPTY"] } ] }"#;
        let err = LevelMap::from_json_str(text).unwrap_err();
        assert!(matches!(
            err,
            LevelError::LaneCount {
                row: 0,
                expected: 3,
                found: 2
            }
        ));
    }
}
