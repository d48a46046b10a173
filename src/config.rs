use crate::color::{self, Rgba};
use crate::game::input::RingColors;
use crate::game::note_kind::NoteClass;
use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "ritmo.ini";

const IDLE_COLOR: &str = "#ffffff";
const HIT_COLOR: &str = "#21cce8";
const MISS_COLOR: &str = "#ff3030";
const SINGLE_COLOR: &str = "#e29c18";
const HOLD_COLOR: &str = "#66c955";
const SPECIAL_COLOR: &str = "#b45cff";

// Colours are written as `#rrggbb`, so only `;` starts a comment.
const COMMENT_SYMBOLS: [char; 1] = [';'];

const SINGLE_CLASS: &str = "StaticMeshNote";
const HOLD_CLASS: &str = "SplineMeshHoldNote";
const SPECIAL_CLASS: &str = "StaticMeshNote";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("[{section}] {key} = {value}: {reason}")]
    Invalid {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // [Lane]
    pub move_speed: f32,
    pub game_speed: f32,
    pub boundary_start_point: usize,
    pub boundary_end_point: usize,
    pub note_length: f32,
    pub path_length: f32,
    pub path_points: usize,
    // [Special]
    pub bombs_enabled: bool,
    pub bomb_spawn_freq: u32,
    pub igc_spawn_freq: u32,
    pub rand_spawn_freq: u32,
    pub seed: u64,
    // [Hold]
    pub unit_segment_length: f32,
    pub head_length: f32,
    pub tail_length: f32,
    pub growth_tolerance: f32,
    pub hit_ratio: f32,
    // [Pool]
    pub pool_capacity: usize,
    // [Ring]
    pub ring: RingColors,
    // [Notes]
    pub single_class: Option<NoteClass>,
    pub hold_class: Option<NoteClass>,
    pub special_class: Option<NoteClass>,
    pub single_color: Rgba,
    pub hold_color: Rgba,
    pub special_color: Rgba,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            move_speed: 500.0,
            game_speed: 1.0,
            boundary_start_point: 4,
            boundary_end_point: 6,
            note_length: 50.0,
            path_length: 1000.0,
            path_points: 11,
            bombs_enabled: true,
            bomb_spawn_freq: 0,
            igc_spawn_freq: 0,
            rand_spawn_freq: 0,
            seed: 0,
            unit_segment_length: 100.0,
            head_length: 50.0,
            tail_length: 50.0,
            growth_tolerance: 0.01,
            hit_ratio: 0.8,
            pool_capacity: 16,
            ring: RingColors {
                idle: hex_or_white(IDLE_COLOR),
                hit: hex_or_white(HIT_COLOR),
                miss: hex_or_white(MISS_COLOR),
                fill_rate: 3.0,
            },
            single_class: SINGLE_CLASS.parse().ok(),
            hold_class: HOLD_CLASS.parse().ok(),
            special_class: SPECIAL_CLASS.parse().ok(),
            single_color: hex_or_white(SINGLE_COLOR),
            hold_color: hex_or_white(HOLD_COLOR),
            special_color: hex_or_white(SPECIAL_COLOR),
        }
    }
}

fn hex_or_white(s: &str) -> Rgba {
    color::parse_hex(s).unwrap_or(color::WHITE)
}

// Global static for the process-wide configuration.
static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

fn new_ini() -> Ini {
    let mut ini = Ini::new();
    ini.set_comment_symbols(&COMMENT_SYMBOLS);
    ini
}

fn invalid(
    section: &'static str,
    key: &'static str,
    value: impl Display,
    reason: &'static str,
) -> ConfigError {
    ConfigError::Invalid {
        section,
        key,
        value: value.to_string(),
        reason,
    }
}

fn read<T>(ini: &Ini, section: &str, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match ini.get(section, key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(e) => {
                warn!("[{}] {} = '{}' is invalid ({}); using default.", section, key, raw, e);
                default
            }
        },
        None => {
            warn!("[{}] {} is missing; using default.", section, key);
            default
        }
    }
}

fn read_flag(ini: &Ini, section: &str, key: &str, default: bool) -> bool {
    read::<String>(ini, section, key, String::new())
        .parse::<u8>()
        .map_or(default, |v| v != 0)
}

fn read_color(ini: &Ini, section: &str, key: &str, default: Rgba) -> Rgba {
    let raw = read::<String>(ini, section, key, String::new());
    if raw.is_empty() {
        return default;
    }
    color::parse_hex(&raw).unwrap_or_else(|e| {
        warn!("[{}] {}: {}; using default.", section, key, e);
        default
    })
}

fn read_class(
    ini: &Ini,
    section: &str,
    key: &str,
    default: Option<NoteClass>,
) -> Option<NoteClass> {
    let raw = read::<String>(ini, section, key, String::new());
    if raw.is_empty() {
        return default;
    }
    match raw.parse() {
        Ok(class) => Some(class),
        Err(e) => {
            warn!("[{}] {}: {}; notes of this slot will not render.", section, key, e);
            None
        }
    }
}

impl Config {
    /// Reads every section and rejects values the lanes cannot run with.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let d = Config::default();
        let config = Self {
            move_speed: read(ini, "Lane", "MoveSpeed", d.move_speed),
            game_speed: read(ini, "Lane", "GameSpeed", d.game_speed),
            boundary_start_point: read(ini, "Lane", "BoundaryStartPoint", d.boundary_start_point),
            boundary_end_point: read(ini, "Lane", "BoundaryEndPoint", d.boundary_end_point),
            note_length: read(ini, "Lane", "NoteLength", d.note_length),
            path_length: read(ini, "Lane", "PathLength", d.path_length),
            path_points: read(ini, "Lane", "PathPoints", d.path_points),
            bombs_enabled: read_flag(ini, "Special", "BombsEnabled", d.bombs_enabled),
            bomb_spawn_freq: read(ini, "Special", "BombSpawnFreq", d.bomb_spawn_freq),
            igc_spawn_freq: read(ini, "Special", "IgcSpawnFreq", d.igc_spawn_freq),
            rand_spawn_freq: read(ini, "Special", "RandSpawnFreq", d.rand_spawn_freq),
            seed: read(ini, "Special", "Seed", d.seed),
            unit_segment_length: read(ini, "Hold", "UnitSegmentLength", d.unit_segment_length),
            head_length: read(ini, "Hold", "HeadLength", d.head_length),
            tail_length: read(ini, "Hold", "TailLength", d.tail_length),
            growth_tolerance: read(ini, "Hold", "GrowthTolerance", d.growth_tolerance),
            hit_ratio: read(ini, "Hold", "HitRatio", d.hit_ratio),
            pool_capacity: read(ini, "Pool", "Capacity", d.pool_capacity),
            ring: RingColors {
                idle: read_color(ini, "Ring", "IdleColor", d.ring.idle),
                hit: read_color(ini, "Ring", "HitColor", d.ring.hit),
                miss: read_color(ini, "Ring", "MissColor", d.ring.miss),
                fill_rate: read(ini, "Ring", "FillRate", d.ring.fill_rate),
            },
            single_class: read_class(ini, "Notes", "SingleClass", d.single_class),
            hold_class: read_class(ini, "Notes", "HoldClass", d.hold_class),
            special_class: read_class(ini, "Notes", "SpecialClass", d.special_class),
            single_color: read_color(ini, "Notes", "SingleColor", d.single_color),
            hold_color: read_color(ini, "Notes", "HoldColor", d.hold_color),
            special_color: read_color(ini, "Notes", "SpecialColor", d.special_color),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Negated comparisons also reject NaN.
        if !(self.move_speed > 0.0) {
            return Err(invalid("Lane", "MoveSpeed", self.move_speed, "must be positive"));
        }
        if !(self.game_speed > 0.0) {
            return Err(invalid("Lane", "GameSpeed", self.game_speed, "must be positive"));
        }
        if !(self.path_length > 0.0) {
            return Err(invalid("Lane", "PathLength", self.path_length, "must be positive"));
        }
        if self.path_points < 2 {
            return Err(invalid("Lane", "PathPoints", self.path_points, "needs at least 2 points"));
        }
        if self.boundary_end_point >= self.path_points {
            return Err(invalid(
                "Lane",
                "BoundaryEndPoint",
                self.boundary_end_point,
                "is past the last path point",
            ));
        }
        if self.boundary_start_point >= self.boundary_end_point {
            return Err(invalid(
                "Lane",
                "BoundaryStartPoint",
                self.boundary_start_point,
                "must come before BoundaryEndPoint",
            ));
        }
        if !(self.unit_segment_length > 0.0) {
            return Err(invalid(
                "Hold",
                "UnitSegmentLength",
                self.unit_segment_length,
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let mut ini = new_ini();
        ini.read(text.to_string()).map_err(ConfigError::Read)?;
        Self::from_ini(&ini)
    }

    /// Reads `path`, writing a default file first if there is none.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            if let Err(e) = create_default_file(path) {
                warn!("Failed to create default config '{}': {}", path.display(), e);
                return Ok(Config::default());
            }
        }
        let mut ini = new_ini();
        ini.load(path).map_err(ConfigError::Read)?;
        Self::from_ini(&ini)
    }
}

fn default_ini() -> Ini {
    let d = Config::default();
    let mut ini = new_ini();
    let mut set = |section: &str, key: &str, value: String| {
        ini.set(section, key, Some(value));
    };
    set("Lane", "MoveSpeed", d.move_speed.to_string());
    set("Lane", "GameSpeed", d.game_speed.to_string());
    set("Lane", "BoundaryStartPoint", d.boundary_start_point.to_string());
    set("Lane", "BoundaryEndPoint", d.boundary_end_point.to_string());
    set("Lane", "NoteLength", d.note_length.to_string());
    set("Lane", "PathLength", d.path_length.to_string());
    set("Lane", "PathPoints", d.path_points.to_string());
    set("Special", "BombsEnabled", (d.bombs_enabled as u8).to_string());
    set("Special", "BombSpawnFreq", d.bomb_spawn_freq.to_string());
    set("Special", "IgcSpawnFreq", d.igc_spawn_freq.to_string());
    set("Special", "RandSpawnFreq", d.rand_spawn_freq.to_string());
    set("Special", "Seed", d.seed.to_string());
    set("Hold", "UnitSegmentLength", d.unit_segment_length.to_string());
    set("Hold", "HeadLength", d.head_length.to_string());
    set("Hold", "TailLength", d.tail_length.to_string());
    set("Hold", "GrowthTolerance", d.growth_tolerance.to_string());
    set("Hold", "HitRatio", d.hit_ratio.to_string());
    set("Pool", "Capacity", d.pool_capacity.to_string());
    set("Ring", "IdleColor", IDLE_COLOR.to_string());
    set("Ring", "HitColor", HIT_COLOR.to_string());
    set("Ring", "MissColor", MISS_COLOR.to_string());
    set("Ring", "FillRate", d.ring.fill_rate.to_string());
    set("Notes", "SingleClass", SINGLE_CLASS.to_string());
    set("Notes", "HoldClass", HOLD_CLASS.to_string());
    set("Notes", "SpecialClass", SPECIAL_CLASS.to_string());
    set("Notes", "SingleColor", SINGLE_COLOR.to_string());
    set("Notes", "HoldColor", HOLD_COLOR.to_string());
    set("Notes", "SpecialColor", SPECIAL_COLOR.to_string());
    ini
}

fn create_default_file(path: &Path) -> Result<(), std::io::Error> {
    info!("Config not found, creating defaults in '{}'.", path.display());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    default_ini().write(path)
}

/// Loads `path` into the process-wide config.
pub fn load(path: &Path) -> Result<(), ConfigError> {
    let config = Config::load_file(path)?;
    info!(
        "Config loaded: move speed {}, game speed {}, specials {}/{}/{}.",
        config.move_speed,
        config.game_speed,
        config.bomb_spawn_freq,
        config.igc_spawn_freq,
        config.rand_spawn_freq
    );
    *CONFIG.lock().unwrap_or_else(|e| e.into_inner()) = config;
    Ok(())
}

/// Returns a copy of the currently loaded config.
pub fn get() -> Config {
    CONFIG.lock().unwrap_or_else(|e| e.into_inner()).clone()
}
