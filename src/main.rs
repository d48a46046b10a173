use log::{LevelFilter, error, info};
use ritmo::config::{self, DEFAULT_CONFIG_PATH};
use ritmo::game::events::{EventKind, GameEvent};
use ritmo::game::level::Level;
use ritmo::game::level_map::LevelMap;
use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

const STEP: f32 = 1.0 / 120.0;
// Extra simulated time after the last row before giving up on stragglers.
const RUN_OUT: f32 = 30.0;

#[derive(Debug, Default)]
struct Summary {
    spawned: usize,
    hit: usize,
    missed: usize,
    complete_misses: usize,
}

fn run(level_path: PathBuf, config_path: PathBuf) -> Result<(), Box<dyn Error>> {
    config::load(&config_path)?;
    let config = config::get();
    let map = Arc::new(LevelMap::load(&level_path)?);
    let last_time = map.last_time();
    let mut level = Level::new(map, &config)?;

    let summary = Rc::new(RefCell::new(Summary::default()));
    for kind in [
        EventKind::NoteSpawned,
        EventKind::NoteHit,
        EventKind::NoteMiss,
        EventKind::CompleteMiss,
    ] {
        let summary = summary.clone();
        level.subscribe(kind, "summary", move |event| {
            let mut s = summary.borrow_mut();
            match event {
                GameEvent::NoteSpawned { .. } => s.spawned += 1,
                GameEvent::NoteHit { .. } => s.hit += 1,
                GameEvent::NoteMiss { .. } => s.missed += 1,
                GameEvent::CompleteMiss { .. } => s.complete_misses += 1,
                _ => {}
            }
        });
    }

    level.start_playing();
    while !(level.is_finished() && level.song_time() > last_time) {
        if level.song_time() > last_time + RUN_OUT {
            error!("Level did not drain {:.0}s after its last row; stopping.", RUN_OUT);
            break;
        }
        // Autoplay: hold a lane exactly while something is in its window.
        for idx in 0..level.lanes().len() {
            let (want, pressed) = match level.lane(idx) {
                Some(lane) => (lane.note_within_bounds().is_some(), lane.is_pressed()),
                None => continue,
            };
            if want && !pressed {
                level.press(idx)?;
            } else if !want && pressed {
                level.release(idx)?;
            }
        }
        level.advance(STEP);
    }
    level.stop_playing();

    let s = summary.borrow();
    info!(
        "Finished at {:.2}s: {} spawned, {} hit, {} missed, {} complete misses.",
        level.song_time(),
        s.spawned,
        s.hit,
        s.missed,
        s.complete_misses
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("ritmo::game::lane", LevelFilter::Info)
        .filter_module("ritmo::game::level_map", LevelFilter::Debug)
        .init();

    let mut args = std::env::args_os().skip(1);
    let Some(level_path) = args.next().map(PathBuf::from) else {
        return Err("usage: ritmo <level.json|chart.txt> [config.ini]".into());
    };
    let config_path = args
        .next()
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    info!("Running '{}'...", level_path.display());
    if let Err(e) = run(level_path, config_path) {
        error!("Run failed: {}", e);
        return Err(e);
    }
    Ok(())
}
