pub mod chart;
pub mod events;
pub mod hold;
pub mod input;
pub mod judge;
pub mod lane;
pub mod level;
pub mod level_map;
pub mod note;
pub mod note_kind;
pub mod path;
pub mod pool;
pub mod scheduler;
