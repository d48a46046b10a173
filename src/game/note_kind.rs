use crate::color::Rgba;
use crate::game::note::NoteType;
use std::fmt;
use std::str::FromStr;

/// Asset class a content author picked for a note slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteClass {
    StaticMeshNote,
    SpriteNote,
    SkeletalMeshNote,
    StaticMeshHoldNote,
    SpriteHoldNote,
    SkeletalMeshHoldNote,
    SplineMeshHoldNote,
}

impl FromStr for NoteClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "StaticMeshNote" => Ok(NoteClass::StaticMeshNote),
            "SpriteNote" => Ok(NoteClass::SpriteNote),
            "SkeletalMeshNote" => Ok(NoteClass::SkeletalMeshNote),
            "StaticMeshHoldNote" => Ok(NoteClass::StaticMeshHoldNote),
            "SpriteHoldNote" => Ok(NoteClass::SpriteHoldNote),
            "SkeletalMeshHoldNote" => Ok(NoteClass::SkeletalMeshHoldNote),
            "SplineMeshHoldNote" => Ok(NoteClass::SplineMeshHoldNote),
            other => Err(format!("Unknown note class '{}'", other)),
        }
    }
}

impl fmt::Display for NoteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which kind of note a class is being assigned to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteSlot {
    Single,
    Hold,
}

impl NoteSlot {
    pub fn for_type(note_type: NoteType) -> NoteSlot {
        match note_type {
            NoteType::BegHold | NoteType::Hold | NoteType::EndHold => NoteSlot::Hold,
            _ => NoteSlot::Single,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RenderKind {
    #[default]
    None,
    SingleStatic,
    SingleSprite,
    SingleSkeletal,
    HoldStatic,
    HoldSprite,
    HoldSkeletal,
    HoldSpline,
}

/// A class that does not fit the slot resolves to `RenderKind::None`.
pub fn resolve(slot: NoteSlot, class: NoteClass) -> RenderKind {
    match (slot, class) {
        (NoteSlot::Single, NoteClass::StaticMeshNote) => RenderKind::SingleStatic,
        (NoteSlot::Single, NoteClass::SpriteNote) => RenderKind::SingleSprite,
        (NoteSlot::Single, NoteClass::SkeletalMeshNote) => RenderKind::SingleSkeletal,
        (NoteSlot::Hold, NoteClass::StaticMeshHoldNote) => RenderKind::HoldStatic,
        (NoteSlot::Hold, NoteClass::SpriteHoldNote) => RenderKind::HoldSprite,
        (NoteSlot::Hold, NoteClass::SkeletalMeshHoldNote) => RenderKind::HoldSkeletal,
        (NoteSlot::Hold, NoteClass::SplineMeshHoldNote) => RenderKind::HoldSpline,
        _ => RenderKind::None,
    }
}

/// Spawn-time presentation data for one pooled note kind.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteMeta {
    pub note_type: NoteType,
    pub render: RenderKind,
    pub particle_color: Rgba,
}

impl NoteMeta {
    pub fn new(note_type: NoteType, class: Option<NoteClass>, particle_color: Rgba) -> Self {
        let render = class.map_or(RenderKind::None, |c| resolve(NoteSlot::for_type(note_type), c));
        Self {
            note_type,
            render,
            particle_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;

    #[test]
    fn classes_resolve_only_into_their_own_slot() {
        assert_eq!(resolve(NoteSlot::Single, NoteClass::SpriteNote), RenderKind::SingleSprite);
        assert_eq!(resolve(NoteSlot::Hold, NoteClass::SpriteNote), RenderKind::None);
        assert_eq!(resolve(NoteSlot::Single, NoteClass::StaticMeshHoldNote), RenderKind::None);
        assert_eq!(
            resolve(NoteSlot::Hold, NoteClass::SplineMeshHoldNote),
            RenderKind::HoldSpline,
            "spline holds keep their own render kind"
        );
    }

    #[test]
    fn class_names_parse_once() {
        assert_eq!("SkeletalMeshHoldNote".parse(), Ok(NoteClass::SkeletalMeshHoldNote));
        assert!("Spline".parse::<NoteClass>().is_err());
        let meta = NoteMeta::new(NoteType::Hold, "StaticMeshHoldNote".parse().ok(), WHITE);
        assert_eq!(meta.render, RenderKind::HoldStatic);
        assert_eq!(NoteMeta::new(NoteType::Bomb, None, WHITE).render, RenderKind::None);
    }
}
