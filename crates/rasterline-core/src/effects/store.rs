//! Per-image effect lists and the immutable snapshots handed to exports.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{EffectId, EffectKind, RegionEffect};
use crate::geometry::NormalizedRect;

/// Identity of the image an effect list belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity derived from a source file path.
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Mutable editing-time store: one ordered effect list per image.
///
/// Single writer. Exports read from an [`EffectSnapshot`] instead, so edits
/// made while a batch runs never reach it.
#[derive(Debug, Clone, Default)]
pub struct EffectStore {
    lists: HashMap<ImageId, Vec<RegionEffect>>,
    next_id: u64,
}

impl EffectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effects of `image` in paint order.
    pub fn effects(&self, image: &ImageId) -> &[RegionEffect] {
        self.lists.get(image).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a new effect on top of the existing ones.
    pub fn add(&mut self, image: &ImageId, rect: NormalizedRect, kind: EffectKind) -> EffectId {
        self.next_id += 1;
        let id = EffectId(self.next_id);
        self.lists
            .entry(image.clone())
            .or_default()
            .push(RegionEffect::new(id, rect, kind));
        id
    }

    /// Replace the rectangle and kind of an effect. Returns false if `id`
    /// is not attached to `image`.
    pub fn update(
        &mut self,
        image: &ImageId,
        id: EffectId,
        rect: NormalizedRect,
        kind: EffectKind,
    ) -> bool {
        match self.find_mut(image, id) {
            Some(effect) => {
                effect.set_rect(rect);
                effect.set_kind(kind);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, image: &ImageId, id: EffectId) -> Option<RegionEffect> {
        let list = self.lists.get_mut(image)?;
        let pos = list.iter().position(|e| e.id == id)?;
        Some(list.remove(pos))
    }

    /// Move an effect to the end of the list so it paints last.
    pub fn bring_to_front(&mut self, image: &ImageId, id: EffectId) -> bool {
        self.reorder(image, id, |list, pos| {
            let e = list.remove(pos);
            list.push(e);
        })
    }

    /// Move an effect to the start of the list so it paints first.
    pub fn send_to_back(&mut self, image: &ImageId, id: EffectId) -> bool {
        self.reorder(image, id, |list, pos| {
            let e = list.remove(pos);
            list.insert(0, e);
        })
    }

    /// Drop every effect of `image`.
    pub fn clear(&mut self, image: &ImageId) {
        self.lists.remove(image);
    }

    /// Freeze the current state of every list.
    pub fn snapshot(&self) -> EffectSnapshot {
        let lists: HashMap<ImageId, Arc<[RegionEffect]>> = self
            .lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(id, list)| (id.clone(), Arc::from(list.as_slice())))
            .collect();
        EffectSnapshot {
            lists: Arc::new(lists),
        }
    }

    fn find_mut(&mut self, image: &ImageId, id: EffectId) -> Option<&mut RegionEffect> {
        self.lists.get_mut(image)?.iter_mut().find(|e| e.id == id)
    }

    fn reorder(
        &mut self,
        image: &ImageId,
        id: EffectId,
        op: impl FnOnce(&mut Vec<RegionEffect>, usize),
    ) -> bool {
        let Some(list) = self.lists.get_mut(image) else {
            return false;
        };
        match list.iter().position(|e| e.id == id) {
            Some(pos) => {
                op(list, pos);
                true
            }
            None => false,
        }
    }
}

/// Read-only copy of every effect list, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct EffectSnapshot {
    lists: Arc<HashMap<ImageId, Arc<[RegionEffect]>>>,
}

impl EffectSnapshot {
    /// Snapshot holding a single list.
    pub fn single(image: ImageId, effects: Vec<RegionEffect>) -> Self {
        let mut lists: HashMap<ImageId, Arc<[RegionEffect]>> = HashMap::new();
        lists.insert(image, Arc::from(effects));
        Self {
            lists: Arc::new(lists),
        }
    }

    pub fn effects_for(&self, image: &ImageId) -> &[RegionEffect] {
        self.lists.get(image).map(|l| &l[..]).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}
