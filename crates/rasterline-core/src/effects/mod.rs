//! Rectangular region effects: soften, mosaic and solid fill.
//!
//! ## Model
//!
//! Each [`RegionEffect`] pairs a [`NormalizedRect`] with an [`EffectKind`].
//! Rectangles are authored against the untransformed source image, so the
//! pipeline applies effects before any rotation or crop.
//!
//! ## Ordering
//!
//! Effects are painted in list order; a later effect sees the output of an
//! earlier one where they overlap.

mod apply;
mod blur;
mod mosaic;
mod store;

pub use apply::{apply_effect, apply_effects, mosaic_block_size, soften_radius};
pub use blur::blur_region;
pub use mosaic::pixelate_rgba8;
pub use store::{EffectSnapshot, EffectStore, ImageId};

use serde::{Deserialize, Serialize};

use crate::bitmap::Rgba;
use crate::geometry::NormalizedRect;

/// Largest soften radius in pixels, reached at intensity 1.0.
pub const MAX_SOFTEN_RADIUS: f64 = 40.0;

/// Identifier of an effect within its owning image's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(pub u64);

/// What an effect does to the pixels inside its rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    /// Gaussian blur, radius `intensity * MAX_SOFTEN_RADIUS`.
    Soften { intensity: f64 },
    /// Block averaging.
    Mosaic { intensity: f64 },
    /// Flat opaque fill.
    SolidFill { color: Rgba },
}

impl EffectKind {
    pub fn soften(intensity: f64) -> Self {
        EffectKind::Soften {
            intensity: clamp_intensity(intensity),
        }
    }

    pub fn mosaic(intensity: f64) -> Self {
        EffectKind::Mosaic {
            intensity: clamp_intensity(intensity),
        }
    }

    pub fn solid_fill(color: Rgba) -> Self {
        EffectKind::SolidFill {
            color: color.opaque(),
        }
    }

    /// Same kind with its parameters forced into range.
    pub fn normalized(self) -> Self {
        match self {
            EffectKind::Soften { intensity } => EffectKind::soften(intensity),
            EffectKind::Mosaic { intensity } => EffectKind::mosaic(intensity),
            EffectKind::SolidFill { color } => EffectKind::solid_fill(color),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            EffectKind::Soften { .. } => 0,
            EffectKind::Mosaic { .. } => 1,
            EffectKind::SolidFill { .. } => 2,
        }
    }
}

fn clamp_intensity(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One effect attached to an image.
///
/// The rectangle is kept inside the unit square and the parameters in
/// range: the constructor, every mutator and deserialization clamp them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionEffectFields")]
pub struct RegionEffect {
    pub id: EffectId,
    rect: NormalizedRect,
    kind: EffectKind,
}

/// Serialized shape of a [`RegionEffect`], before clamping.
#[derive(Deserialize)]
struct RegionEffectFields {
    id: EffectId,
    rect: NormalizedRect,
    kind: EffectKind,
}

impl From<RegionEffectFields> for RegionEffect {
    fn from(fields: RegionEffectFields) -> Self {
        RegionEffect::new(fields.id, fields.rect, fields.kind)
    }
}

impl RegionEffect {
    pub fn new(id: EffectId, rect: NormalizedRect, kind: EffectKind) -> Self {
        Self {
            id,
            rect: rect.clamped(),
            kind: kind.normalized(),
        }
    }

    pub fn rect(&self) -> NormalizedRect {
        self.rect
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn set_rect(&mut self, rect: NormalizedRect) {
        self.rect = rect.clamped();
    }

    pub fn set_kind(&mut self, kind: EffectKind) {
        self.kind = kind.normalized();
    }

    /// Stable hash over rectangle, kind and parameters.
    ///
    /// The id is not part of the hash: two effects that paint the same
    /// pixels hash equal.
    pub fn content_hash(&self) -> u64 {
        let mut h = Fnv1a64::new();
        for v in [self.rect.x, self.rect.y, self.rect.width, self.rect.height] {
            h.write_u64(v.to_bits());
        }
        h.write_u8(self.kind.tag());
        match self.kind {
            EffectKind::Soften { intensity } | EffectKind::Mosaic { intensity } => {
                h.write_u64(intensity.to_bits());
            }
            EffectKind::SolidFill { color } => h.write_bytes(&color.to_array()),
        }
        h.finish()
    }
}

/// Combined hash of an ordered effect list.
pub fn effects_hash(effects: &[RegionEffect]) -> u64 {
    let mut h = Fnv1a64::new();
    h.write_u64(effects.len() as u64);
    for e in effects {
        h.write_u64(e.content_hash());
    }
    h.finish()
}

struct Fnv1a64(u64);

impl Fnv1a64 {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        self.0 = h;
    }

    fn finish(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> NormalizedRect {
        NormalizedRect::new(0.1, 0.2, 0.3, 0.4)
    }

    #[test]
    fn test_intensity_clamped_at_construction() {
        assert_eq!(EffectKind::soften(2.5), EffectKind::Soften { intensity: 1.0 });
        assert_eq!(EffectKind::mosaic(-1.0), EffectKind::Mosaic { intensity: 0.0 });
        assert_eq!(
            EffectKind::soften(f64::NAN),
            EffectKind::Soften { intensity: 0.0 }
        );
    }

    #[test]
    fn test_solid_fill_is_opaque() {
        let kind = EffectKind::solid_fill(Rgba::new(1, 2, 3, 10));
        assert_eq!(
            kind,
            EffectKind::SolidFill {
                color: Rgba::rgb(1, 2, 3)
            }
        );
    }

    #[test]
    fn test_rect_clamped_on_new_and_mutation() {
        let mut e = RegionEffect::new(
            EffectId(1),
            NormalizedRect::new(-0.5, 0.5, 1.0, 1.0),
            EffectKind::soften(0.5),
        );
        assert!(e
            .rect()
            .approx_eq(&NormalizedRect::new(0.0, 0.5, 0.5, 0.5), 1e-12));

        e.set_rect(NormalizedRect::new(0.9, 0.9, 0.5, 0.5));
        assert!(e
            .rect()
            .approx_eq(&NormalizedRect::new(0.9, 0.9, 0.1, 0.1), 1e-12));

        e.set_kind(EffectKind::Mosaic { intensity: 9.0 });
        assert_eq!(e.kind(), EffectKind::Mosaic { intensity: 1.0 });
    }

    #[test]
    fn test_content_hash_ignores_id() {
        let a = RegionEffect::new(EffectId(1), rect(), EffectKind::soften(0.5));
        let b = RegionEffect::new(EffectId(2), rect(), EffectKind::soften(0.5));
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_tracks_parameters() {
        let base = RegionEffect::new(EffectId(1), rect(), EffectKind::soften(0.5));
        let intensity = RegionEffect::new(EffectId(1), rect(), EffectKind::soften(0.6));
        let kind = RegionEffect::new(EffectId(1), rect(), EffectKind::mosaic(0.5));
        let moved = RegionEffect::new(
            EffectId(1),
            rect().offset_by(0.01, 0.0),
            EffectKind::soften(0.5),
        );
        let hashes = [
            base.content_hash(),
            intensity.content_hash(),
            kind.content_hash(),
            moved.content_hash(),
        ];
        for i in 0..hashes.len() {
            for j in i + 1..hashes.len() {
                assert_ne!(hashes[i], hashes[j], "{i} vs {j}");
            }
        }
    }

    #[test]
    fn test_effects_hash_is_order_sensitive() {
        let a = RegionEffect::new(EffectId(1), rect(), EffectKind::soften(0.5));
        let b = RegionEffect::new(EffectId(2), rect(), EffectKind::solid_fill(Rgba::BLACK));
        assert_ne!(effects_hash(&[a, b]), effects_hash(&[b, a]));
        assert_eq!(effects_hash(&[a, b]), effects_hash(&[a, b]));
    }

    #[test]
    fn test_deserialized_effect_is_clamped() {
        let json = r#"{"id":7,"rect":{"x":0.5,"y":0.5,"width":2.0,"height":0.1},
                      "kind":{"kind":"mosaic","intensity":3.0}}"#;
        let e: RegionEffect = serde_json::from_str(json).unwrap();
        assert_eq!(e.id, EffectId(7));
        assert_eq!(e.kind(), EffectKind::Mosaic { intensity: 1.0 });
        assert!((e.rect().right() - 1.0).abs() < 1e-12);

        let fill: RegionEffect = serde_json::from_str(
            r#"{"id":1,"rect":{"x":0,"y":0,"width":1,"height":1},
                "kind":{"kind":"solid_fill","color":{"r":1,"g":2,"b":3,"a":0}}}"#,
        )
        .unwrap();
        assert_eq!(fill.kind(), EffectKind::solid_fill(Rgba::rgb(1, 2, 3)));
    }
}
