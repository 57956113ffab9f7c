//! Scene snapshots and the morph between two of them.

use crate::density_map::Position;
use crate::part::{NUM_ENGINES, NUM_PARTS};

/// Saved parameters of one engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EngineScene {
    pub position: Position,
    pub density: [u8; NUM_PARTS],
    pub randomness: u8,
}

impl Default for EngineScene {
    fn default() -> Self {
        Self {
            position: Position::default(),
            density: [127; NUM_PARTS],
            randomness: 0,
        }
    }
}

/// A snapshot of both engines, used as morph input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Scene {
    pub engines: [EngineScene; NUM_ENGINES],
}

#[inline]
fn lerp_u8(a: u8, b: u8, factor: f32) -> u8 {
    // Truncates toward zero, so factor 0.5 gives the floored mean.
    (a as f32 + (b as f32 - a as f32) * factor) as u8
}

fn interpolate_engine(a: &EngineScene, b: &EngineScene, factor: f32) -> EngineScene {
    EngineScene {
        position: Position {
            x: lerp_u8(a.position.x, b.position.x, factor),
            y: lerp_u8(a.position.y, b.position.y, factor),
        },
        density: core::array::from_fn(|i| lerp_u8(a.density[i], b.density[i], factor)),
        randomness: lerp_u8(a.randomness, b.randomness, factor),
    }
}

/// Blend every field of two scenes; `factor` is clamped to `[0, 1]`.
pub fn interpolate(a: &Scene, b: &Scene, factor: f32) -> Scene {
    let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
    Scene {
        engines: core::array::from_fn(|e| interpolate_engine(&a.engines[e], &b.engines[e], factor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_a() -> Scene {
        Scene {
            engines: [
                EngineScene { position: Position::new(0, 200), density: [10, 255, 0], randomness: 7 },
                EngineScene { position: Position::new(64, 65), density: [127, 128, 1], randomness: 0 },
            ],
        }
    }

    fn scene_b() -> Scene {
        Scene {
            engines: [
                EngineScene { position: Position::new(255, 15), density: [15, 0, 255], randomness: 100 },
                EngineScene { position: Position::new(64, 90), density: [0, 131, 2], randomness: 255 },
            ],
        }
    }

    #[test]
    fn endpoints_are_exact() {
        assert_eq!(interpolate(&scene_a(), &scene_b(), 0.0), scene_a());
        assert_eq!(interpolate(&scene_a(), &scene_b(), 1.0), scene_b());
    }

    #[test]
    fn midpoint_is_truncated_mean() {
        let a = scene_a();
        let b = scene_b();
        let mid = interpolate(&a, &b, 0.5);
        for e in 0..NUM_ENGINES {
            let (ea, eb, em) = (&a.engines[e], &b.engines[e], &mid.engines[e]);
            let mean = |x: u8, y: u8| ((x as u16 + y as u16) / 2) as u8;
            assert_eq!(em.position.x, mean(ea.position.x, eb.position.x));
            assert_eq!(em.position.y, mean(ea.position.y, eb.position.y));
            for p in 0..NUM_PARTS {
                assert_eq!(em.density[p], mean(ea.density[p], eb.density[p]));
            }
            assert_eq!(em.randomness, mean(ea.randomness, eb.randomness));
        }
    }

    #[test]
    fn factor_is_clamped() {
        assert_eq!(interpolate(&scene_a(), &scene_b(), -3.0), scene_a());
        assert_eq!(interpolate(&scene_a(), &scene_b(), 7.5), scene_b());
        assert_eq!(interpolate(&scene_a(), &scene_b(), f32::NAN), scene_a());
    }

    #[test]
    fn default_scene_uses_default_density() {
        let scene = Scene::default();
        assert_eq!(scene.engines[1].density, [127; NUM_PARTS]);
        assert_eq!(scene.engines[0].randomness, 0);
    }
}
