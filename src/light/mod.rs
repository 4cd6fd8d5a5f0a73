//! Light descriptors. Lights are scene-graph nodes; the renderer
//! aggregates all visible lights into flat uniform arrays each frame.

use crate::math::{Color, Vector3};
use crate::scene::Object3D;
use std::sync::{RwLock, Weak};

/// Non-owning handle to a target node a directional or spot light aims at.
/// When absent (or dropped), the light aims at the world origin.
pub type LightTarget = Option<Weak<RwLock<Object3D>>>;

/// A light carried by an [`crate::scene::ObjectKind::Light`] node.
#[derive(Debug, Clone)]
pub struct Light {
    /// Kind and kind-specific parameters.
    pub kind: LightKind,
    /// The light only contributes to shadow passes, not shading.
    pub only_shadow: bool,
}

/// Light kinds with their parameters.
#[derive(Debug, Clone)]
pub enum LightKind {
    /// Omnidirectional base illumination, summed additively.
    Ambient {
        /// Light color.
        color: Color,
    },
    /// Parallel rays from the light position toward its target.
    Directional {
        /// Light color.
        color: Color,
        /// Intensity multiplier.
        intensity: f32,
        /// Aim target.
        target: LightTarget,
    },
    /// Point source with optional distance falloff.
    Point {
        /// Light color.
        color: Color,
        /// Intensity multiplier.
        intensity: f32,
        /// Cutoff distance; 0 means no falloff.
        distance: f32,
    },
    /// Cone-shaped source.
    Spot {
        /// Light color.
        color: Color,
        /// Intensity multiplier.
        intensity: f32,
        /// Cutoff distance; 0 means no falloff.
        distance: f32,
        /// Half-angle of the cone in radians.
        angle: f32,
        /// Falloff exponent toward the cone edge.
        exponent: f32,
        /// Aim target.
        target: LightTarget,
    },
    /// Sky/ground gradient keyed by world-space normal.
    Hemisphere {
        /// Color from above.
        sky_color: Color,
        /// Color from below.
        ground_color: Color,
        /// Intensity multiplier.
        intensity: f32,
    },
}

impl Light {
    /// Ambient light.
    pub fn ambient(color: Color) -> Self {
        Self {
            kind: LightKind::Ambient { color },
            only_shadow: false,
        }
    }

    /// Directional light aimed at the origin.
    pub fn directional(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional {
                color,
                intensity,
                target: None,
            },
            only_shadow: false,
        }
    }

    /// Point light.
    pub fn point(color: Color, intensity: f32, distance: f32) -> Self {
        Self {
            kind: LightKind::Point {
                color,
                intensity,
                distance,
            },
            only_shadow: false,
        }
    }

    /// Spot light aimed at the origin.
    pub fn spot(color: Color, intensity: f32, distance: f32, angle: f32, exponent: f32) -> Self {
        Self {
            kind: LightKind::Spot {
                color,
                intensity,
                distance,
                angle,
                exponent,
                target: None,
            },
            only_shadow: false,
        }
    }

    /// Hemisphere light.
    pub fn hemisphere(sky_color: Color, ground_color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Hemisphere {
                sky_color,
                ground_color,
                intensity,
            },
            only_shadow: false,
        }
    }

    /// Resolve the world position a directional/spot light aims at.
    pub(crate) fn target_position(target: &LightTarget) -> Vector3 {
        target
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .and_then(|node| node.read().ok().map(|node| node.matrix_world.get_position()))
            .unwrap_or(Vector3::ZERO)
    }
}
