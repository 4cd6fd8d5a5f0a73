//! Per-frame light aggregation into the flat parallel arrays the shaders
//! index. Capacity is kept across frames; stale tails are zeroed because
//! the shader loops read the full compiled-in array length.

use crate::light::{Light, LightKind};
use crate::math::Color;
use crate::scene::{ObjectKind, ObjectRef};

/// Flattened arrays for one light kind.
#[derive(Debug, Default)]
pub struct DirectionalArrays {
    /// RGB triples scaled by intensity.
    pub colors: Vec<f32>,
    /// Unit directions (position toward target), xyz triples.
    pub directions: Vec<f32>,
    /// Active light count.
    pub length: usize,
}

/// Point light arrays.
#[derive(Debug, Default)]
pub struct PointArrays {
    /// RGB triples scaled by intensity.
    pub colors: Vec<f32>,
    /// World positions, xyz triples.
    pub positions: Vec<f32>,
    /// Falloff distances.
    pub distances: Vec<f32>,
    /// Active light count.
    pub length: usize,
}

/// Spot light arrays.
#[derive(Debug, Default)]
pub struct SpotArrays {
    /// RGB triples scaled by intensity.
    pub colors: Vec<f32>,
    /// World positions, xyz triples.
    pub positions: Vec<f32>,
    /// Unit directions, xyz triples.
    pub directions: Vec<f32>,
    /// Falloff distances.
    pub distances: Vec<f32>,
    /// Cosine of the cone half-angle.
    pub angles_cos: Vec<f32>,
    /// Edge falloff exponents.
    pub exponents: Vec<f32>,
    /// Active light count.
    pub length: usize,
}

/// Hemisphere light arrays.
#[derive(Debug, Default)]
pub struct HemisphereArrays {
    /// Sky RGB triples.
    pub sky_colors: Vec<f32>,
    /// Ground RGB triples.
    pub ground_colors: Vec<f32>,
    /// World positions, xyz triples.
    pub positions: Vec<f32>,
    /// Active light count.
    pub length: usize,
}

/// All aggregated light state for a frame.
#[derive(Debug, Default)]
pub struct LightArrays {
    /// Summed ambient color.
    pub ambient: [f32; 3],
    /// Directional lights.
    pub directional: DirectionalArrays,
    /// Point lights.
    pub point: PointArrays,
    /// Spot lights.
    pub spot: SpotArrays,
    /// Hemisphere lights.
    pub hemi: HemisphereArrays,
}

fn grow(array: &mut Vec<f32>, len: usize) {
    if array.len() < len {
        array.resize(len, 0.0);
    }
}

fn write_color(array: &mut [f32], offset: usize, color: &Color, scale: f32, gamma: bool) {
    if gamma {
        array[offset] = color.r * color.r * scale * scale;
        array[offset + 1] = color.g * color.g * scale * scale;
        array[offset + 2] = color.b * color.b * scale * scale;
    } else {
        array[offset] = color.r * scale;
        array[offset + 1] = color.g * scale;
        array[offset + 2] = color.b * scale;
    }
}

impl LightArrays {
    /// Rebuild the arrays from the scene's live lights. Ambient colors
    /// accumulate additively (squared under `gamma_input`); hidden and
    /// shadow-only lights are skipped; tails beyond the new counts are
    /// zeroed.
    pub fn setup(&mut self, lights: &[ObjectRef], gamma_input: bool) {
        let mut ambient = [0.0f32; 3];
        let (mut d, mut p, mut s, mut h) = (0usize, 0usize, 0usize, 0usize);

        for node_ref in lights {
            let Ok(node) = node_ref.read() else { continue };
            let ObjectKind::Light(light) = &node.kind else {
                continue;
            };
            if light.only_shadow || !node.visible {
                continue;
            }

            let world_position = node.matrix_world.get_position();

            match &light.kind {
                LightKind::Ambient { color } => {
                    if gamma_input {
                        ambient[0] += color.r * color.r;
                        ambient[1] += color.g * color.g;
                        ambient[2] += color.b * color.b;
                    } else {
                        ambient[0] += color.r;
                        ambient[1] += color.g;
                        ambient[2] += color.b;
                    }
                }
                LightKind::Directional { color, intensity, target } => {
                    let offset = d * 3;
                    grow(&mut self.directional.colors, offset + 3);
                    grow(&mut self.directional.directions, offset + 3);

                    write_color(&mut self.directional.colors, offset, color, *intensity, gamma_input);

                    let mut direction = world_position - Light::target_position(target);
                    direction.normalize();
                    self.directional.directions[offset] = direction.x;
                    self.directional.directions[offset + 1] = direction.y;
                    self.directional.directions[offset + 2] = direction.z;

                    d += 1;
                }
                LightKind::Point { color, intensity, distance } => {
                    let offset = p * 3;
                    grow(&mut self.point.colors, offset + 3);
                    grow(&mut self.point.positions, offset + 3);
                    grow(&mut self.point.distances, p + 1);

                    write_color(&mut self.point.colors, offset, color, *intensity, gamma_input);

                    self.point.positions[offset] = world_position.x;
                    self.point.positions[offset + 1] = world_position.y;
                    self.point.positions[offset + 2] = world_position.z;
                    self.point.distances[p] = *distance;

                    p += 1;
                }
                LightKind::Spot { color, intensity, distance, angle, exponent, target } => {
                    let offset = s * 3;
                    grow(&mut self.spot.colors, offset + 3);
                    grow(&mut self.spot.positions, offset + 3);
                    grow(&mut self.spot.directions, offset + 3);
                    grow(&mut self.spot.distances, s + 1);
                    grow(&mut self.spot.angles_cos, s + 1);
                    grow(&mut self.spot.exponents, s + 1);

                    write_color(&mut self.spot.colors, offset, color, *intensity, gamma_input);

                    self.spot.positions[offset] = world_position.x;
                    self.spot.positions[offset + 1] = world_position.y;
                    self.spot.positions[offset + 2] = world_position.z;

                    let mut direction = world_position - Light::target_position(target);
                    direction.normalize();
                    self.spot.directions[offset] = direction.x;
                    self.spot.directions[offset + 1] = direction.y;
                    self.spot.directions[offset + 2] = direction.z;

                    self.spot.distances[s] = *distance;
                    self.spot.angles_cos[s] = angle.cos();
                    self.spot.exponents[s] = *exponent;

                    s += 1;
                }
                LightKind::Hemisphere { sky_color, ground_color, intensity } => {
                    let offset = h * 3;
                    grow(&mut self.hemi.sky_colors, offset + 3);
                    grow(&mut self.hemi.ground_colors, offset + 3);
                    grow(&mut self.hemi.positions, offset + 3);

                    write_color(&mut self.hemi.sky_colors, offset, sky_color, *intensity, gamma_input);
                    write_color(&mut self.hemi.ground_colors, offset, ground_color, *intensity, gamma_input);

                    self.hemi.positions[offset] = world_position.x;
                    self.hemi.positions[offset + 1] = world_position.y;
                    self.hemi.positions[offset + 2] = world_position.z;

                    h += 1;
                }
            }
        }

        // zero remains of removed lights so shaders reading the full
        // array see black, not stale values
        for value in self.directional.colors.iter_mut().skip(d * 3) {
            *value = 0.0;
        }
        for value in self.point.colors.iter_mut().skip(p * 3) {
            *value = 0.0;
        }
        for value in self.spot.colors.iter_mut().skip(s * 3) {
            *value = 0.0;
        }
        for value in self.hemi.sky_colors.iter_mut().skip(h * 3) {
            *value = 0.0;
        }
        for value in self.hemi.ground_colors.iter_mut().skip(h * 3) {
            *value = 0.0;
        }

        self.ambient = ambient;
        self.directional.length = d;
        self.point.length = p;
        self.spot.length = s;
        self.hemi.length = h;
    }
}

/// Visible light counts, clamped to the configured maximum in the order
/// directional, point, spot, hemisphere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightCount {
    /// Directional lights.
    pub directional: usize,
    /// Point lights.
    pub point: usize,
    /// Spot lights.
    pub spot: usize,
    /// Hemisphere lights.
    pub hemi: usize,
}

/// Count visible lights, clamping the total to `max_lights` (ambient
/// lights are uncounted). Logs once per call when clamping occurs.
pub fn allocate_lights(lights: &[ObjectRef], max_lights: usize) -> LightCount {
    let mut count = LightCount::default();
    let mut total = 0usize;
    let mut clamped = false;

    for node_ref in lights {
        let Ok(node) = node_ref.read() else { continue };
        let ObjectKind::Light(light) = &node.kind else {
            continue;
        };
        if light.only_shadow || !node.visible {
            continue;
        }

        let slot = match &light.kind {
            LightKind::Ambient { .. } => None,
            LightKind::Directional { .. } => Some(&mut count.directional),
            LightKind::Point { .. } => Some(&mut count.point),
            LightKind::Spot { .. } => Some(&mut count.spot),
            LightKind::Hemisphere { .. } => Some(&mut count.hemi),
        };

        if let Some(slot) = slot {
            if total < max_lights {
                *slot += 1;
                total += 1;
            } else {
                clamped = true;
            }
        }
    }

    if clamped {
        log::warn!("light count exceeds max_lights = {max_lights}; extra lights ignored");
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Object3D;

    fn light_node(light: Light) -> ObjectRef {
        Object3D::with_kind(ObjectKind::Light(light)).into_ref()
    }

    #[test]
    fn test_ambient_accumulates() {
        let lights = vec![
            light_node(Light::ambient(Color::new(0.25, 0.5, 0.0))),
            light_node(Light::ambient(Color::new(0.25, 0.0, 1.0))),
        ];
        let mut arrays = LightArrays::default();
        arrays.setup(&lights, false);
        assert!((arrays.ambient[0] - 0.5).abs() < 1e-6);
        assert!((arrays.ambient[1] - 0.5).abs() < 1e-6);
        assert!((arrays.ambient[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gamma_input_squares() {
        let lights = vec![light_node(Light::ambient(Color::new(0.5, 0.5, 0.5)))];
        let mut arrays = LightArrays::default();
        arrays.setup(&lights, true);
        assert!((arrays.ambient[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_tail_zeroed_when_lights_shrink() {
        let two = vec![
            light_node(Light::point(Color::WHITE, 1.0, 0.0)),
            light_node(Light::point(Color::WHITE, 1.0, 0.0)),
        ];
        let one = vec![light_node(Light::point(Color::WHITE, 1.0, 0.0))];

        let mut arrays = LightArrays::default();
        arrays.setup(&two, false);
        assert_eq!(arrays.point.length, 2);

        arrays.setup(&one, false);
        assert_eq!(arrays.point.length, 1);
        // capacity kept, tail zeroed
        assert_eq!(arrays.point.colors.len(), 6);
        assert_eq!(&arrays.point.colors[3..6], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_allocate_lights_clamps() {
        let lights: Vec<ObjectRef> = (0..6)
            .map(|_| light_node(Light::point(Color::WHITE, 1.0, 0.0)))
            .collect();
        let count = allocate_lights(&lights, 4);
        assert_eq!(count.point, 4);
    }

    #[test]
    fn test_invisible_lights_skipped() {
        let node = light_node(Light::point(Color::WHITE, 1.0, 0.0));
        node.write().unwrap().visible = false;
        let mut arrays = LightArrays::default();
        arrays.setup(&[node], false);
        assert_eq!(arrays.point.length, 0);
    }
}
