//! 4x4 matrix.

use super::{Quaternion, Vector3};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A 4x4 matrix stored in column-major order, the layout uniform uploads
/// expect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix4 {
    /// Matrix elements in column-major order:
    /// `[m00, m10, m20, m30, m01, m11, m21, m31, ...]`.
    pub elements: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Create from a column-major array.
    #[inline]
    pub const fn from_cols_array(elements: [f32; 16]) -> Self {
        Self { elements }
    }

    /// Copy from another matrix.
    #[inline]
    pub fn copy(&mut self, m: &Matrix4) -> &mut Self {
        self.elements = m.elements;
        self
    }

    /// Reset to identity.
    #[inline]
    pub fn set_identity(&mut self) -> &mut Self {
        self.elements = Self::IDENTITY.elements;
        self
    }

    /// The translation column as a vector.
    #[inline]
    pub fn get_position(&self) -> Vector3 {
        Vector3 {
            x: self.elements[12],
            y: self.elements[13],
            z: self.elements[14],
        }
    }

    /// Overwrite the translation column.
    #[inline]
    pub fn set_position(&mut self, v: &Vector3) -> &mut Self {
        self.elements[12] = v.x;
        self.elements[13] = v.y;
        self.elements[14] = v.z;
        self
    }

    /// Per-axis scale (basis column lengths).
    pub fn get_scale(&self) -> Vector3 {
        let e = &self.elements;
        Vector3::new(
            Vector3::new(e[0], e[1], e[2]).length(),
            Vector3::new(e[4], e[5], e[6]).length(),
            Vector3::new(e[8], e[9], e[10]).length(),
        )
    }

    /// The largest scale factor along any basis axis. Used to scale
    /// bounding-sphere radii into world space.
    pub fn get_max_scale_on_axis(&self) -> f32 {
        let e = &self.elements;
        let sx2 = e[0] * e[0] + e[1] * e[1] + e[2] * e[2];
        let sy2 = e[4] * e[4] + e[5] * e[5] + e[6] * e[6];
        let sz2 = e[8] * e[8] + e[9] * e[9] + e[10] * e[10];
        sx2.max(sy2).max(sz2).sqrt()
    }

    /// Compose a transform from translation, rotation and scale.
    pub fn compose(position: &Vector3, quaternion: &Quaternion, scale: &Vector3) -> Self {
        let x2 = quaternion.x + quaternion.x;
        let y2 = quaternion.y + quaternion.y;
        let z2 = quaternion.z + quaternion.z;
        let xx = quaternion.x * x2;
        let xy = quaternion.x * y2;
        let xz = quaternion.x * z2;
        let yy = quaternion.y * y2;
        let yz = quaternion.y * z2;
        let zz = quaternion.z * z2;
        let wx = quaternion.w * x2;
        let wy = quaternion.w * y2;
        let wz = quaternion.w * z2;

        Self {
            elements: [
                (1.0 - (yy + zz)) * scale.x,
                (xy + wz) * scale.x,
                (xz - wy) * scale.x,
                0.0,
                (xy - wz) * scale.y,
                (1.0 - (xx + zz)) * scale.y,
                (yz + wx) * scale.y,
                0.0,
                (xz + wy) * scale.z,
                (yz - wx) * scale.z,
                (1.0 - (xx + yy)) * scale.z,
                0.0,
                position.x,
                position.y,
                position.z,
                1.0,
            ],
        }
    }

    /// Decompose into translation, rotation and scale. A negative
    /// determinant negates the x scale.
    pub fn decompose(&self) -> (Vector3, Quaternion, Vector3) {
        let e = &self.elements;

        let mut sx = Vector3::new(e[0], e[1], e[2]).length();
        let sy = Vector3::new(e[4], e[5], e[6]).length();
        let sz = Vector3::new(e[8], e[9], e[10]).length();

        if self.determinant() < 0.0 {
            sx = -sx;
        }

        let position = Vector3::new(e[12], e[13], e[14]);
        let scale = Vector3::new(sx, sy, sz);

        let inv_sx = if sx != 0.0 { 1.0 / sx } else { 0.0 };
        let inv_sy = if sy != 0.0 { 1.0 / sy } else { 0.0 };
        let inv_sz = if sz != 0.0 { 1.0 / sz } else { 0.0 };

        let quaternion = Quaternion::from_rotation_matrix_elements(
            e[0] * inv_sx, e[4] * inv_sy, e[8] * inv_sz,
            e[1] * inv_sx, e[5] * inv_sy, e[9] * inv_sz,
            e[2] * inv_sx, e[6] * inv_sy, e[10] * inv_sz,
        );

        (position, quaternion, scale)
    }

    /// Copy the rotation basis of another matrix, normalizing out its scale.
    pub fn extract_rotation(&mut self, m: &Matrix4) -> &mut Self {
        let e = &m.elements;

        let inv_sx = inv_len(e[0], e[1], e[2]);
        let inv_sy = inv_len(e[4], e[5], e[6]);
        let inv_sz = inv_len(e[8], e[9], e[10]);

        self.elements = [
            e[0] * inv_sx, e[1] * inv_sx, e[2] * inv_sx, 0.0,
            e[4] * inv_sy, e[5] * inv_sy, e[6] * inv_sy, 0.0,
            e[8] * inv_sz, e[9] * inv_sz, e[10] * inv_sz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];

        self
    }

    /// Translation matrix.
    pub fn from_translation(v: &Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.set_position(v);
        m
    }

    /// Rotation matrix from a quaternion.
    pub fn from_quaternion(q: &Quaternion) -> Self {
        Self::compose(&Vector3::ZERO, q, &Vector3::ONE)
    }

    /// Scale matrix.
    pub fn from_scale(v: &Vector3) -> Self {
        Self {
            elements: [
                v.x, 0.0, 0.0, 0.0,
                0.0, v.y, 0.0, 0.0,
                0.0, 0.0, v.z, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Rotation about the X axis.
    pub fn from_rotation_x(theta: f32) -> Self {
        let (s, c) = theta.sin_cos();
        Self {
            elements: [
                1.0, 0.0, 0.0, 0.0,
                0.0, c, s, 0.0,
                0.0, -s, c, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Rotation about the Y axis.
    pub fn from_rotation_y(theta: f32) -> Self {
        let (s, c) = theta.sin_cos();
        Self {
            elements: [
                c, 0.0, -s, 0.0,
                0.0, 1.0, 0.0, 0.0,
                s, 0.0, c, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Rotation about the Z axis.
    pub fn from_rotation_z(theta: f32) -> Self {
        let (s, c) = theta.sin_cos();
        Self {
            elements: [
                c, s, 0.0, 0.0,
                -s, c, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Rotation about an arbitrary normalized axis.
    pub fn from_axis_angle(axis: &Vector3, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);

        Self {
            elements: [
                t * x * x + c, t * x * y + s * z, t * x * z - s * y, 0.0,
                t * x * y - s * z, t * y * y + c, t * y * z + s * x, 0.0,
                t * x * z + s * y, t * y * z - s * x, t * z * z + c, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Build a rotation whose +Z basis points from `target` toward `eye`,
    /// with `up` projected out. This is the object-space look-at used by
    /// scene nodes (a camera looks down its local -Z).
    pub fn look_at(&mut self, eye: &Vector3, target: &Vector3, up: &Vector3) -> &mut Self {
        let mut z = *eye - *target;
        z.normalize();
        if z.is_zero() {
            z.z = 1.0;
        }

        let mut x = up.cross(&z);
        if x.length_squared() == 0.0 {
            // up is collinear with the view direction; nudge z
            z.x += 0.0001;
            z.normalize();
            x = up.cross(&z);
        }
        x.normalize();
        let y = z.cross(&x);

        let e = &mut self.elements;
        e[0] = x.x; e[1] = x.y; e[2] = x.z;
        e[4] = y.x; e[5] = y.y; e[6] = y.z;
        e[8] = z.x; e[9] = z.y; e[10] = z.z;

        self
    }

    /// General frustum projection, OpenGL clip conventions (z in -1..1).
    pub fn make_frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let x = 2.0 * near / (right - left);
        let y = 2.0 * near / (top - bottom);

        let a = (right + left) / (right - left);
        let b = (top + bottom) / (top - bottom);
        let c = -(far + near) / (far - near);
        let d = -2.0 * far * near / (far - near);

        Self {
            elements: [
                x, 0.0, 0.0, 0.0,
                0.0, y, 0.0, 0.0,
                a, b, c, -1.0,
                0.0, 0.0, d, 0.0,
            ],
        }
    }

    /// Symmetric perspective projection. `fov` is the vertical field of
    /// view in degrees.
    pub fn make_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let ymax = near * (fov.to_radians() * 0.5).tan();
        let ymin = -ymax;
        let xmin = ymin * aspect;
        let xmax = ymax * aspect;
        Self::make_frustum(xmin, xmax, ymin, ymax, near, far)
    }

    /// Orthographic projection, OpenGL clip conventions.
    pub fn make_orthographic(
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let w = right - left;
        let h = top - bottom;
        let p = far - near;

        let x = (right + left) / w;
        let y = (top + bottom) / h;
        let z = (far + near) / p;

        Self {
            elements: [
                2.0 / w, 0.0, 0.0, 0.0,
                0.0, 2.0 / h, 0.0, 0.0,
                0.0, 0.0, -2.0 / p, 0.0,
                -x, -y, -z, 1.0,
            ],
        }
    }

    /// Right-multiply: `self * other`.
    pub fn multiply(&self, other: &Matrix4) -> Self {
        let mut out = Self::IDENTITY;
        out.multiply_matrices(self, other);
        out
    }

    /// Store `a * b` into self.
    pub fn multiply_matrices(&mut self, a: &Matrix4, b: &Matrix4) -> &mut Self {
        let ae = &a.elements;
        let be = &b.elements;

        let mut out = [0.0f32; 16];
        for col in 0..4 {
            let b0 = be[col * 4];
            let b1 = be[col * 4 + 1];
            let b2 = be[col * 4 + 2];
            let b3 = be[col * 4 + 3];
            for row in 0..4 {
                out[col * 4 + row] = ae[row] * b0
                    + ae[4 + row] * b1
                    + ae[8 + row] * b2
                    + ae[12 + row] * b3;
            }
        }

        self.elements = out;
        self
    }

    /// Determinant.
    pub fn determinant(&self) -> f32 {
        let e = &self.elements;

        let n11 = e[0]; let n12 = e[4]; let n13 = e[8]; let n14 = e[12];
        let n21 = e[1]; let n22 = e[5]; let n23 = e[9]; let n24 = e[13];
        let n31 = e[2]; let n32 = e[6]; let n33 = e[10]; let n34 = e[14];
        let n41 = e[3]; let n42 = e[7]; let n43 = e[11]; let n44 = e[15];

        n41 * (n14 * n23 * n32 - n13 * n24 * n32 - n14 * n22 * n33
            + n12 * n24 * n33 + n13 * n22 * n34 - n12 * n23 * n34)
            + n42 * (n11 * n23 * n34 - n11 * n24 * n33 + n14 * n21 * n33
                - n13 * n21 * n34 + n13 * n24 * n31 - n14 * n23 * n31)
            + n43 * (n11 * n24 * n32 - n11 * n22 * n34 - n14 * n21 * n32
                + n12 * n21 * n34 + n14 * n22 * n31 - n12 * n24 * n31)
            + n44 * (-n13 * n22 * n31 - n11 * n23 * n32 + n11 * n22 * n33
                + n13 * n21 * n32 - n12 * n21 * n33 + n12 * n23 * n31)
    }

    /// Invert in place via the cofactor expansion. A singular matrix
    /// becomes identity.
    pub fn invert(&mut self) -> &mut Self {
        let e = &self.elements;

        let n11 = e[0]; let n12 = e[4]; let n13 = e[8]; let n14 = e[12];
        let n21 = e[1]; let n22 = e[5]; let n23 = e[9]; let n24 = e[13];
        let n31 = e[2]; let n32 = e[6]; let n33 = e[10]; let n34 = e[14];
        let n41 = e[3]; let n42 = e[7]; let n43 = e[11]; let n44 = e[15];

        let t11 = n23 * n34 * n42 - n24 * n33 * n42 + n24 * n32 * n43
            - n22 * n34 * n43 - n23 * n32 * n44 + n22 * n33 * n44;
        let t12 = n14 * n33 * n42 - n13 * n34 * n42 - n14 * n32 * n43
            + n12 * n34 * n43 + n13 * n32 * n44 - n12 * n33 * n44;
        let t13 = n13 * n24 * n42 - n14 * n23 * n42 + n14 * n22 * n43
            - n12 * n24 * n43 - n13 * n22 * n44 + n12 * n23 * n44;
        let t14 = n14 * n23 * n32 - n13 * n24 * n32 - n14 * n22 * n33
            + n12 * n24 * n33 + n13 * n22 * n34 - n12 * n23 * n34;

        let det = n11 * t11 + n21 * t12 + n31 * t13 + n41 * t14;

        if det == 0.0 {
            self.set_identity();
            return self;
        }

        let inv = 1.0 / det;

        self.elements = [
            t11 * inv,
            (n24 * n33 * n41 - n23 * n34 * n41 - n24 * n31 * n43
                + n21 * n34 * n43 + n23 * n31 * n44 - n21 * n33 * n44) * inv,
            (n22 * n34 * n41 - n24 * n32 * n41 + n24 * n31 * n42
                - n21 * n34 * n42 - n22 * n31 * n44 + n21 * n32 * n44) * inv,
            (n23 * n32 * n41 - n22 * n33 * n41 - n23 * n31 * n42
                + n21 * n33 * n42 + n22 * n31 * n43 - n21 * n32 * n43) * inv,
            t12 * inv,
            (n13 * n34 * n41 - n14 * n33 * n41 + n14 * n31 * n43
                - n11 * n34 * n43 - n13 * n31 * n44 + n11 * n33 * n44) * inv,
            (n14 * n32 * n41 - n12 * n34 * n41 - n14 * n31 * n42
                + n11 * n34 * n42 + n12 * n31 * n44 - n11 * n32 * n44) * inv,
            (n12 * n33 * n41 - n13 * n32 * n41 + n13 * n31 * n42
                - n11 * n33 * n42 - n12 * n31 * n43 + n11 * n32 * n43) * inv,
            t13 * inv,
            (n14 * n23 * n41 - n13 * n24 * n41 - n14 * n21 * n43
                + n11 * n24 * n43 + n13 * n21 * n44 - n11 * n23 * n44) * inv,
            (n12 * n24 * n41 - n14 * n22 * n41 + n14 * n21 * n42
                - n11 * n24 * n42 - n12 * n21 * n44 + n11 * n22 * n44) * inv,
            (n13 * n22 * n41 - n12 * n23 * n41 - n13 * n21 * n42
                + n11 * n23 * n42 + n12 * n21 * n43 - n11 * n22 * n43) * inv,
            t14 * inv,
            (n13 * n24 * n31 - n14 * n23 * n31 + n14 * n21 * n33
                - n11 * n24 * n33 - n13 * n21 * n34 + n11 * n23 * n34) * inv,
            (n14 * n22 * n31 - n12 * n24 * n31 - n14 * n21 * n32
                + n11 * n24 * n32 + n12 * n21 * n34 - n11 * n22 * n34) * inv,
            (n12 * n23 * n31 - n13 * n22 * n31 + n13 * n21 * n32
                - n11 * n23 * n32 - n12 * n21 * n33 + n11 * n22 * n33) * inv,
        ];

        self
    }

    /// Return the inverse.
    pub fn inverse(&self) -> Self {
        let mut m = *self;
        m.invert();
        m
    }

    /// Transpose in place.
    pub fn transpose(&mut self) -> &mut Self {
        self.elements.swap(1, 4);
        self.elements.swap(2, 8);
        self.elements.swap(3, 12);
        self.elements.swap(6, 9);
        self.elements.swap(7, 13);
        self.elements.swap(11, 14);
        self
    }

    /// Return the transpose.
    pub fn transposed(&self) -> Self {
        let mut m = *self;
        m.transpose();
        m
    }

    /// Transform a point, with translation and perspective divide.
    pub fn transform_point(&self, v: &Vector3) -> Vector3 {
        let e = &self.elements;
        let w = e[3] * v.x + e[7] * v.y + e[11] * v.z + e[15];
        let inv_w = if w != 0.0 { 1.0 / w } else { 0.0 };
        Vector3 {
            x: (e[0] * v.x + e[4] * v.y + e[8] * v.z + e[12]) * inv_w,
            y: (e[1] * v.x + e[5] * v.y + e[9] * v.z + e[13]) * inv_w,
            z: (e[2] * v.x + e[6] * v.y + e[10] * v.z + e[14]) * inv_w,
        }
    }

    /// Transform a direction: rotation only, no translation, no divide.
    pub fn transform_direction(&self, v: &Vector3) -> Vector3 {
        let e = &self.elements;
        Vector3 {
            x: e[0] * v.x + e[4] * v.y + e[8] * v.z,
            y: e[1] * v.x + e[5] * v.y + e[9] * v.z,
            z: e[2] * v.x + e[6] * v.y + e[10] * v.z,
        }
    }

    /// Approximate equality within an epsilon.
    pub fn approx_eq(&self, other: &Matrix4, epsilon: f32) -> bool {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .all(|(a, b)| (a - b).abs() < epsilon)
    }
}

#[inline]
fn inv_len(x: f32, y: f32, z: f32) -> f32 {
    let len = (x * x + y * y + z * z).sqrt();
    if len > 0.0 { 1.0 / len } else { 0.0 }
}

impl std::ops::Mul for Matrix4 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

impl std::ops::Mul<Vector3> for Matrix4 {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.transform_point(&rhs)
    }
}

impl From<glam::Mat4> for Matrix4 {
    fn from(m: glam::Mat4) -> Self {
        Self { elements: m.to_cols_array() }
    }
}

impl From<Matrix4> for glam::Mat4 {
    fn from(m: Matrix4) -> Self {
        glam::Mat4::from_cols_array(&m.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_identity() {
        let m = Matrix4::from_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert!(m.multiply(&Matrix4::IDENTITY).approx_eq(&m, 1e-6));
        assert!(Matrix4::IDENTITY.multiply(&m).approx_eq(&m, 1e-6));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let q = Quaternion::from_axis_angle(&Vector3::UNIT_Y.normalized(), 0.9);
        let m = Matrix4::compose(
            &Vector3::new(1.0, -2.0, 3.0),
            &q,
            &Vector3::new(2.0, 1.0, 0.5),
        );
        let product = m.multiply(&m.inverse());
        assert!(product.approx_eq(&Matrix4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_compose_decompose_roundtrip() {
        let p = Vector3::new(3.0, -1.0, 7.0);
        let q = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 0.0), 0.5);
        let s = Vector3::new(1.5, 2.0, 0.5);
        let (p2, q2, s2) = Matrix4::compose(&p, &q, &s).decompose();
        assert!(p2.approx_eq(&p, 1e-5));
        assert!(q2.approx_eq(&q, 1e-5));
        assert!(s2.approx_eq(&s, 1e-5));
    }

    #[test]
    fn test_perspective_maps_near_far() {
        let m = Matrix4::make_perspective(90.0, 1.0, 1.0, 10.0);
        let near = m.transform_point(&Vector3::new(0.0, 0.0, -1.0));
        let far = m.transform_point(&Vector3::new(0.0, 0.0, -10.0));
        assert!((near.z + 1.0).abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_direction_ignores_translation() {
        let m = Matrix4::from_translation(&Vector3::new(5.0, 5.0, 5.0));
        let d = m.transform_direction(&Vector3::UNIT_X);
        assert!(d.approx_eq(&Vector3::UNIT_X, 1e-6));
    }

    #[test]
    fn test_max_scale_on_axis() {
        let m = Matrix4::from_scale(&Vector3::new(2.0, 5.0, 3.0));
        assert!((m.get_max_scale_on_axis() - 5.0).abs() < 1e-6);
    }
}
