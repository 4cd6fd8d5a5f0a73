//! GPU buffer management: staging-array assembly from geometry and
//! upload per dirty flags. Mesh groups carry their buffers; line and
//! particle objects use a flat vertex/color pair owned by the renderer.

use super::gl::{BufferHandle, BufferTarget, BufferUsage, GlDevice};
use crate::geometry::{BufferGeometry, Geometry, GeometryDirty, GeometryGroup};
use crate::material::Material;
use crate::math::Vector3;

/// Which optional mesh attributes a group uploads, derived from the
/// geometry's contents.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeshAttributeSet {
    pub normals: bool,
    pub uvs: bool,
    pub uv2: bool,
    pub colors: bool,
    pub tangents: bool,
    pub skin: bool,
    pub morphs: bool,
    pub morph_normals: bool,
}

impl MeshAttributeSet {
    pub(crate) fn from_geometry(geometry: &Geometry) -> Self {
        Self {
            normals: geometry.faces.iter().any(|f| !f.vertex_normals.is_empty())
                || geometry.faces.iter().any(|f| !f.normal.is_zero()),
            uvs: !geometry.face_vertex_uvs[0].is_empty(),
            uv2: !geometry.face_vertex_uvs[1].is_empty(),
            colors: geometry.faces.iter().any(|f| !f.vertex_colors.is_empty()),
            tangents: geometry.has_tangents,
            skin: !geometry.skin_weights.is_empty(),
            morphs: !geometry.morph_targets.is_empty(),
            morph_normals: !geometry.morph_normals.is_empty(),
        }
    }
}

/// Create the GPU buffers a mesh group needs. Idempotent.
pub(crate) fn create_mesh_buffers(
    device: &mut impl GlDevice,
    group: &mut GeometryGroup,
    attributes: MeshAttributeSet,
) {
    if group.buffers_created {
        return;
    }

    group.vertex_buffer = Some(device.create_buffer());
    group.face_buffer = Some(device.create_buffer());
    group.line_buffer = Some(device.create_buffer());

    if attributes.normals {
        group.normal_buffer = Some(device.create_buffer());
    }
    if attributes.tangents {
        group.tangent_buffer = Some(device.create_buffer());
    }
    if attributes.colors {
        group.color_buffer = Some(device.create_buffer());
    }
    if attributes.uvs {
        group.uv_buffer = Some(device.create_buffer());
    }
    if attributes.uv2 {
        group.uv2_buffer = Some(device.create_buffer());
    }
    if attributes.skin {
        group.skin_index_buffer = Some(device.create_buffer());
        group.skin_weight_buffer = Some(device.create_buffer());
    }
    if attributes.morphs {
        group.morph_target_buffers.clear();
    }
    if attributes.morph_normals {
        group.morph_normal_buffers.clear();
    }

    group.buffers_created = true;
}

fn upload_f32(
    device: &mut impl GlDevice,
    buffer: Option<BufferHandle>,
    data: &[f32],
    usage: BufferUsage,
) {
    if let Some(buffer) = buffer {
        if !data.is_empty() {
            device.bind_buffer(BufferTarget::Array, buffer);
            device.buffer_data_f32(BufferTarget::Array, data, usage);
        }
    }
}

fn push_vec3(array: &mut Vec<f32>, v: &Vector3) {
    array.push(v.x);
    array.push(v.y);
    array.push(v.z);
}

/// Rebuild the staging arrays a group's dirty flags call for and upload
/// them. Each face contributes three unique group-local vertices, so
/// per-vertex face data (normals, colors, tangents, UVs) stays
/// per-corner. For static geometries the staging arrays are dropped
/// after upload.
#[allow(clippy::too_many_arguments)]
pub(crate) fn set_mesh_buffers(
    device: &mut impl GlDevice,
    geometry: &Geometry,
    group: &mut GeometryGroup,
    dirty: GeometryDirty,
    attributes: MeshAttributeSet,
    usage: BufferUsage,
    dispose: bool,
    material: &Material,
    first_upload: bool,
) {
    let faces = &geometry.faces;

    if dirty.vertices || first_upload {
        group.position_array.clear();
        for &f in &group.faces {
            let face = &faces[f];
            for index in face.indices() {
                push_vec3(&mut group.position_array, &geometry.vertices[index]);
            }
        }
        let data = std::mem::take(&mut group.position_array);
        upload_f32(device, group.vertex_buffer, &data, usage);
        group.position_array = data;
    }

    if attributes.normals && (dirty.normals || first_upload) {
        group.normal_array.clear();
        for &f in &group.faces {
            let face = &faces[f];
            if face.vertex_normals.len() == 3 {
                for normal in &face.vertex_normals {
                    push_vec3(&mut group.normal_array, normal);
                }
            } else {
                for _ in 0..3 {
                    push_vec3(&mut group.normal_array, &face.normal);
                }
            }
        }
        let data = std::mem::take(&mut group.normal_array);
        upload_f32(device, group.normal_buffer, &data, usage);
        group.normal_array = data;
    }

    if attributes.tangents && (dirty.tangents || first_upload) {
        group.tangent_array.clear();
        for &f in &group.faces {
            let face = &faces[f];
            for tangent in &face.vertex_tangents {
                group.tangent_array.push(tangent.x);
                group.tangent_array.push(tangent.y);
                group.tangent_array.push(tangent.z);
                group.tangent_array.push(tangent.w);
            }
        }
        let data = std::mem::take(&mut group.tangent_array);
        upload_f32(device, group.tangent_buffer, &data, usage);
        group.tangent_array = data;
    }

    if attributes.colors && (dirty.colors || first_upload) {
        group.color_array.clear();
        for &f in &group.faces {
            let face = &faces[f];
            if face.vertex_colors.len() == 3 {
                for color in &face.vertex_colors {
                    group.color_array.push(color.r);
                    group.color_array.push(color.g);
                    group.color_array.push(color.b);
                }
            } else {
                for _ in 0..3 {
                    group.color_array.push(face.color.r);
                    group.color_array.push(face.color.g);
                    group.color_array.push(face.color.b);
                }
            }
        }
        let data = std::mem::take(&mut group.color_array);
        upload_f32(device, group.color_buffer, &data, usage);
        group.color_array = data;
    }

    if attributes.uvs && (dirty.uvs || first_upload) {
        group.uv_array.clear();
        for &f in &group.faces {
            if let Some(uvs) = geometry.face_vertex_uvs[0].get(f) {
                for uv in uvs {
                    group.uv_array.push(uv.x);
                    group.uv_array.push(uv.y);
                }
            }
        }
        let data = std::mem::take(&mut group.uv_array);
        upload_f32(device, group.uv_buffer, &data, usage);
        group.uv_array = data;
    }

    if attributes.uv2 && (dirty.uvs || first_upload) {
        group.uv2_array.clear();
        for &f in &group.faces {
            if let Some(uvs) = geometry.face_vertex_uvs[1].get(f) {
                for uv in uvs {
                    group.uv2_array.push(uv.x);
                    group.uv2_array.push(uv.y);
                }
            }
        }
        let data = std::mem::take(&mut group.uv2_array);
        upload_f32(device, group.uv2_buffer, &data, usage);
        group.uv2_array = data;
    }

    if attributes.skin && (dirty.vertices || first_upload) {
        group.skin_index_array.clear();
        group.skin_weight_array.clear();
        for &f in &group.faces {
            let face = &faces[f];
            for index in face.indices() {
                let skin_index = geometry.skin_indices.get(index).copied().unwrap_or_default();
                let skin_weight = geometry.skin_weights.get(index).copied().unwrap_or_default();
                group.skin_index_array.extend_from_slice(&skin_index.to_array());
                group.skin_weight_array.extend_from_slice(&skin_weight.to_array());
            }
        }
        let indices = std::mem::take(&mut group.skin_index_array);
        upload_f32(device, group.skin_index_buffer, &indices, usage);
        group.skin_index_array = indices;
        let weights = std::mem::take(&mut group.skin_weight_array);
        upload_f32(device, group.skin_weight_buffer, &weights, usage);
        group.skin_weight_array = weights;
    }

    if attributes.morphs && (dirty.morph_targets || first_upload) {
        while group.morph_target_buffers.len() < geometry.morph_targets.len() {
            group.morph_target_buffers.push(device.create_buffer());
        }
        group.morph_target_arrays = Vec::with_capacity(geometry.morph_targets.len());

        for (t, target) in geometry.morph_targets.iter().enumerate() {
            let mut array = Vec::with_capacity(group.vertex_count * 3);
            for &f in &group.faces {
                let face = &faces[f];
                for index in face.indices() {
                    let v = target.vertices.get(index).copied().unwrap_or(Vector3::ZERO);
                    push_vec3(&mut array, &v);
                }
            }
            upload_f32(device, Some(group.morph_target_buffers[t]), &array, usage);
            group.morph_target_arrays.push(array);
        }
    }

    if attributes.morph_normals && (dirty.morph_targets || first_upload) {
        while group.morph_normal_buffers.len() < geometry.morph_normals.len() {
            group.morph_normal_buffers.push(device.create_buffer());
        }
        group.morph_normal_arrays = Vec::with_capacity(geometry.morph_normals.len());

        for (t, morph) in geometry.morph_normals.iter().enumerate() {
            let mut array = Vec::with_capacity(group.vertex_count * 3);
            for &f in &group.faces {
                match morph.vertex_normals.get(f) {
                    Some(normals) => {
                        for normal in normals {
                            push_vec3(&mut array, normal);
                        }
                    }
                    None => {
                        let normal = morph.face_normals.get(f).copied().unwrap_or(Vector3::ZERO);
                        for _ in 0..3 {
                            push_vec3(&mut array, &normal);
                        }
                    }
                }
            }
            upload_f32(device, Some(group.morph_normal_buffers[t]), &array, usage);
            group.morph_normal_arrays.push(array);
        }
    }

    // custom attributes expand per group corner like positions do, with
    // one buffer per group
    if material.custom_attributes_dirty() || first_upload {
        for (name, attribute) in material.attributes.iter() {
            if !(attribute.needs_update || first_upload) {
                continue;
            }
            let item_size = attribute.size.item_size();
            let mut expanded = Vec::with_capacity(group.vertex_count * item_size);
            for &f in &group.faces {
                let face = &faces[f];
                for index in face.indices() {
                    let start = index * item_size;
                    for offset in 0..item_size {
                        expanded.push(attribute.array.get(start + offset).copied().unwrap_or(0.0));
                    }
                }
            }
            let buffer = *group
                .custom_buffers
                .entry(name.clone())
                .or_insert_with(|| device.create_buffer());
            device.bind_buffer(BufferTarget::Array, buffer);
            device.buffer_data_f32(BufferTarget::Array, &expanded, usage);
        }
    }

    if dirty.elements || first_upload {
        group.face_array.clear();
        group.line_array.clear();

        let mut vertex_index: u16 = 0;
        for _ in &group.faces {
            group.face_array.push(vertex_index);
            group.face_array.push(vertex_index + 1);
            group.face_array.push(vertex_index + 2);

            group.line_array.push(vertex_index);
            group.line_array.push(vertex_index + 1);
            group.line_array.push(vertex_index);
            group.line_array.push(vertex_index + 2);
            group.line_array.push(vertex_index + 1);
            group.line_array.push(vertex_index + 2);

            vertex_index += 3;
        }

        group.face_index_count = group.face_array.len();
        group.line_index_count = group.line_array.len();

        if let Some(buffer) = group.face_buffer {
            device.bind_buffer(BufferTarget::ElementArray, buffer);
            device.buffer_data_u16(BufferTarget::ElementArray, &group.face_array, usage);
        }
        if let Some(buffer) = group.line_buffer {
            device.bind_buffer(BufferTarget::ElementArray, buffer);
            device.buffer_data_u16(BufferTarget::ElementArray, &group.line_array, usage);
        }
    }

    if dispose {
        group.dispose_staging();
    }
}

/// Flat buffers for line and particle objects.
#[derive(Debug, Default)]
pub(crate) struct DirectBuffers {
    pub vertex_buffer: Option<BufferHandle>,
    pub color_buffer: Option<BufferHandle>,
    pub line_distance_buffer: Option<BufferHandle>,
    pub vertex_count: usize,
}

impl DirectBuffers {
    /// Drain GPU handles for deletion.
    pub(crate) fn take_buffers(&mut self) -> Vec<BufferHandle> {
        [
            self.vertex_buffer.take(),
            self.color_buffer.take(),
            self.line_distance_buffer.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Upload line/particle vertex data: positions, optional colors and
/// (for dashed lines) line distances.
pub(crate) fn set_direct_buffers(
    device: &mut impl GlDevice,
    buffers: &mut DirectBuffers,
    geometry: &Geometry,
    dirty: GeometryDirty,
    with_line_distances: bool,
    usage: BufferUsage,
) {
    let first = buffers.vertex_buffer.is_none();

    if first {
        buffers.vertex_buffer = Some(device.create_buffer());
        if !geometry.colors.is_empty() {
            buffers.color_buffer = Some(device.create_buffer());
        }
        if with_line_distances {
            buffers.line_distance_buffer = Some(device.create_buffer());
        }
    }

    if dirty.vertices || first {
        let mut array = Vec::with_capacity(geometry.vertices.len() * 3);
        for vertex in &geometry.vertices {
            push_vec3(&mut array, vertex);
        }
        upload_f32(device, buffers.vertex_buffer, &array, usage);
        buffers.vertex_count = geometry.vertices.len();
    }

    if (dirty.colors || first) && !geometry.colors.is_empty() {
        if buffers.color_buffer.is_none() {
            buffers.color_buffer = Some(device.create_buffer());
        }
        let mut array = Vec::with_capacity(geometry.colors.len() * 3);
        for color in &geometry.colors {
            array.push(color.r);
            array.push(color.g);
            array.push(color.b);
        }
        upload_f32(device, buffers.color_buffer, &array, usage);
    }

    if with_line_distances && (dirty.line_distances || first) && !geometry.line_distances.is_empty()
    {
        upload_f32(
            device,
            buffers.line_distance_buffer,
            &geometry.line_distances,
            usage,
        );
    }
}

/// Upload a buffer geometry's attribute arrays and index.
pub(crate) fn set_buffer_geometry(
    device: &mut impl GlDevice,
    geometry: &mut BufferGeometry,
    usage: BufferUsage,
    dispose: bool,
) {
    for attribute in geometry.attributes.values_mut() {
        if attribute.needs_update || attribute.buffer.is_none() {
            let buffer = *attribute
                .buffer
                .get_or_insert_with(|| device.create_buffer());
            device.bind_buffer(BufferTarget::Array, buffer);
            device.buffer_data_f32(BufferTarget::Array, &attribute.array, usage);
            attribute.needs_update = false;
            if dispose {
                attribute.array = Vec::new();
            }
        }
    }

    if let Some(index) = &geometry.index {
        if geometry.index_needs_update || geometry.index_buffer.is_none() {
            // local indices fit u16 by construction; overflow happens when a
            // chunk's base vertex pushes its largest index past the 16-bit
            // range. Such a chunk can never draw correctly: log and drop it.
            let index_len = index.len();
            geometry.offsets.retain(|offset| {
                if offset.start + offset.count > index_len {
                    log::warn!(
                        "buffer geometry draw chunk overruns the index array; chunk skipped"
                    );
                    return false;
                }
                let chunk_max = index[offset.start..offset.start + offset.count]
                    .iter()
                    .copied()
                    .max()
                    .unwrap_or(0) as usize;
                if offset.index + chunk_max > u16::MAX as usize {
                    log::warn!(
                        "buffer geometry draw chunk addresses vertex {} beyond the 16-bit index range; chunk skipped",
                        offset.index + chunk_max
                    );
                    return false;
                }
                true
            });

            let buffer = *geometry
                .index_buffer
                .get_or_insert_with(|| device.create_buffer());
            device.bind_buffer(BufferTarget::ElementArray, buffer);
            device.buffer_data_u16(BufferTarget::ElementArray, index, usage);
            geometry.index_needs_update = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, MaterialKind};
    use crate::math::Color;
    use crate::renderer::trace::{TraceCall, TraceDevice};

    fn geometry() -> Geometry {
        let mut g = crate::geometry::box_geometry(1.0, 1.0, 1.0);
        g.sort_faces_by_material();
        g
    }

    #[test]
    fn test_mesh_upload_counts() {
        let mut device = TraceDevice::new();
        let mut g = geometry();
        let attributes = MeshAttributeSet::from_geometry(&g);
        let mut material = Material::new(MaterialKind::Basic);

        let mut groups = std::mem::take(&mut g.groups);
        let group = &mut groups[0];
        create_mesh_buffers(&mut device, group, attributes);
        set_mesh_buffers(
            &mut device,
            &g,
            group,
            GeometryDirty::all(),
            attributes,
            BufferUsage::Dynamic,
            false,
            &material,
            true,
        );

        // 12 faces -> 36 unique vertices
        assert_eq!(group.position_array.len(), 36 * 3);
        assert_eq!(group.face_index_count, 36);
        assert_eq!(group.line_index_count, 72);
        g.groups = groups;
    }

    #[test]
    fn test_static_geometry_drops_staging() {
        let mut device = TraceDevice::new();
        let mut g = geometry();
        let attributes = MeshAttributeSet::from_geometry(&g);
        let mut material = Material::new(MaterialKind::Basic);

        let mut groups = std::mem::take(&mut g.groups);
        let group = &mut groups[0];
        create_mesh_buffers(&mut device, group, attributes);
        set_mesh_buffers(
            &mut device,
            &g,
            group,
            GeometryDirty::all(),
            attributes,
            BufferUsage::Static,
            true,
            &material,
            true,
        );

        assert!(group.position_array.is_empty());
        assert!(group.face_array.is_empty());
        // index counts survive disposal
        assert_eq!(group.face_index_count, 36);
    }

    #[test]
    fn test_direct_buffers_upload_colors() {
        let mut device = TraceDevice::new();
        let mut g = Geometry::new();
        g.vertices = vec![Vector3::ZERO, Vector3::UNIT_X];
        g.colors = vec![Color::WHITE, Color::BLACK];

        let mut buffers = DirectBuffers::default();
        set_direct_buffers(
            &mut device,
            &mut buffers,
            &g,
            GeometryDirty::all(),
            false,
            BufferUsage::Dynamic,
        );

        assert_eq!(buffers.vertex_count, 2);
        assert!(buffers.color_buffer.is_some());
        let uploads = device.count_calls(|c| matches!(c, TraceCall::BufferDataF32 { .. }));
        assert_eq!(uploads, 2);
    }
}
