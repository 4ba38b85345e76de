use crate::error::RenderError;
use crate::gltf::{Document, Primitive};
use crate::renderer::backend::{BufferTarget, GpuBackend, VertexAttribute};
use crate::renderer::resources::ResourceView;

/// The vertex attribute location of the POSITION attribute of glTF models.
pub const ATTR_LOC_POSITION: u32 = 0;
/// The vertex attribute location of the NORMAL attribute of glTF models.
pub const ATTR_LOC_NORMAL: u32 = 1;
/// The vertex attribute location of the TEXCOORD_0 attribute of glTF models.
pub const ATTR_LOC_TEXCOORD_0: u32 = 2;

pub fn attribute_slot(semantic: &str) -> Option<u32> {
    match semantic {
        "POSITION" => Some(ATTR_LOC_POSITION),
        "NORMAL" => Some(ATTR_LOC_NORMAL),
        "TEXCOORD_0" => Some(ATTR_LOC_TEXCOORD_0),
        _ => None,
    }
}

/// Enables a vertex input slot for each attribute of the primitive the
/// shader consumes, recording them in the currently bound vertex array.
/// Returns how many slots were enabled.
///
/// Attributes without a slot are skipped with a warning rather than treated
/// as errors, so documents with extra attributes still render.
pub fn bind_primitive_attributes<G: GpuBackend>(
    gpu: &mut G,
    document: &Document,
    primitive: &Primitive,
    resources: ResourceView<'_>,
) -> Result<usize, RenderError> {
    let mut enabled = 0;
    for (semantic, &accessor_index) in &primitive.attributes {
        let Some(slot) = attribute_slot(semantic) else {
            log::warn!("no vertex attribute slot for {semantic}, skipping it");
            continue;
        };
        let accessor = document.accessor(accessor_index)?;
        if accessor.shape.is_matrix() {
            log::warn!("{semantic} uses a matrix accessor, which cannot be a vertex attribute");
            continue;
        }
        let view_index = accessor
            .buffer_view
            .ok_or(RenderError::DetachedAccessor(accessor_index))?;
        let buffer = resources
            .buffer(view_index)
            .ok_or(RenderError::MissingResource(view_index))?;

        gpu.bind_buffer(BufferTarget::VertexData, Some(buffer));
        gpu.enable_vertex_attribute(&VertexAttribute {
            slot,
            component_count: accessor.shape.component_count(),
            component_type: accessor.component_type,
            normalized: accessor.normalized,
            stride: accessor.stride(),
            byte_offset: accessor.byte_offset,
        });
        enabled += 1;
    }
    gpu.bind_buffer(BufferTarget::VertexData, None);
    Ok(enabled)
}
