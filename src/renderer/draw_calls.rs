use crate::error::RenderError;
use crate::gltf::{Document, Mesh, Primitive, Topology};
use crate::renderer::backend::{
    BufferHandle, BufferTarget, GpuBackend, IndexedDraw, VertexArrayHandle,
};
use crate::renderer::resources::ResourceView;

/// Everything needed to issue the draw call of one primitive, resolved from
/// the document and resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Indexed {
        index_buffer: BufferHandle,
        draw: IndexedDraw,
    },
    Arrays {
        mode: Topology,
        count: usize,
    },
}

impl DrawCall {
    fn resolve(
        document: &Document,
        primitive: &Primitive,
        resources: ResourceView<'_>,
    ) -> Result<DrawCall, RenderError> {
        let Some(indices) = primitive.indices else {
            // Non-indexed primitives draw as many vertices as they have
            // positions.
            let count = match primitive.attributes.get("POSITION") {
                Some(&accessor) => document.accessor(accessor)?.count,
                None => 0,
            };
            return Ok(DrawCall::Arrays {
                mode: primitive.mode,
                count,
            });
        };
        let accessor = document.accessor(indices)?;
        let view_index = accessor
            .buffer_view
            .ok_or(RenderError::DetachedAccessor(indices))?;
        // The bind phase uploads every index view, so a missing buffer here
        // means the document changed or was never bound.
        let index_buffer = resources
            .buffer(view_index)
            .ok_or(RenderError::MissingResource(view_index))?;
        Ok(DrawCall::Indexed {
            index_buffer,
            draw: IndexedDraw {
                mode: primitive.mode,
                index_count: accessor.count,
                index_type: accessor.component_type,
                byte_offset: accessor.byte_offset,
            },
        })
    }
}

/// Issues one draw call per primitive of the mesh, in declared order.
/// `vertex_arrays` holds the vertex array recorded for each primitive.
pub fn draw_mesh<G: GpuBackend>(
    gpu: &mut G,
    document: &Document,
    mesh: &Mesh,
    vertex_arrays: &[VertexArrayHandle],
    resources: ResourceView<'_>,
) -> Result<(), RenderError> {
    if vertex_arrays.len() != mesh.primitives.len() {
        return Err(RenderError::VertexArrayMismatch {
            primitives: mesh.primitives.len(),
            vertex_arrays: vertex_arrays.len(),
        });
    }
    for (primitive, &vao) in mesh.primitives.iter().zip(vertex_arrays) {
        let draw_call = DrawCall::resolve(document, primitive, resources)?;
        gpu.bind_vertex_array(Some(vao));
        match draw_call {
            DrawCall::Indexed { index_buffer, draw } => {
                gpu.bind_buffer(BufferTarget::IndexData, Some(index_buffer));
                gpu.draw_elements(&draw);
            }
            DrawCall::Arrays { count: 0, .. } => {
                log::debug!("primitive has neither indices nor positions, skipping it");
            }
            DrawCall::Arrays { mode, count } => gpu.draw_arrays(mode, 0, count),
        }
    }
    Ok(())
}
