use std::collections::HashMap;

use glam::Mat4;

use crate::error::RenderError;
use crate::gltf::Document;

pub mod attributes;
pub mod backend;
pub mod draw_calls;
pub mod gl;
pub mod gl_backend;
#[cfg(test)]
pub(crate) mod mock;
pub mod program;
pub mod resources;
pub mod traverse;

use backend::{BufferTarget, GpuBackend, VertexArrayHandle};
use resources::{CleanupPolicy, ResourceTable};
use traverse::traverse;

/// A document bound to GPU resources: one buffer per targeted buffer view
/// and one vertex array per primitive of every mesh reachable from the
/// active scene.
pub struct SceneRenderer {
    document: Document,
    resources: ResourceTable,
    /// Mesh index to the vertex array of each of its primitives.
    vertex_arrays: HashMap<usize, Vec<VertexArrayHandle>>,
    destroyed: bool,
}

impl SceneRenderer {
    /// Validates the document, uploads its buffers and records the vertex
    /// attribute state of every reachable primitive, then applies the
    /// cleanup policy. Nothing is leaked if any step fails.
    pub fn new<G: GpuBackend>(
        gpu: &mut G,
        document: Document,
        policy: CleanupPolicy,
    ) -> Result<SceneRenderer, RenderError> {
        document.validate()?;
        gpu.bind_vertex_array(None);
        let resources = ResourceTable::bind(gpu, &document)?;
        let mut renderer = SceneRenderer {
            document,
            resources,
            vertex_arrays: HashMap::new(),
            destroyed: false,
        };
        if let Err(err) = renderer.bind_meshes(gpu) {
            renderer.destroy(gpu);
            return Err(err);
        }
        if policy == CleanupPolicy::RetainIndexOnly {
            renderer.resources.release_vertex_buffers(gpu);
        }
        log::info!(
            "Bound {} meshes, keeping {} GPU buffers ({policy:?})",
            renderer.vertex_arrays.len(),
            renderer.resources.view().len(),
        );
        Ok(renderer)
    }

    fn bind_meshes<G: GpuBackend>(&mut self, gpu: &mut G) -> Result<(), RenderError> {
        let document = &self.document;
        let resources = &self.resources;
        let vertex_arrays = &mut self.vertex_arrays;
        let result = traverse(document, Mat4::IDENTITY, |visit| {
            let Some(mesh_index) = visit.node.mesh else {
                return Ok(());
            };
            if vertex_arrays.contains_key(&mesh_index) {
                return Ok(());
            }
            let mesh = document.mesh(mesh_index)?;
            let vaos = vertex_arrays.entry(mesh_index).or_default();
            for primitive in &mesh.primitives {
                let vao = gpu.create_vertex_array()?;
                vaos.push(vao);
                gpu.bind_vertex_array(Some(vao));
                attributes::bind_primitive_attributes(gpu, document, primitive, resources.view())?;
            }
            Ok(())
        });
        gpu.bind_vertex_array(None);
        gpu.bind_buffer(BufferTarget::VertexData, None);
        result.map(|visited| log::debug!("Bind phase visited {visited} nodes"))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn resources(&self) -> resources::ResourceView<'_> {
        self.resources.view()
    }

    /// Draws every mesh of the active scene. `set_model` is called with each
    /// mesh node's world transform before its primitives are drawn.
    pub fn draw<G, F>(&self, gpu: &mut G, root: Mat4, mut set_model: F) -> Result<(), RenderError>
    where
        G: GpuBackend,
        F: FnMut(&mut G, Mat4),
    {
        traverse(&self.document, root, |visit| {
            let Some(mesh_index) = visit.node.mesh else {
                return Ok(());
            };
            let mesh = self.document.mesh(mesh_index)?;
            // A mesh the bind phase never reached has no vertex arrays, which
            // `draw_mesh` reports as a mismatch.
            let vertex_arrays = self
                .vertex_arrays
                .get(&mesh_index)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            set_model(gpu, visit.world);
            draw_calls::draw_mesh(gpu, &self.document, mesh, vertex_arrays, self.resources.view())
        })?;
        Ok(())
    }

    /// Deletes every GPU resource. The context must be current.
    pub fn destroy<G: GpuBackend>(mut self, gpu: &mut G) {
        for vao in self.vertex_arrays.drain().flat_map(|(_, vaos)| vaos) {
            gpu.delete_vertex_array(vao);
        }
        std::mem::take(&mut self.resources).destroy(gpu);
        self.destroyed = true;
    }
}

impl Drop for SceneRenderer {
    fn drop(&mut self) {
        if !self.destroyed {
            log::warn!("SceneRenderer dropped without destroy(), its GPU resources leak");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::TargetKind;
    use crate::renderer::mock::{Call, RecordingBackend};
    use crate::test_support::textured_document;

    #[test]
    fn retain_index_only_keeps_index_buffers_and_still_draws() {
        let mut gpu = RecordingBackend::new();
        let renderer =
            SceneRenderer::new(&mut gpu, textured_document(), CleanupPolicy::RetainIndexOnly)
                .unwrap();

        let view = renderer.resources();
        assert_eq!(view.len(), 1);
        assert_eq!(view.kind(3), Some(TargetKind::IndexData));
        assert_eq!(gpu.live_buffers.len(), 1);

        renderer.draw(&mut gpu, Mat4::IDENTITY, |_, _| {}).unwrap();
        // Nodes 0, 1 and 3 have meshes: 2 + 1 + 2 primitives.
        assert_eq!(gpu.draws().len(), 5);
        renderer.destroy(&mut gpu);
        assert!(gpu.live_buffers.is_empty());
        assert!(gpu.live_vertex_arrays.is_empty());
    }

    #[test]
    fn retain_all_keeps_every_uploaded_buffer() {
        let mut gpu = RecordingBackend::new();
        let renderer =
            SceneRenderer::new(&mut gpu, textured_document(), CleanupPolicy::RetainAll).unwrap();
        assert_eq!(renderer.resources().len(), 4);
        assert_eq!(gpu.live_buffers.len(), 4);
        renderer.destroy(&mut gpu);
        assert!(gpu.live_buffers.is_empty());
    }

    #[test]
    fn each_primitive_gets_its_own_vertex_array_once() {
        let mut gpu = RecordingBackend::new();
        let renderer =
            SceneRenderer::new(&mut gpu, textured_document(), CleanupPolicy::RetainAll).unwrap();

        // Mesh 0 is shared by nodes 0 and 3 but only bound once.
        assert_eq!(gpu.live_vertex_arrays.len(), 3);
        let attribute_vaos = gpu
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::EnableAttribute { vertex_array, .. } => *vertex_array,
                _ => None,
            })
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        assert_eq!(attribute_vaos, 3);
        assert_eq!(gpu.bound_vertex_array, None);
        renderer.destroy(&mut gpu);
    }

    #[test]
    fn draw_reports_world_transforms_per_mesh_node() {
        let mut gpu = RecordingBackend::new();
        let mut document = textured_document();
        document.nodes[1].transform = Mat4::from_translation(glam::Vec3::X);
        let renderer = SceneRenderer::new(&mut gpu, document, CleanupPolicy::RetainAll).unwrap();

        let mut models = Vec::new();
        renderer
            .draw(&mut gpu, Mat4::IDENTITY, |_, model| models.push(model.w_axis.x))
            .unwrap();
        assert_eq!(models, vec![0.0, 1.0, 1.0]);
        renderer.destroy(&mut gpu);
    }

    #[test]
    fn mesh_without_vertex_arrays_fails_to_draw() {
        let mut gpu = RecordingBackend::new();
        let mut renderer =
            SceneRenderer::new(&mut gpu, textured_document(), CleanupPolicy::RetainAll).unwrap();
        renderer.vertex_arrays.remove(&1);

        let result = renderer.draw(&mut gpu, Mat4::IDENTITY, |_, _| {});
        assert!(matches!(
            result,
            Err(RenderError::VertexArrayMismatch {
                primitives: 1,
                vertex_arrays: 0,
            })
        ));
        renderer.destroy(&mut gpu);
        // Mesh 1's vertex array was dropped from the table above.
        assert_eq!(gpu.live_vertex_arrays.len(), 1);
    }

    #[test]
    fn cyclic_document_fails_without_leaking() {
        let mut gpu = RecordingBackend::new();
        let mut document = textured_document();
        document.nodes[3].children = vec![1];

        let result = SceneRenderer::new(&mut gpu, document, CleanupPolicy::RetainIndexOnly);
        assert!(matches!(result, Err(RenderError::Cycle(1))));
        assert!(gpu.live_buffers.is_empty());
        assert!(gpu.live_vertex_arrays.is_empty());
    }

    #[test]
    fn invalid_reference_is_rejected_before_any_upload() {
        let mut gpu = RecordingBackend::new();
        let mut document = textured_document();
        document.nodes[2].mesh = Some(9);

        let result = SceneRenderer::new(&mut gpu, document, CleanupPolicy::RetainAll);
        assert!(matches!(result, Err(RenderError::Reference { .. })));
        assert_eq!(gpu.created_buffers(), 0);
    }
}
