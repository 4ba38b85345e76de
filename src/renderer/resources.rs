use std::collections::BTreeMap;

use crate::error::RenderError;
use crate::gltf::{Document, TargetKind};
use crate::renderer::backend::{BufferHandle, BufferTarget, GpuBackend};

/// What happens to vertex buffers once every primitive's attribute state has
/// been recorded in its vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Keep every buffer until teardown.
    RetainAll,
    /// Delete vertex buffers after the bind phase. Vertex arrays keep the
    /// buffers they reference alive on the driver side, while index buffers
    /// are bound again on every draw and so stay in the table.
    #[default]
    RetainIndexOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    buffer: BufferHandle,
    kind: TargetKind,
}

/// GPU buffers keyed by the index of the buffer view they were uploaded
/// from. Only [`ResourceTable::bind`] adds entries; everything downstream
/// reads through a [`ResourceView`].
#[derive(Debug, Default)]
pub struct ResourceTable {
    entries: BTreeMap<usize, Entry>,
}

/// Read-only access to a [`ResourceTable`].
#[derive(Debug, Clone, Copy)]
pub struct ResourceView<'a> {
    entries: &'a BTreeMap<usize, Entry>,
}

impl ResourceView<'_> {
    pub fn buffer(&self, view_index: usize) -> Option<BufferHandle> {
        self.entries.get(&view_index).map(|entry| entry.buffer)
    }

    pub fn kind(&self, view_index: usize) -> Option<TargetKind> {
        self.entries.get(&view_index).map(|entry| entry.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn buffer_target(kind: TargetKind) -> Option<BufferTarget> {
    match kind {
        TargetKind::None => None,
        TargetKind::VertexData => Some(BufferTarget::VertexData),
        TargetKind::IndexData => Some(BufferTarget::IndexData),
    }
}

impl ResourceTable {
    /// Uploads every buffer view that declares a target into its own GPU
    /// buffer. Views without a target are never uploaded.
    ///
    /// If anything fails, the buffers created so far are deleted before the
    /// error is returned.
    pub fn bind<G: GpuBackend>(gpu: &mut G, document: &Document) -> Result<ResourceTable, RenderError> {
        let mut table = ResourceTable::default();
        if let Err(err) = table.upload_all(gpu, document) {
            table.destroy(gpu);
            return Err(err);
        }
        Ok(table)
    }

    fn upload_all<G: GpuBackend>(&mut self, gpu: &mut G, document: &Document) -> Result<(), RenderError> {
        for (view_index, view) in document.buffer_views.iter().enumerate() {
            let Some(target) = buffer_target(view.target) else {
                continue;
            };
            let bytes = document.view_bytes(view_index)?;
            let buffer = gpu.create_buffer()?;
            self.entries.insert(
                view_index,
                Entry {
                    buffer,
                    kind: view.target,
                },
            );
            gpu.bind_buffer(target, Some(buffer));
            gpu.upload_buffer(target, bytes);
        }
        // Unbinding the index target would detach it from a bound vertex
        // array, so only the vertex target is reset here.
        gpu.bind_buffer(BufferTarget::VertexData, None);
        log::debug!("Uploaded {} buffer views", self.entries.len());
        Ok(())
    }

    pub fn view(&self) -> ResourceView<'_> {
        ResourceView {
            entries: &self.entries,
        }
    }

    /// Deletes every vertex-data buffer. Must only be called once all vertex
    /// arrays that reference them have been recorded.
    pub fn release_vertex_buffers<G: GpuBackend>(&mut self, gpu: &mut G) -> usize {
        let vertex_views = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.kind == TargetKind::VertexData)
            .map(|(&view_index, _)| view_index)
            .collect::<Vec<_>>();
        for view_index in &vertex_views {
            if let Some(entry) = self.entries.remove(view_index) {
                gpu.delete_buffer(entry.buffer);
            }
        }
        log::debug!("Released {} vertex buffers", vertex_views.len());
        vertex_views.len()
    }

    /// Deletes every remaining buffer. The context must be current.
    pub fn destroy<G: GpuBackend>(self, gpu: &mut G) {
        for entry in self.entries.into_values() {
            gpu.delete_buffer(entry.buffer);
        }
    }
}
