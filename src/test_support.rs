//! Fixtures shared by the unit tests.

use std::collections::BTreeMap;
use std::path::Path;

use glam::Mat4;

use crate::gltf::{
    parse_glb, Accessor, Buffer, BufferView, ComponentType, Document, Mesh, Node, Primitive, Scene,
    Shape, TargetKind, Topology,
};

pub const TRIANGLE_GLTF_JSON: &str = r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0]}],
  "nodes": [
    {"children": [1]},
    {"mesh": 0, "translation": [0.0, 1.0, 0.0]}
  ],
  "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
  "accessors": [
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
    {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
  ],
  "bufferViews": [
    {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
    {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963},
    {"buffer": 0, "byteOffset": 0, "byteLength": 4}
  ],
  "buffers": [{"byteLength": 42}]
}"#;

pub fn triangle_bin() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin = bytemuck::cast_slice::<_, u8>(&positions).to_vec();
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    bin
}

/// Packs a JSON document and binary payload into a `.glb` container.
pub fn glb_bytes(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let mut length = 12 + 8 + json.len();
    if !bin.is_empty() {
        length += 8 + bin.len();
    }

    let mut bytes = Vec::with_capacity(length);
    bytes.extend_from_slice(b"glTF");
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&(length as u32).to_le_bytes());
    bytes.extend_from_slice(&(json.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    bytes.extend_from_slice(&json);
    if !bin.is_empty() {
        bytes.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        bytes.extend_from_slice(&bin);
    }
    bytes
}

pub fn triangle_glb() -> Vec<u8> {
    glb_bytes(TRIANGLE_GLTF_JSON, &triangle_bin())
}

pub fn triangle_document() -> Document {
    parse_glb(&triangle_glb(), Path::new("")).unwrap()
}

fn accessor(view: usize, shape: Shape, component_type: ComponentType, offset: usize) -> Accessor {
    Accessor {
        buffer_view: Some(view),
        component_type,
        shape,
        count: 3,
        byte_offset: offset,
        normalized: false,
        byte_stride: None,
    }
}

fn node(mesh: Option<usize>, children: Vec<usize>) -> Node {
    Node {
        mesh,
        children,
        transform: Mat4::IDENTITY,
    }
}

/// A document with two meshes, interleaved attributes, an attribute the
/// renderer has no slot for (`TANGENT`), a metadata-only buffer view and a
/// four node hierarchy:
///
/// ```text
/// 0 (mesh 0)
/// ├── 1 (mesh 1)
/// │   └── 3 (mesh 0)
/// └── 2
/// ```
pub fn textured_document() -> Document {
    let views = vec![
        // 0: positions
        (0, 36, TargetKind::VertexData),
        // 1: normals
        (36, 36, TargetKind::VertexData),
        // 2: texcoords followed by tangents
        (72, 72, TargetKind::VertexData),
        // 3: indices
        (144, 6, TargetKind::IndexData),
        // 4: metadata only
        (152, 8, TargetKind::None),
    ];
    let buffer_views = views
        .into_iter()
        .map(|(byte_offset, byte_length, target)| BufferView {
            buffer: 0,
            byte_offset,
            byte_length,
            byte_stride: None,
            target,
        })
        .collect();
    let accessors = vec![
        accessor(0, Shape::Vec3, ComponentType::Float, 0),
        accessor(1, Shape::Vec3, ComponentType::Float, 0),
        accessor(2, Shape::Vec2, ComponentType::Float, 0),
        accessor(2, Shape::Vec4, ComponentType::Float, 24),
        accessor(3, Shape::Scalar, ComponentType::UnsignedShort, 0),
    ];
    let full = Primitive {
        attributes: BTreeMap::from([
            ("POSITION".to_string(), 0),
            ("NORMAL".to_string(), 1),
            ("TEXCOORD_0".to_string(), 2),
            ("TANGENT".to_string(), 3),
        ]),
        indices: Some(4),
        mode: Topology::Triangles,
    };
    let outline = Primitive {
        attributes: BTreeMap::from([("POSITION".to_string(), 0)]),
        indices: Some(4),
        mode: Topology::LineLoop,
    };
    let points = Primitive {
        attributes: BTreeMap::from([("POSITION".to_string(), 0)]),
        indices: None,
        mode: Topology::Points,
    };
    Document {
        buffers: vec![Buffer {
            data: vec![0; 160],
        }],
        buffer_views,
        accessors,
        meshes: vec![
            Mesh {
                primitives: vec![full, outline],
            },
            Mesh {
                primitives: vec![points],
            },
        ],
        nodes: vec![
            node(Some(0), vec![1, 2]),
            node(Some(1), vec![3]),
            node(None, vec![]),
            node(Some(0), vec![]),
        ],
        scenes: vec![Scene { nodes: vec![0] }],
        default_scene: Some(0),
    }
}
