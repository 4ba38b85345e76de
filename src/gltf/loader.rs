use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use tinyjson::JsonValue;

use crate::error::LoadError;
use crate::gltf::{
    Accessor, Buffer, BufferView, ComponentType, Document, Mesh, Node, Primitive, Scene, Shape,
    TargetKind, Topology,
};

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

const TARGET_ARRAY_BUFFER: usize = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: usize = 34963;

/// Reads a binary glTF (`.glb`) file. External buffers referenced by
/// relative uri are read from the directory the file is in.
///
/// Cross references are not checked here, see [`Document::validate`].
pub fn load(path: impl AsRef<Path>) -> Result<Document, LoadError> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let document = parse_glb(&bytes, base_dir)?;
    log::info!(
        "Loaded glTF: {} ({} buffers, {} buffer views, {} accessors, {} meshes, {} nodes, {} scenes)",
        path.display(),
        document.buffers.len(),
        document.buffer_views.len(),
        document.accessors.len(),
        document.meshes.len(),
        document.nodes.len(),
        document.scenes.len(),
    );
    Ok(document)
}

/// Parses an in-memory `.glb` container. `base_dir` is used to resolve
/// buffers stored in separate files.
pub fn parse_glb(bytes: &[u8], base_dir: &Path) -> Result<Document, LoadError> {
    let chunks = split_chunks(bytes)?;
    let json = std::str::from_utf8(chunks.json)
        .map_err(|err| structure(format!("JSON chunk is not valid UTF-8: {err}")))?;
    // The JSON chunk is padded to 4 bytes with spaces.
    let root: JsonValue = json
        .trim_end()
        .parse()
        .map_err(|err: tinyjson::JsonParseError| structure(err.to_string()))?;
    let root = Fields::of(&root, "glTF".to_string())?;

    check_asset(&root)?;

    let buffers = parse_buffers(&root, chunks.bin, base_dir)?;
    let buffer_views = parse_buffer_views(&root)?;
    let accessors = parse_accessors(&root, &buffer_views)?;
    let meshes = parse_meshes(&root)?;
    let nodes = parse_nodes(&root)?;

    let mut scenes = Vec::new();
    for (i, scene) in root.array("scenes")?.iter().enumerate() {
        let scene = Fields::of(scene, format!("scenes[{i}]"))?;
        scenes.push(Scene {
            nodes: scene.usize_list("nodes")?,
        });
    }
    let default_scene = match root.usize("scene")? {
        Some(scene) => Some(scene),
        None if !scenes.is_empty() => {
            log::warn!("glTF declares no default scene, using scene 0");
            Some(0)
        }
        None => {
            log::warn!("glTF contains no scenes, nothing will be drawn");
            None
        }
    };

    Ok(Document {
        buffers,
        buffer_views,
        accessors,
        meshes,
        nodes,
        scenes,
        default_scene,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::FileNotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

struct Chunks<'a> {
    json: &'a [u8],
    bin: Option<&'a [u8]>,
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let word = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

fn container(message: impl Into<String>) -> LoadError {
    LoadError::MalformedContainer(message.into())
}

fn structure(message: impl Into<String>) -> LoadError {
    LoadError::MalformedStructure(message.into())
}

fn split_chunks(bytes: &[u8]) -> Result<Chunks<'_>, LoadError> {
    let (Some(magic), Some(version), Some(length)) =
        (read_u32(bytes, 0), read_u32(bytes, 4), read_u32(bytes, 8))
    else {
        return Err(container(format!(
            "{} bytes is too short for the {HEADER_LEN} byte header",
            bytes.len()
        )));
    };
    if magic != GLB_MAGIC {
        return Err(container(format!("bad magic {magic:#010x}")));
    }
    if version != GLB_VERSION {
        return Err(container(format!("unsupported container version {version}")));
    }
    let length = length as usize;
    if length > bytes.len() {
        return Err(container(format!(
            "header declares {length} bytes but only {} are present",
            bytes.len()
        )));
    }
    if length < bytes.len() {
        log::warn!(
            "ignoring {} bytes after the end of the glb container",
            bytes.len() - length
        );
    }
    let bytes = &bytes[..length];

    let mut chunks = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < bytes.len() {
        let (Some(chunk_length), Some(chunk_type)) =
            (read_u32(bytes, offset), read_u32(bytes, offset + 4))
        else {
            return Err(container(format!("truncated chunk header at byte {offset}")));
        };
        let start = offset + CHUNK_HEADER_LEN;
        let end = start
            .checked_add(chunk_length as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| container(format!("chunk at byte {offset} runs past the container")))?;
        chunks.push((chunk_type, &bytes[start..end]));
        offset = end;
    }

    let mut chunks = chunks.into_iter();
    let json = match chunks.next() {
        Some((CHUNK_JSON, data)) => data,
        Some((chunk_type, _)) => {
            return Err(container(format!(
                "first chunk must be JSON, found type {chunk_type:#010x}"
            )))
        }
        None => return Err(container("container has no JSON chunk")),
    };
    let mut bin = None;
    for (chunk_type, data) in chunks {
        if chunk_type == CHUNK_BIN && bin.is_none() {
            bin = Some(data);
        } else {
            log::warn!("skipping chunk of type {chunk_type:#010x}");
        }
    }
    Ok(Chunks { json, bin })
}

fn check_asset(root: &Fields) -> Result<(), LoadError> {
    match root.object("asset")? {
        Some(asset) => {
            let version = asset.str("version")?.unwrap_or("");
            if !version.starts_with("2.") {
                log::warn!("asset version is \"{version}\", expected 2.x");
            }
        }
        None => log::warn!("glTF has no asset description"),
    }
    let required = root.array("extensionsRequired")?;
    if !required.is_empty() {
        let names = required
            .iter()
            .filter_map(|name| match name {
                JsonValue::String(name) => Some(name.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        log::warn!("required extensions are not supported: {}", names.join(", "));
    }
    Ok(())
}

fn parse_buffers(
    root: &Fields,
    bin: Option<&[u8]>,
    base_dir: &Path,
) -> Result<Vec<Buffer>, LoadError> {
    let mut buffers = Vec::new();
    for (i, buffer) in root.array("buffers")?.iter().enumerate() {
        let buffer = Fields::of(buffer, format!("buffers[{i}]"))?;
        let byte_length = buffer.required_usize("byteLength")?;
        let mut data = match buffer.str("uri")? {
            None if i == 0 => {
                let bin = bin.ok_or_else(|| {
                    structure("buffer 0 has no uri but the container has no BIN chunk")
                })?;
                // The BIN chunk may be padded by up to 3 bytes.
                if bin.len() > byte_length.saturating_add(3) {
                    log::warn!(
                        "BIN chunk is {} bytes, buffer 0 declares {byte_length}",
                        bin.len()
                    );
                }
                bin.to_vec()
            }
            None => return Err(structure(format!("buffer {i} has no uri"))),
            Some(uri) if uri.starts_with("data:") => {
                return Err(structure(format!("buffer {i} uses a data uri, which is not supported")))
            }
            Some(uri) => read_file(&base_dir.join(uri))?,
        };
        if data.len() < byte_length {
            return Err(structure(format!(
                "buffer {i} declares {byte_length} bytes but only {} are available",
                data.len()
            )));
        }
        data.truncate(byte_length);
        buffers.push(Buffer { data });
    }
    Ok(buffers)
}

fn parse_buffer_views(root: &Fields) -> Result<Vec<BufferView>, LoadError> {
    let mut views = Vec::new();
    for (i, view) in root.array("bufferViews")?.iter().enumerate() {
        let view = Fields::of(view, format!("bufferViews[{i}]"))?;
        let target = match view.usize("target")? {
            None => TargetKind::None,
            Some(TARGET_ARRAY_BUFFER) => TargetKind::VertexData,
            Some(TARGET_ELEMENT_ARRAY_BUFFER) => TargetKind::IndexData,
            Some(_) => return Err(view.invalid("target", "34962 or 34963")),
        };
        views.push(BufferView {
            buffer: view.required_usize("buffer")?,
            byte_offset: view.usize("byteOffset")?.unwrap_or(0),
            byte_length: view.required_usize("byteLength")?,
            byte_stride: view.usize("byteStride")?,
            target,
        });
    }
    Ok(views)
}

fn parse_accessors(root: &Fields, views: &[BufferView]) -> Result<Vec<Accessor>, LoadError> {
    let mut accessors = Vec::new();
    for (i, accessor) in root.array("accessors")?.iter().enumerate() {
        let accessor = Fields::of(accessor, format!("accessors[{i}]"))?;
        let component_type = ComponentType::from_gltf(accessor.required_usize("componentType")?)
            .ok_or_else(|| accessor.invalid("componentType", "a glTF component type"))?;
        let shape = Shape::from_gltf(accessor.required_str("type")?)
            .ok_or_else(|| accessor.invalid("type", "SCALAR, VECn or MATn"))?;
        if accessor.get("sparse").is_some() {
            log::warn!("accessor {i} is sparse, only its dense values will be used");
        }
        let buffer_view = accessor.usize("bufferView")?;
        accessors.push(Accessor {
            buffer_view,
            component_type,
            shape,
            count: accessor.required_usize("count")?,
            byte_offset: accessor.usize("byteOffset")?.unwrap_or(0),
            normalized: accessor.bool("normalized")?.unwrap_or(false),
            byte_stride: buffer_view
                .and_then(|view| views.get(view))
                .and_then(|view| view.byte_stride),
        });
    }
    Ok(accessors)
}

fn parse_meshes(root: &Fields) -> Result<Vec<Mesh>, LoadError> {
    let mut meshes = Vec::new();
    for (i, mesh) in root.array("meshes")?.iter().enumerate() {
        let mesh = Fields::of(mesh, format!("meshes[{i}]"))?;
        let mut primitives = Vec::new();
        for (j, primitive) in mesh.array("primitives")?.iter().enumerate() {
            let primitive = Fields::of(primitive, format!("meshes[{i}].primitives[{j}]"))?;
            let attributes_json = primitive
                .object("attributes")?
                .ok_or_else(|| primitive.missing("attributes"))?;
            let mut attributes = BTreeMap::new();
            for semantic in attributes_json.object.keys() {
                let accessor = attributes_json.required_usize(semantic)?;
                attributes.insert(semantic.clone(), accessor);
            }
            let mode = match primitive.usize("mode")? {
                Some(mode) => {
                    Topology::from_gltf(mode).ok_or_else(|| primitive.invalid("mode", "0 to 6"))?
                }
                None => Topology::Triangles,
            };
            primitives.push(Primitive {
                attributes,
                indices: primitive.usize("indices")?,
                mode,
            });
        }
        meshes.push(Mesh { primitives });
    }
    Ok(meshes)
}

fn parse_nodes(root: &Fields) -> Result<Vec<Node>, LoadError> {
    let mut nodes = Vec::new();
    for (i, node) in root.array("nodes")?.iter().enumerate() {
        let node = Fields::of(node, format!("nodes[{i}]"))?;
        let transform = match node.floats::<16>("matrix")? {
            Some(matrix) => Mat4::from_cols_array(&matrix),
            None => {
                let translation = node.floats::<3>("translation")?.map(Vec3::from_array);
                let rotation = node.floats::<4>("rotation")?.map(Quat::from_array);
                let scale = node.floats::<3>("scale")?.map(Vec3::from_array);
                Mat4::from_scale_rotation_translation(
                    scale.unwrap_or(Vec3::ONE),
                    rotation.unwrap_or(Quat::IDENTITY),
                    translation.unwrap_or(Vec3::ZERO),
                )
            }
        };
        nodes.push(Node {
            mesh: node.usize("mesh")?,
            children: node.usize_list("children")?,
            transform,
        });
    }
    Ok(nodes)
}

/// A JSON object along with a path to it, for error messages.
struct Fields<'a> {
    object: &'a HashMap<String, JsonValue>,
    context: String,
}

impl<'a> Fields<'a> {
    fn of(value: &'a JsonValue, context: String) -> Result<Fields<'a>, LoadError> {
        match value {
            JsonValue::Object(object) => Ok(Fields { object, context }),
            _ => Err(structure(format!("{context}: expected an object"))),
        }
    }

    fn missing(&self, key: &str) -> LoadError {
        structure(format!("{}.{key}: required property is missing", self.context))
    }

    fn invalid(&self, key: &str, expected: &str) -> LoadError {
        structure(format!("{}.{key}: expected {expected}", self.context))
    }

    fn get(&self, key: &str) -> Option<&'a JsonValue> {
        self.object.get(key)
    }

    fn usize(&self, key: &str) -> Result<Option<usize>, LoadError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => take_usize(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer")),
        }
    }

    fn required_usize(&self, key: &str) -> Result<usize, LoadError> {
        self.usize(key)?.ok_or_else(|| self.missing(key))
    }

    fn bool(&self, key: &str) -> Result<Option<bool>, LoadError> {
        match self.get(key) {
            None => Ok(None),
            Some(JsonValue::Boolean(value)) => Ok(Some(*value)),
            Some(_) => Err(self.invalid(key, "a boolean")),
        }
    }

    fn str(&self, key: &str) -> Result<Option<&'a str>, LoadError> {
        match self.get(key) {
            None => Ok(None),
            Some(JsonValue::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    fn required_str(&self, key: &str) -> Result<&'a str, LoadError> {
        self.str(key)?.ok_or_else(|| self.missing(key))
    }

    fn object(&self, key: &str) -> Result<Option<Fields<'a>>, LoadError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => Fields::of(value, format!("{}.{key}", self.context)).map(Some),
        }
    }

    /// Missing arrays are treated as empty, as glTF omits empty arrays.
    fn array(&self, key: &str) -> Result<&'a [JsonValue], LoadError> {
        match self.get(key) {
            None => Ok(&[]),
            Some(JsonValue::Array(values)) => Ok(values.as_slice()),
            Some(_) => Err(self.invalid(key, "an array")),
        }
    }

    fn usize_list(&self, key: &str) -> Result<Vec<usize>, LoadError> {
        self.array(key)?
            .iter()
            .map(|value| take_usize(value).ok_or_else(|| self.invalid(key, "an array of indices")))
            .collect()
    }

    fn floats<const N: usize>(&self, key: &str) -> Result<Option<[f32; N]>, LoadError> {
        let values = self.array(key)?;
        if values.is_empty() && self.get(key).is_none() {
            return Ok(None);
        }
        let expected = format!("an array of {N} numbers");
        if values.len() != N {
            return Err(self.invalid(key, &expected));
        }
        let mut floats = [0.0; N];
        for (float, value) in floats.iter_mut().zip(values) {
            match value {
                JsonValue::Number(number) => *float = *number as f32,
                _ => return Err(self.invalid(key, &expected)),
            }
        }
        Ok(Some(floats))
    }
}

/// Returns the value as a usize if it is a non-negative integral number.
fn take_usize(value: &JsonValue) -> Option<usize> {
    match value {
        JsonValue::Number(number) if *number >= 0.0 && number.fract() == 0.0 => {
            Some(*number as usize)
        }
        _ => None,
    }
}
