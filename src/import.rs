//! # Asset Importer
//!
//! Turns an interchange [`Document`] plus its raw buffer payloads into runtime [`Scene`]s.
//!
//! ## Steps
//!
//! Resources are built in dependency order, each step resolving the indices of the previous ones:
//!
//! 1. **Lights** from the punctual-lights extension. Each light keeps its declaration position as its
//!    index into the shader's light array. Unknown light types are skipped with a warning.
//! 2. **Buffers**, one per buffer view, sliced out of the fetched payloads and uploaded to the surface.
//!    The target comes from the view, or is inferred from how primitives use it.
//! 3. **Materials**: name and base color factor.
//! 4. **Meshes**: primitives with their `POSITION` and optional `NORMAL` attributes, optional indices,
//!    and draw mode (triangles by default).
//! 5. **Cameras**: perspective or orthographic projections. A perspective camera without an aspect ratio
//!    follows the viewport's. Missing projection data falls back to the identity matrix with a warning.
//! 6. **Nodes**, recursively: a column-major `matrix`, or `translation · rotation · scale` with each part
//!    defaulting independently. Children are attached in order camera, mesh, light, then child nodes.
//!    Lights attach at any depth.
//! 7. **Scenes**, one per declared scene, plus the index of the default one.
//!
//! Any index pointing outside its array aborts the import; no partial scene is returned, and the buffers
//! already uploaded for it are deleted from the surface again.
//!
//! ## Loading
//!
//! [`load_async`] fetches the document, then requests every buffer payload at once and waits for all of
//! them before running the import. Whether the requests actually overlap depends on the [`Fetch`]
//! implementation; [`FileFetcher`](crate::FileFetcher) reads one file after the other.

use std::collections::HashSet;
use std::rc::Rc;

use futures::future::try_join_all;
use log::{debug, info, warn};

use crate::buffer::{Attribute, Buffer};
use crate::camera::Camera;
use crate::document::{AccessorSpec, BufferViewSpec, CameraSpec, Document, LightSpec, NodeSpec};
use crate::error::ImportError;
use crate::fetch::{load_payload, Fetch};
use crate::light::{Light, LightKind};
use crate::material::Material;
use crate::math::{Mat4, Vec4};
use crate::node::Node;
use crate::primitive::{IndexRange, Mesh, Primitive};
use crate::scene::Scene;
use crate::surface::{
    components_for_type, AttributeLayout, AttributeName, BufferTarget, ComponentType, DrawMode, Surface,
    MAX_LIGHTS,
};

/// The scenes of one imported document.
#[derive(Debug)]
pub struct Imported {
    pub scenes: Vec<Scene>,
    /// Index into `scenes` of the scene to show first.
    pub default_scene: usize,
}

impl Imported {
    /// Takes the default scene out, dropping the others.
    pub fn into_default_scene(mut self) -> Option<Scene> {
        (self.default_scene < self.scenes.len()).then(|| self.scenes.swap_remove(self.default_scene))
    }
}

/// Fetches the document at `uri`, then all of its buffer payloads, then imports it.
pub async fn load_async(
    uri: &str,
    fetcher: &impl Fetch,
    surface: &mut impl Surface,
) -> Result<Imported, ImportError> {
    info!("Loading '{uri}'");
    let bytes = fetcher.fetch(uri).await?;
    let document = Document::from_slice(&bytes)?;

    let payloads = fetch_buffers(&document, uri, fetcher).await?;
    import(&document, &payloads, surface)
}

/// Fetches every buffer the document declares, failing as soon as one fetch fails. Relative URIs resolve
/// against `base`.
pub async fn fetch_buffers(
    document: &Document,
    base: &str,
    fetcher: &impl Fetch,
) -> Result<Vec<Vec<u8>>, ImportError> {
    let uris = document
        .buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| buffer.uri.as_deref().ok_or(ImportError::MissingUri(index)))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Fetching {} buffer payloads", uris.len());
    try_join_all(uris.into_iter().map(|uri| load_payload(fetcher, base, uri))).await
}

/// Builds every scene of `document`. `payloads[i]` holds the bytes of the document's buffer `i`.
///
/// On failure every buffer this call uploaded is deleted from `surface` before the error is returned.
pub fn import(
    document: &Document,
    payloads: &[Vec<u8>],
    surface: &mut impl Surface,
) -> Result<Imported, ImportError> {
    let lights = import_lights(document.lights());
    let views = import_buffer_views(document, payloads, surface)?;

    match assemble(document, lights, &views) {
        Ok(imported) => Ok(imported),
        Err(e) => {
            release(&views, surface);
            Err(e)
        }
    }
}

/// Steps 3 to 7: everything after the upload, none of which touches the surface.
fn assemble(document: &Document, lights: Vec<Option<Light>>, views: &[View]) -> Result<Imported, ImportError> {
    let materials = import_materials(document);
    let meshes = document
        .meshes
        .iter()
        .enumerate()
        .map(|(index, mesh)| {
            let primitives = mesh
                .primitives
                .iter()
                .map(|primitive| {
                    let position = primitive
                        .attributes
                        .get("POSITION")
                        .ok_or(ImportError::MissingAttribute("POSITION"))?;
                    let position = attribute(document, views, *position, AttributeName::Position)?;
                    let normal = primitive
                        .attributes
                        .get("NORMAL")
                        .map(|&accessor| attribute(document, views, accessor, AttributeName::Normal))
                        .transpose()?;
                    let indices = primitive
                        .indices
                        .map(|accessor| index_range(document, views, accessor))
                        .transpose()?;
                    let material = match primitive.material {
                        Some(material) => Rc::clone(lookup(&materials.declared, material, "material")?),
                        None => Rc::clone(&materials.fallback),
                    };
                    let code = primitive.mode.unwrap_or(4);
                    let mode = DrawMode::from_code(code).ok_or_else(|| ImportError::Unsupported {
                        what: "primitive mode",
                        value: code.to_string(),
                    })?;

                    Ok(Primitive::new(mode, position, normal, material, indices))
                })
                .collect::<Result<Vec<_>, ImportError>>()?;

            Ok(Mesh::new(name_or(&mesh.name, "mesh", index), primitives))
        })
        .collect::<Result<Vec<_>, ImportError>>()?;
    let cameras = document
        .cameras
        .iter()
        .enumerate()
        .map(|(index, spec)| camera(index, spec))
        .collect::<Vec<_>>();

    let resources = Resources {
        document,
        meshes,
        cameras,
        lights,
    };

    let mut scenes = Vec::with_capacity(document.scenes.len());
    for (index, spec) in document.scenes.iter().enumerate() {
        let mut visiting = vec![false; document.nodes.len()];
        let nodes = spec
            .nodes
            .iter()
            .map(|&root| resources.node(root, &mut visiting))
            .collect::<Result<Vec<_>, _>>()?;
        scenes.push(Scene::new(name_or(&spec.name, "scene", index)).with_nodes(nodes));
    }

    let default_scene = document.scene.unwrap_or(0);
    if !scenes.is_empty() && default_scene >= scenes.len() {
        return Err(ImportError::IndexOutOfRange {
            kind: "scene",
            index: default_scene,
        });
    }

    info!(
        "Imported {} scene(s), {} mesh(es), {} camera(s), {} light(s)",
        scenes.len(),
        resources.meshes.len(),
        resources.cameras.len(),
        resources.lights.iter().flatten().count()
    );
    Ok(Imported {
        scenes,
        default_scene,
    })
}

fn import_lights(specs: &[LightSpec]) -> Vec<Option<Light>> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let kind = match spec.kind.as_str() {
                "directional" => LightKind::Directional,
                "point" => LightKind::Point,
                other => {
                    warn!("Skipping light {index}: unsupported type '{other}'");
                    return None;
                }
            };
            if index >= MAX_LIGHTS {
                warn!("Light {index} exceeds the {MAX_LIGHTS} shader light slots and will not be lit");
            }

            let [r, g, b] = spec.color.unwrap_or([1.0, 1.0, 1.0]);
            let name = name_or(&spec.name, "light", index);
            Some(Light::new(name, kind, index, Vec4::rgba(r, g, b, 1.0)))
        })
        .collect()
}

/// An uploaded buffer view and the stride of the attributes reading it.
struct View {
    buffer: Buffer,
    stride: u32,
}

fn import_buffer_views(
    document: &Document,
    payloads: &[Vec<u8>],
    surface: &mut impl Surface,
) -> Result<Vec<View>, ImportError> {
    let index_views: HashSet<usize> = document
        .meshes
        .iter()
        .flat_map(|mesh| &mesh.primitives)
        .filter_map(|primitive| primitive.indices)
        .filter_map(|accessor| document.accessors.get(accessor))
        .filter_map(|accessor| accessor.buffer_view)
        .collect();

    let mut views = Vec::with_capacity(document.buffer_views.len());
    for (index, view) in document.buffer_views.iter().enumerate() {
        match upload_view(index, view, payloads, &index_views, surface) {
            Ok(uploaded) => views.push(uploaded),
            Err(e) => {
                release(&views, surface);
                return Err(e);
            }
        }
    }
    Ok(views)
}

fn upload_view(
    index: usize,
    view: &BufferViewSpec,
    payloads: &[Vec<u8>],
    index_views: &HashSet<usize>,
    surface: &mut impl Surface,
) -> Result<View, ImportError> {
    let payload = lookup(payloads, view.buffer, "buffer")?;
    let bytes = view
        .byte_offset
        .checked_add(view.byte_length)
        .and_then(|end| payload.get(view.byte_offset..end))
        .ok_or(ImportError::OutOfBounds {
            view: index,
            buffer: view.buffer,
        })?;

    let target = match view.target {
        Some(code) => BufferTarget::from_code(code).ok_or_else(|| ImportError::Unsupported {
            what: "buffer view target",
            value: code.to_string(),
        })?,
        None if index_views.contains(&index) => BufferTarget::Index,
        None => BufferTarget::Vertex,
    };

    Ok(View {
        buffer: Buffer::new(surface, target, bytes)?,
        stride: view.byte_stride.unwrap_or(0),
    })
}

fn release(views: &[View], surface: &mut impl Surface) {
    if !views.is_empty() {
        debug!("Releasing {} buffer(s) of the failed import", views.len());
    }
    for view in views {
        surface.delete_buffer(view.buffer.handle());
    }
}

struct Materials {
    declared: Vec<Rc<Material>>,
    fallback: Rc<Material>,
}

fn import_materials(document: &Document) -> Materials {
    let declared = document
        .materials
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let color = spec
                .pbr_metallic_roughness
                .as_ref()
                .and_then(|pbr| pbr.base_color_factor)
                .unwrap_or([1.0, 1.0, 1.0, 1.0]);
            Rc::new(Material::new(name_or(&spec.name, "material", index), Vec4::from_array(color)))
        })
        .collect();

    Materials {
        declared,
        fallback: Rc::new(Material::default()),
    }
}

/// Resolves an accessor and the view it reads from.
fn accessor<'a>(
    document: &'a Document,
    views: &'a [View],
    index: usize,
) -> Result<(&'a AccessorSpec, &'a View, ComponentType), ImportError> {
    let accessor = lookup(&document.accessors, index, "accessor")?;
    let view_index = accessor.buffer_view.ok_or_else(|| ImportError::Unsupported {
        what: "accessor without bufferView",
        value: index.to_string(),
    })?;
    let view = lookup(views, view_index, "bufferView")?;
    let component_type =
        ComponentType::from_code(accessor.component_type).ok_or_else(|| ImportError::Unsupported {
            what: "component type",
            value: accessor.component_type.to_string(),
        })?;

    Ok((accessor, view, component_type))
}

fn attribute(
    document: &Document,
    views: &[View],
    index: usize,
    name: AttributeName,
) -> Result<Attribute, ImportError> {
    let (spec, view, component_type) = accessor(document, views, index)?;
    let size = components_for_type(&spec.kind).ok_or_else(|| ImportError::Unsupported {
        what: "accessor type",
        value: spec.kind.clone(),
    })?;

    let layout = AttributeLayout {
        size,
        component_type,
        normalized: spec.normalized,
        stride: view.stride,
        offset: spec.byte_offset,
    };
    Ok(Attribute::new(view.buffer, name, layout, spec.count))
}

fn index_range(document: &Document, views: &[View], index: usize) -> Result<IndexRange, ImportError> {
    let (spec, view, component_type) = accessor(document, views, index)?;

    Ok(IndexRange {
        buffer: view.buffer,
        count: spec.count,
        component_type,
        offset: spec.byte_offset,
    })
}

fn camera(index: usize, spec: &CameraSpec) -> Camera {
    let name = name_or(&spec.name, "camera", index);
    match (spec.kind.as_str(), &spec.perspective, &spec.orthographic) {
        ("perspective", Some(p), _) => match p.aspect_ratio {
            Some(aspect) => Camera::new(name, Mat4::perspective(aspect, p.yfov, p.znear, p.zfar)),
            None => Camera::fitted(name, p.yfov, p.znear, p.zfar),
        },
        ("orthographic", _, Some(o)) => Camera::new(name, Mat4::orthographic(o.xmag, o.ymag, o.znear, o.zfar)),
        (kind, _, _) => {
            warn!("Camera '{name}' has no usable '{kind}' projection, using identity");
            Camera::new(name, Mat4::identity())
        }
    }
}

fn local_transform(spec: &NodeSpec) -> Mat4 {
    if let Some(columns) = spec.matrix {
        return Mat4::from_columns(columns);
    }

    let [sx, sy, sz] = spec.scale.unwrap_or([1.0, 1.0, 1.0]);
    let [qx, qy, qz, qw] = spec.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]);
    let [tx, ty, tz] = spec.translation.unwrap_or([0.0, 0.0, 0.0]);

    Mat4::scale(sx, sy, sz)
        .then_rotate(qx, qy, qz, qw)
        .then_translate(tx, ty, tz)
}

/// Everything nodes refer to by index.
struct Resources<'a> {
    document: &'a Document,
    meshes: Vec<Mesh>,
    cameras: Vec<Camera>,
    lights: Vec<Option<Light>>,
}

impl Resources<'_> {
    fn node(&self, index: usize, visiting: &mut [bool]) -> Result<Node, ImportError> {
        let spec = lookup(&self.document.nodes, index, "node")?;
        if visiting[index] {
            return Err(ImportError::NodeCycle(index));
        }
        visiting[index] = true;

        let mut node = Node::new(name_or(&spec.name, "node", index)).with_transform(local_transform(spec));

        if let Some(camera) = spec.camera {
            node = node.with_child(lookup(&self.cameras, camera, "camera")?.clone());
        }
        if let Some(mesh) = spec.mesh {
            node = node.with_child(lookup(&self.meshes, mesh, "mesh")?.clone());
        }
        if let Some(reference) = &spec.extensions.light {
            // Skipped (unsupported) lights leave the node without a light child.
            if let Some(light) = lookup(&self.lights, reference.light, "light")? {
                node = node.with_child(light.clone());
            }
        }
        for &child in &spec.children {
            node = node.with_child(self.node(child, visiting)?);
        }

        visiting[index] = false;
        Ok(node)
    }
}

fn lookup<'a, T>(items: &'a [T], index: usize, kind: &'static str) -> Result<&'a T, ImportError> {
    items.get(index).ok_or(ImportError::IndexOutOfRange { kind, index })
}

fn name_or(name: &Option<String>, kind: &str, index: usize) -> String {
    name.clone().unwrap_or_else(|| format!("{kind}{index}"))
}
