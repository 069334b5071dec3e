//! Serde model of the interchange document.
//!
//! Only the parts the importer reads are modelled; unknown fields are ignored. Optional arrays default
//! to empty so a document may omit whatever it does not use.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub buffers: Vec<BufferSpec>,
    #[serde(default)]
    pub buffer_views: Vec<BufferViewSpec>,
    #[serde(default)]
    pub accessors: Vec<AccessorSpec>,
    #[serde(default)]
    pub materials: Vec<MaterialSpec>,
    #[serde(default)]
    pub meshes: Vec<MeshSpec>,
    #[serde(default)]
    pub cameras: Vec<CameraSpec>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub scenes: Vec<SceneSpec>,
    pub scene: Option<usize>,
    #[serde(default)]
    pub extensions: DocumentExtensions,
}

impl Document {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Declared punctual lights, in declaration order.
    pub fn lights(&self) -> &[LightSpec] {
        self.extensions
            .lights_punctual
            .as_ref()
            .map(|block| block.lights.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentExtensions {
    #[serde(rename = "KHR_lights_punctual")]
    pub lights_punctual: Option<LightsBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LightsBlock {
    #[serde(default)]
    pub lights: Vec<LightSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightSpec {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferSpec {
    pub uri: Option<String>,
    pub byte_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferViewSpec {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<u32>,
    pub target: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorSpec {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: u32,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSpec {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrSpec {
    pub base_color_factor: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshSpec {
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrimitiveSpec {
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraSpec {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub perspective: Option<PerspectiveSpec>,
    pub orthographic: Option<OrthographicSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveSpec {
    pub aspect_ratio: Option<f32>,
    pub yfov: f32,
    pub znear: f32,
    pub zfar: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrthographicSpec {
    pub xmag: f32,
    pub ymag: f32,
    pub znear: f32,
    pub zfar: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSpec {
    pub name: Option<String>,
    pub camera: Option<usize>,
    pub mesh: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
    /// Column-major.
    pub matrix: Option<[f32; 16]>,
    pub translation: Option<[f32; 3]>,
    /// Unit quaternion `(x, y, z, w)`.
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub extensions: NodeExtensions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeExtensions {
    #[serde(rename = "KHR_lights_punctual")]
    pub light: Option<NodeLight>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeLight {
    pub light: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneSpec {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_a_valid_document() {
        let document = Document::from_slice(b"{}").unwrap();

        assert!(document.nodes.is_empty());
        assert!(document.lights().is_empty());
        assert_eq!(document.scene, None);
    }

    #[test]
    fn reads_punctual_lights_and_node_references() {
        let json = br#"{
            "extensions": {
                "KHR_lights_punctual": {
                    "lights": [{ "name": "sun", "type": "directional", "color": [1.0, 0.9, 0.8] }]
                }
            },
            "nodes": [{ "name": "lamp", "extensions": { "KHR_lights_punctual": { "light": 0 } } }],
            "bufferViews": [{ "buffer": 0, "byteLength": 12, "byteStride": 12 }]
        }"#;

        let document = Document::from_slice(json).unwrap();

        assert_eq!(document.lights()[0].kind, "directional");
        assert_eq!(document.lights()[0].color, Some([1.0, 0.9, 0.8]));
        assert_eq!(document.nodes[0].extensions.light.as_ref().map(|l| l.light), Some(0));
        assert_eq!(document.buffer_views[0].byte_offset, 0);
        assert_eq!(document.buffer_views[0].byte_stride, Some(12));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Document::from_slice(b"{ \"nodes\": [ }").is_err());
    }
}
