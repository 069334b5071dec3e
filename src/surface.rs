//! # Rendering Surface
//!
//! The engine never talks to a graphics API directly. Everything it needs from one is captured by the
//! [`Surface`] trait: creating immutable buffers, resolving attribute and uniform locations once, pointing
//! attributes at buffers, setting uniforms, and issuing non-indexed or indexed draws.
//!
//! Two implementations ship with the crate:
//!
//! - [`crate::Renderer`]: records the calls and replays them through `wgpu` once per frame.
//! - [`crate::HeadlessSurface`]: records the calls for inspection, used in tests and headless runs.
//!
//! The value types in this module (draw modes, component types, buffer targets) keep the numeric codes of
//! the interchange format so importing is a straight lookup.

use crate::error::SurfaceError;
use crate::math::{Mat4, Vec4};

/// Number of light slots in the shader's light array.
pub const MAX_LIGHTS: usize = 4;

/// Opaque handle of a buffer owned by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Opaque attribute or uniform location handed out by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location(pub u32);

/// What a buffer's bytes are used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per-vertex attribute data (`ARRAY_BUFFER`, 34962).
    Vertex,
    /// Index data (`ELEMENT_ARRAY_BUFFER`, 34963).
    Index,
}

impl BufferTarget {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            34962 => Some(Self::Vertex),
            34963 => Some(Self::Index),
            _ => None,
        }
    }
}

/// Primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }
}

/// Scalar type of an attribute or index component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::Byte),
            5121 => Some(Self::UnsignedByte),
            5122 => Some(Self::Short),
            5123 => Some(Self::UnsignedShort),
            5125 => Some(Self::UnsignedInt),
            5126 => Some(Self::Float),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Byte => 5120,
            Self::UnsignedByte => 5121,
            Self::Short => 5122,
            Self::UnsignedShort => 5123,
            Self::UnsignedInt => 5125,
            Self::Float => 5126,
        }
    }

    /// Width of one component in bytes.
    pub fn size_in_bytes(self) -> u32 {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
        }
    }
}

/// Number of components for an accessor type tag (`"VEC3"` → 3).
pub fn components_for_type(tag: &str) -> Option<u32> {
    match tag {
        "SCALAR" => Some(1),
        "VEC2" => Some(2),
        "VEC3" => Some(3),
        "VEC4" => Some(4),
        "MAT2" => Some(4),
        "MAT3" => Some(9),
        "MAT4" => Some(16),
        _ => None,
    }
}

/// Vertex shader inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeName {
    Position,
    Normal,
    Color,
}

impl AttributeName {
    pub const ALL: [AttributeName; 3] = [Self::Position, Self::Normal, Self::Color];

    /// Shader input slot of the attribute.
    pub fn slot(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Color => 2,
        }
    }

    pub fn from_slot(slot: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.slot() == slot)
    }
}

/// Field of one entry in the shader's light array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightField {
    Kind,
    Position,
    Direction,
    Color,
}

impl LightField {
    const ALL: [LightField; 4] = [Self::Kind, Self::Position, Self::Direction, Self::Color];
}

/// Shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformName {
    Color,
    AmbientColor,
    ModelTransform,
    VpTransform,
    NormalTransform,
    Light(usize, LightField),
}

impl UniformName {
    const SCALARS: [UniformName; 5] = [
        Self::Color,
        Self::AmbientColor,
        Self::ModelTransform,
        Self::VpTransform,
        Self::NormalTransform,
    ];

    /// Dense numbering of every uniform, used by surfaces as their location values.
    pub fn code(self) -> u32 {
        match self {
            Self::Color => 0,
            Self::AmbientColor => 1,
            Self::ModelTransform => 2,
            Self::VpTransform => 3,
            Self::NormalTransform => 4,
            Self::Light(index, field) => {
                let field = LightField::ALL
                    .iter()
                    .position(|f| *f == field)
                    .unwrap_or_default();
                (Self::SCALARS.len() + index * LightField::ALL.len() + field) as u32
            }
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let code = code as usize;
        if code < Self::SCALARS.len() {
            return Some(Self::SCALARS[code]);
        }

        let light = code - Self::SCALARS.len();
        let index = light / LightField::ALL.len();
        (index < MAX_LIGHTS).then(|| Self::Light(index, LightField::ALL[light % LightField::ALL.len()]))
    }
}

/// How to pull one attribute out of a buffer, per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeLayout {
    /// Components per vertex (1..=4, or 9/16 for matrices).
    pub size: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Bytes between consecutive vertices; 0 means tightly packed.
    pub stride: u32,
    /// Byte offset of the first vertex.
    pub offset: u32,
}

impl AttributeLayout {
    /// The stride with the tightly-packed shorthand resolved.
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.size * self.component_type.size_in_bytes()
        } else {
            self.stride
        }
    }
}

/// The capability set the engine requires from a graphics API.
///
/// State set through `vertex_attrib_pointer` and the `uniform_*` calls persists until overwritten, like
/// the global state of a GL context; draws consume whatever is currently set.
pub trait Surface {
    /// Creates an immutable buffer holding `data`.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferHandle, SurfaceError>;

    /// Releases a buffer. Its handle is never reused; deleting it twice is a no-op.
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Location of an attribute, or `None` when the active program does not use it.
    fn attribute_location(&self, name: AttributeName) -> Option<Location>;

    /// Location of a uniform, or `None` when the active program does not use it.
    fn uniform_location(&self, name: UniformName) -> Option<Location>;

    /// Points an attribute at `buffer` and enables it.
    fn vertex_attrib_pointer(&mut self, location: Location, buffer: BufferHandle, layout: AttributeLayout);

    fn disable_vertex_attrib(&mut self, location: Location);

    fn uniform_1i(&mut self, location: Location, value: i32);

    fn uniform_4fv(&mut self, location: Location, value: Vec4);

    fn uniform_matrix_4fv(&mut self, location: Location, value: &Mat4);

    /// Non-indexed draw of `count` vertices starting at `first`.
    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32);

    /// Indexed draw reading `count` indices of `index_type` from `buffer`, starting `offset` bytes in.
    fn draw_elements(
        &mut self,
        mode: DrawMode,
        buffer: BufferHandle,
        count: u32,
        index_type: ComponentType,
        offset: u32,
    );

    /// Clears color and depth; `color` becomes the clear color.
    fn clear(&mut self, color: Vec4);

    fn viewport(&mut self, width: u32, height: u32);
}
