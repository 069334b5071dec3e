//! # Error Types
//!
//! Every fallible operation in the engine returns one of three error enums:
//!
//! - [`SurfaceError`]: the rendering surface could not be created or could not hand out a resource.
//! - [`ImportError`]: the interchange document or one of its buffers could not be turned into a scene.
//!   Import errors abort the whole import; no partial scene is ever returned.
//! - [`EngineError`]: everything the driver sees, including construction failures of hand-authored
//!   geometry and rendering without a loaded scene.
//!
//! Soft problems (an unknown light type, a camera without projection data) are not errors; they are
//! logged with `log::warn!` and the import continues with a default.

use thiserror::Error;

/// Failures raised by a rendering surface.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The surface could not allocate a resource (buffer, texture, ...).
    #[error("failed to create {0}")]
    OutOfResources(&'static str),

    /// No GPU adapter matched the requested options.
    #[error("no suitable GPU adapter found")]
    Adapter,

    #[error("failed to request a GPU device: {0}")]
    Device(String),

    #[error("failed to create rendering surface: {0}")]
    CreateSurface(String),

    /// The swap chain could not provide a frame.
    #[error("failed to acquire frame: {0}")]
    Frame(String),
}

/// Failures raised while importing an interchange document.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to parse interchange document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to fetch '{uri}': {source}")]
    Fetch {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("buffer {0} has no uri")]
    MissingUri(usize),

    #[error("malformed data uri: {0}")]
    DataUri(String),

    /// A `bufferView`, `accessor`, `material`, ... index points past the end of its array.
    #[error("{kind} index {index} is out of range")]
    IndexOutOfRange { kind: &'static str, index: usize },

    #[error("primitive is missing required attribute {0}")]
    MissingAttribute(&'static str),

    #[error("unsupported {what}: {value}")]
    Unsupported { what: &'static str, value: String },

    #[error("buffer view {view} reads past the end of buffer {buffer}")]
    OutOfBounds { view: usize, buffer: usize },

    #[error("node {0} is its own ancestor")]
    NodeCycle(usize),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Engine-level errors surfaced to the driver loop.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Generic construction failure, e.g. a triangle without exactly three vertices.
    #[error("engine failure: {0}")]
    Failure(String),

    #[error("no scene to render")]
    NoScene,

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Import(#[from] ImportError),
}
