//! # Configuration
//!
//! [`EngineConfig`] is read from a TOML file (`lumen.toml` by default). Every field has a default, so an
//! absent file or an empty one both yield a working configuration.
//!
//! ```toml
//! log_filter = "lumen_core=debug"
//!
//! [window]
//! title = "rings"
//! width = 1024
//! height = 768
//!
//! [scene]
//! asset = "assets/rings.gltf"
//! ambient_color = [0.1, 0.1, 0.1, 1.0]
//!
//! [[scene.spin]]
//! node = "outer"
//! axis = "y"
//! degrees_per_second = 40.0
//! ```

use std::path::Path;

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::math::{Mat4, Vec4};
use crate::node::SelectedMut;
use crate::scene::Scene;

pub const DEFAULT_CONFIG_PATH: &str = "lumen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub scene: SceneConfig,
    /// Default `env_logger` filter; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            scene: SceneConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Applies the scene overrides: ambient color and spin handlers.
    pub fn apply(&self, scene: &mut Scene) {
        if let Some(color) = self.scene.ambient_color {
            scene.set_ambient_color(Vec4::from_array(color));
        }

        for spin in &self.scene.spin {
            if !spin.install(scene) {
                warn!("No node named '{}' to spin", spin.node);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Interchange document to load. Without one, a built-in triangle is shown.
    pub asset: Option<String>,
    pub ambient_color: Option<[f32; 4]>,
    pub spin: Vec<SpinConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn rotation(self, degrees: f32) -> Mat4 {
        match self {
            Axis::X => Mat4::rotate_x(degrees),
            Axis::Y => Mat4::rotate_y(degrees),
            Axis::Z => Mat4::rotate_z(degrees),
        }
    }
}

/// Continuously rotates the node called `node` about one of its parent's axes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpinConfig {
    pub node: String,
    pub axis: Axis,
    pub degrees_per_second: f32,
}

impl SpinConfig {
    /// Installs the update handler on the first node named `self.node`. Returns whether one was found.
    pub fn install(&self, scene: &mut Scene) -> bool {
        let Some(node) = scene.select_mut(&self.node).and_then(SelectedMut::into_node) else {
            return false;
        };

        let (axis, rate) = (self.axis, self.degrees_per_second);
        node.on_update(move |node, delta| {
            let spin = axis.rotation(rate * delta.as_secs_f32());
            node.set_transform(spin.times(*node.transform()));
        });
        info!("Spinning '{}' about {:?} at {rate}°/s", self.node, axis);
        true
    }
}
