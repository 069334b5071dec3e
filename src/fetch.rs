//! # Fetching Asset Payloads
//!
//! The importer needs raw bytes for the document and for every buffer it declares. Where those bytes come
//! from is behind the [`Fetch`] trait:
//!
//! - [`FileFetcher`] reads from the local filesystem (native builds).
//! - [`HttpFetcher`] requests URIs with the browser's `fetch`, relative to the page (WebAssembly builds).
//! - [`MemoryFetcher`] serves bytes registered up front (tests, embedded assets).
//!
//! `data:` URIs never reach a fetcher; [`load_payload`] decodes their base64 body in-process. Every
//! other buffer URI is resolved against the directory of the document that declared it.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine;
use log::debug;

use crate::error::ImportError;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A source of raw bytes addressed by URI.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, ImportError>;
}

/// Reads URIs as filesystem paths.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[cfg(not(target_arch = "wasm32"))]
impl Fetch for FileFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, ImportError> {
        debug!("Reading '{uri}'");
        std::fs::read(uri).map_err(|source| ImportError::Fetch {
            uri: uri.to_string(),
            source,
        })
    }
}

/// Requests URIs over HTTP. Any response other than 2xx is a fetch error.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

#[cfg(target_arch = "wasm32")]
impl Fetch for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, ImportError> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let failed = |reason: String| ImportError::Fetch {
            uri: uri.to_string(),
            source: std::io::Error::other(reason),
        };
        let rejected = |value: wasm_bindgen::JsValue| failed(format!("{value:?}"));

        debug!("Requesting '{uri}'");
        let window = web_sys::window().ok_or_else(|| failed("no browser window".to_string()))?;
        let response: web_sys::Response = JsFuture::from(window.fetch_with_str(uri))
            .await
            .map_err(rejected)?
            .dyn_into()
            .map_err(rejected)?;
        if !response.ok() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body = JsFuture::from(response.array_buffer().map_err(rejected)?)
            .await
            .map_err(rejected)?;
        Ok(js_sys::Uint8Array::new(&body).to_vec())
    }
}

/// Serves a fixed set of payloads; unknown URIs fail with [`std::io::ErrorKind::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(uri.into(), bytes.into());
    }
}

impl Fetch for MemoryFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, ImportError> {
        self.entries.get(uri).cloned().ok_or_else(|| ImportError::Fetch {
            uri: uri.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such entry"),
        })
    }
}

/// Decodes a base64 `data:` URI. Returns `None` when `uri` is not a data URI at all.
pub fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, ImportError>> {
    let body = uri.strip_prefix(DATA_PREFIX)?;

    let decoded = match body.split_once(BASE64_MARKER) {
        Some((_media_type, payload)) => base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ImportError::DataUri(e.to_string())),
        None => Err(ImportError::DataUri(format!(
            "only base64 data URIs are supported: '{}'",
            truncate(uri)
        ))),
    };

    Some(decoded)
}

/// Resolves `uri` relative to the directory holding `base`. Absolute paths and data URIs pass through.
pub fn resolve_uri(base: &str, uri: &str) -> String {
    if uri.starts_with(DATA_PREFIX) || Path::new(uri).is_absolute() {
        return uri.to_string();
    }

    match Path::new(base).parent() {
        Some(directory) if !directory.as_os_str().is_empty() => {
            directory.join(uri).to_string_lossy().into_owned()
        }
        _ => uri.to_string(),
    }
}

/// Loads one buffer payload: data URIs inline, anything else through `fetcher` relative to `base`.
pub async fn load_payload(fetcher: &impl Fetch, base: &str, uri: &str) -> Result<Vec<u8>, ImportError> {
    match decode_data_uri(uri) {
        Some(decoded) => decoded,
        None => fetcher.fetch(&resolve_uri(base, uri)).await,
    }
}

fn truncate(uri: &str) -> &str {
    uri.get(..32).unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_data_uris() {
        let decoded = decode_data_uri("data:application/octet-stream;base64,AAECAw==")
            .unwrap()
            .unwrap();
        assert_eq!(decoded, vec![0, 1, 2, 3]);

        let gltf_buffer = decode_data_uri("data:application/gltf-buffer;base64,/w==").unwrap().unwrap();
        assert_eq!(gltf_buffer, vec![255]);
    }

    #[test]
    fn non_base64_data_uri_is_rejected() {
        let result = decode_data_uri("data:text/plain,hello").unwrap();
        assert!(matches!(result, Err(ImportError::DataUri(_))));

        let garbage = decode_data_uri("data:application/octet-stream;base64,@@@").unwrap();
        assert!(matches!(garbage, Err(ImportError::DataUri(_))));
    }

    #[test]
    fn plain_uris_are_not_data_uris() {
        assert!(decode_data_uri("mesh.bin").is_none());
    }

    #[test]
    fn relative_uris_resolve_against_the_document_directory() {
        assert_eq!(resolve_uri("assets/scene.gltf", "mesh.bin"), Path::new("assets").join("mesh.bin").to_string_lossy());
        assert_eq!(resolve_uri("scene.gltf", "mesh.bin"), "mesh.bin");
        assert_eq!(resolve_uri("assets/scene.gltf", "data:x;base64,AA=="), "data:x;base64,AA==");
    }

    #[test]
    fn memory_fetcher_reports_missing_entries() {
        let fetcher = MemoryFetcher::new().with("a.bin", vec![7u8]);

        assert_eq!(pollster::block_on(fetcher.fetch("a.bin")).unwrap(), vec![7]);
        assert!(matches!(
            pollster::block_on(fetcher.fetch("b.bin")),
            Err(ImportError::Fetch { uri, .. }) if uri == "b.bin"
        ));
    }

    #[test]
    fn file_fetcher_reports_io_errors() {
        let result = pollster::block_on(FileFetcher.fetch("definitely/not/here.bin"));

        assert!(matches!(result, Err(ImportError::Fetch { .. })));
    }
}
