//! Model download over `fetch`, with streamed progress.

use js_sys::{Reflect, Uint8Array};
use strata_core::{AssetError, AssetLoader, DownloadBuffer, LoadProgress};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader, Response, Window};

use super::describe;
use crate::renderer::{load_model_from_bytes, ModelMesh};

/// Fetches a .glb relative to the page and decodes it.
pub struct FetchAssetLoader {
    window: Window,
}

impl FetchAssetLoader {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl AssetLoader<ModelMesh> for FetchAssetLoader {
    async fn load(
        &self,
        path: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<ModelMesh, AssetError> {
        let fetch_err = |e: JsValue| AssetError::Fetch {
            path: path.to_string(),
            reason: describe(&e),
        };

        let response: Response = JsFuture::from(self.window.fetch_with_str(path))
            .await
            .map_err(fetch_err)?
            .dyn_into()
            .map_err(fetch_err)?;

        if !response.ok() {
            return Err(AssetError::Status {
                path: path.to_string(),
                status: response.status(),
            });
        }

        let total = response
            .headers()
            .get("content-length")
            .ok()
            .flatten()
            .and_then(|len| len.parse::<u64>().ok());

        let bytes = match response.body() {
            Some(body) => read_stream(body, total, on_progress).await,
            None => read_whole(&response, on_progress).await,
        }
        .map_err(fetch_err)?;

        tracing::debug!("Fetched {path}: {} bytes", bytes.len());

        load_model_from_bytes(&bytes).map_err(|e| AssetError::Decode(e.to_string()))
    }
}

/// Read the body chunk by chunk, reporting after each one.
async fn read_stream(
    body: ReadableStream,
    total: Option<u64>,
    on_progress: &mut dyn FnMut(LoadProgress),
) -> Result<Vec<u8>, JsValue> {
    let reader: ReadableStreamDefaultReader = body.get_reader().dyn_into()?;
    let mut buffer = DownloadBuffer::new(total);

    loop {
        let chunk = JsFuture::from(reader.read()).await?;
        let done = Reflect::get(&chunk, &JsValue::from_str("done"))?
            .as_bool()
            .unwrap_or(true);
        if done {
            break;
        }

        let value = Reflect::get(&chunk, &JsValue::from_str("value"))?;
        on_progress(buffer.push(&Uint8Array::new(&value).to_vec()));
    }

    Ok(buffer.into_bytes())
}

/// Fallback for responses without a readable body stream.
async fn read_whole(
    response: &Response,
    on_progress: &mut dyn FnMut(LoadProgress),
) -> Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    on_progress(LoadProgress {
        loaded: bytes.len() as u64,
        total: Some(bytes.len() as u64),
    });
    Ok(bytes)
}
