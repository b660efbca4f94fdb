//! glTF documents.
//!
//! External `buffers[].uri` and `images[].uri` entries are fetched relative
//! to the document's directory and replaced with the full local path. Data
//! URIs are left alone. A file that does not parse as JSON is taken to be a
//! binary container and imported untouched.

use std::path::PathBuf;

use serde_json::Value;

use super::{fetch_auxiliary, fetch_image, write_text, AssetRuntimeState};
use crate::cache::{FetchCache, Retrieved, Transport};
use crate::locator::dirname;

const DATA_URI: &str = "data:";

pub(super) fn load<T: Transport>(state: &mut AssetRuntimeState, cache: &FetchCache<T>, primary: &Retrieved) -> PathBuf {
    if primary.cached {
        return primary.path.clone();
    }

    let mut document: Value = match std::fs::read(&primary.path)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
    {
        Some(document) => document,
        None => {
            log::debug!("{} is not JSON glTF, importing as-is", primary.path.display());
            return primary.path.clone();
        }
    };

    let base = dirname(&primary.locator);
    let mut changed = false;

    for buffer in entries(&mut document, "buffers") {
        if let Some(uri) = external_uri(buffer) {
            if let Some(local) = fetch_auxiliary(cache, &uri, base) {
                buffer["uri"] = Value::String(local.path.to_string_lossy().into_owned());
                changed = true;
            }
        }
    }
    for image in entries(&mut document, "images") {
        if let Some(uri) = external_uri(image) {
            if let Some(local) = fetch_image(state, cache, &uri, base) {
                image["uri"] = Value::String(local.to_string_lossy().into_owned());
                changed = true;
            }
        }
    }

    if changed {
        match serde_json::to_string(&document) {
            Ok(text) => {
                write_text(&primary.path, &text);
            }
            Err(err) => log::warn!("Could not serialize {}: {}", primary.path.display(), err),
        }
    }
    primary.path.clone()
}

fn entries<'a>(document: &'a mut Value, key: &str) -> impl Iterator<Item = &'a mut Value> {
    document
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

fn external_uri(entry: &Value) -> Option<String> {
    let uri = entry.get("uri")?.as_str()?;
    if uri.is_empty() || uri.starts_with(DATA_URI) {
        return None;
    }
    Some(uri.to_string())
}
