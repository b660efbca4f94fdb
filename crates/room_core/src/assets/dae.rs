//! COLLADA scenes.
//!
//! Images referenced through `<init_from>` are fetched relative to the
//! document's directory and the element text is replaced with the local copy.
//! Only a freshly fetched document is rewritten; a cache hit already points
//! at local files.

use std::path::PathBuf;

use super::{fetch_image, has_extension, read_text, reference_for, write_text, AssetRuntimeState};
use crate::cache::{FetchCache, Retrieved, Transport};
use crate::locator::dirname;

const INIT_FROM_OPEN: &str = "<init_from>";
const INIT_FROM_CLOSE: &str = "</init_from>";
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".png", ".gif", ".bmp"];

pub(super) fn load<T: Transport>(state: &mut AssetRuntimeState, cache: &FetchCache<T>, primary: &Retrieved) -> PathBuf {
    if primary.cached {
        return primary.path.clone();
    }
    let Some(text) = read_text(&primary.path) else {
        return primary.path.clone();
    };

    let image_base = dirname(&primary.locator);
    let document_dir = primary.path.parent();

    let mut changed = false;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        match image_reference(line) {
            Some((start, end)) => {
                let reference = line[start..end].trim();
                match fetch_image(state, cache, reference, image_base) {
                    Some(image) => {
                        out.push_str(&line[..start]);
                        out.push_str(&reference_for(&image, document_dir));
                        out.push_str(&line[end..]);
                        changed = true;
                    }
                    None => out.push_str(line),
                }
            }
            None => out.push_str(line),
        }
    }

    if changed {
        write_text(&primary.path, &out);
    }
    primary.path.clone()
}

/// Byte range of the image path inside the first `<init_from>` of a line.
fn image_reference(line: &str) -> Option<(usize, usize)> {
    let start = line.find(INIT_FROM_OPEN)? + INIT_FROM_OPEN.len();
    let end = start + line[start..].find(INIT_FROM_CLOSE)?;
    let reference = line[start..end].trim();
    if reference.is_empty() || !has_extension(reference, &IMAGE_EXTENSIONS) {
        return None;
    }
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLoader;
    use crate::cache::MemoryTransport;
    use crate::markup::{AssetDeclaration, FormatKind};
    use std::fs;

    const HALL: &str = "<COLLADA>\n  <library_images>\n    <image id=\"a\"><init_from>tex/floor.png</init_from></image>\n    <image id=\"b\"><init_from>missing.jpg</init_from></image>\n    <image id=\"c\"><init_from>shader.fx</init_from></image>\n  </library_images>\n</COLLADA>\n";

    #[test]
    fn test_image_reference() {
        assert_eq!(image_reference("<init_from>a.png</init_from>"), Some((11, 16)));
        assert_eq!(image_reference("  <init_from>a.BMP</init_from>\n"), Some((13, 18)));
        assert_eq!(image_reference("<init_from>a.tga</init_from>"), None);
        assert_eq!(image_reference("<init_from>a.png"), None);
        assert_eq!(image_reference("<image/>"), None);
    }

    #[test]
    fn test_rewrites_images_on_fresh_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new()
            .with_resource("http://x.org/room/scenes/hall.dae", HALL)
            .with_resource("http://x.org/room/scenes/tex/floor.png", b"png".to_vec());
        let cache = FetchCache::new(dir.path(), transport).unwrap();
        let mut loader = AssetLoader::new(
            AssetDeclaration::new("hall", "scenes/hall.dae", FormatKind::Interchange),
            "http://x.org/room/",
        );

        let path = loader.load(&cache).unwrap();
        let text = fs::read_to_string(&path).unwrap();

        let image = cache.cache_path("tex/floor.png", "http://x.org/room/scenes/tex/floor.png");
        let image_name = image.file_name().unwrap().to_string_lossy().into_owned();
        assert!(text.contains(&format!("<init_from>{}</init_from>", image_name)));
        assert!(text.contains("<init_from>missing.jpg</init_from>"));
        assert!(text.contains("<init_from>shader.fx</init_from>"));
        assert_eq!(loader.state().cached_images.get("http://x.org/room/scenes/tex/floor.png"), Some(&image));
    }

    #[test]
    fn test_cache_hit_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with_resource("http://x.org/hall.dae", HALL);
        let cache = FetchCache::new(dir.path(), transport).unwrap();
        let declaration = AssetDeclaration::new("hall", "hall.dae", FormatKind::Interchange);

        let path = AssetLoader::new(declaration.clone(), "http://x.org/").load(&cache).unwrap();
        let requests = cache.transport().requests().len();
        AssetLoader::new(declaration, "http://x.org/").load(&cache).unwrap();

        assert_eq!(cache.transport().requests().len(), requests);
        assert!(fs::read_to_string(path).unwrap().contains("tex/floor.png"));
    }
}
