//! Wavefront OBJ with an MTL material library.
//!
//! The material library comes from the declaration's `mtl` attribute or,
//! failing that, from the geometry's own `mtllib` directive (resolved against
//! the geometry's directory). Texture maps named in a freshly fetched MTL are
//! fetched next to it and the MTL is rewritten to point at the local copies.
//! When the material and geometry do not share a stem, the geometry is
//! written to `<geometry>_<material>.obj` with a corrected `mtllib` line, so
//! a geometry shared by several declarations is never modified in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{fetch_auxiliary, fetch_image, has_extension, read_text, reference_for, write_text, AssetRuntimeState};
use crate::cache::{FetchCache, Retrieved, Transport};
use crate::locator::{dirname, resolve};
use crate::markup::AssetDeclaration;

const MTLLIB: &str = "mtllib";
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".gif", ".png"];

pub(super) fn load<T: Transport>(
    declaration: &AssetDeclaration,
    base: &str,
    state: &mut AssetRuntimeState,
    cache: &FetchCache<T>,
    primary: &Retrieved,
) -> PathBuf {
    let Some(geometry) = read_text(&primary.path) else {
        return primary.path.clone();
    };

    let material = match (&declaration.material_locator, find_mtllib(&geometry)) {
        (Some(explicit), _) => fetch_auxiliary(cache, explicit, base),
        (None, Some(library)) => {
            let library = resolve(dirname(&primary.locator), library);
            fetch_auxiliary(cache, &library, "")
        }
        (None, None) => None,
    };
    let Some(material) = material else {
        return primary.path.clone();
    };
    state.material_path = Some(material.path.clone());

    if !material.cached {
        localize_images(state, cache, &material);
    }

    if material.path.with_extension("") == primary.path.with_extension("") {
        return primary.path.clone();
    }

    let target = cache.working_dir().join(format!(
        "{}_{}.obj",
        file_stem(&primary.path),
        file_stem(&material.path)
    ));
    let library = reference_for(&material.path, target.parent());
    if write_text(&target, &with_mtllib(&geometry, &library)) {
        target
    } else {
        primary.path.clone()
    }
}

/// Argument of the first `mtllib` directive.
fn find_mtllib(geometry: &str) -> Option<&str> {
    geometry.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(MTLLIB)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let library = rest.trim();
        (!library.is_empty()).then_some(library)
    })
}

/// Fetch the texture maps of a material library and point it at the copies.
fn localize_images<T: Transport>(state: &mut AssetRuntimeState, cache: &FetchCache<T>, material: &Retrieved) {
    let Some(text) = read_text(&material.path) else {
        return;
    };
    let image_base = dirname(&material.locator);
    let material_dir = material.path.parent();

    let mut replacements = HashMap::new();
    for reference in text.split_whitespace() {
        if !has_extension(reference, &IMAGE_EXTENSIONS) || replacements.contains_key(reference) {
            continue;
        }
        if let Some(image) = fetch_image(state, cache, reference, image_base) {
            replacements.insert(reference.to_string(), reference_for(&image, material_dir));
        }
    }

    let rewritten = replace_tokens(&text, &replacements);
    if rewritten != text {
        write_text(&material.path, &rewritten);
    }
}

/// Replace whole whitespace-delimited tokens, keeping all other text intact.
fn replace_tokens(text: &str, replacements: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| !c.is_whitespace()) {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = &rest[..end];
        out.push_str(replacements.get(token).map(String::as_str).unwrap_or(token));
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Geometry text with every `mtllib` line replaced, or one prepended.
fn with_mtllib(geometry: &str, library: &str) -> String {
    let directive = format!("{} {}", MTLLIB, library);
    let mut replaced = false;
    let mut out = String::with_capacity(geometry.len() + directive.len() + 1);
    for line in geometry.lines() {
        if line.starts_with(MTLLIB) {
            out.push_str(&directive);
            replaced = true;
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    if replaced {
        out
    } else {
        format!("{}\n{}", directive, out)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLoader;
    use crate::cache::MemoryTransport;
    use crate::markup::FormatKind;
    use std::fs;

    const BASE: &str = "http://x.org/room/";

    fn chair_transport() -> MemoryTransport {
        MemoryTransport::new()
            .with_resource("http://x.org/room/models/chair.obj", "mtllib chair.mtl\nv 0 0 0\n")
            .with_resource(
                "http://x.org/room/models/chair.mtl",
                "newmtl wood\nmap_Kd tex/wood.jpg\nmap_Bump tex/wood.jpg\n",
            )
            .with_resource("http://x.org/room/models/tex/wood.jpg", b"jpg".to_vec())
    }

    #[test]
    fn test_find_mtllib() {
        assert_eq!(find_mtllib("# x\nmtllib  a b.mtl \nv 0 0 0"), Some("a b.mtl"));
        assert_eq!(find_mtllib("mtllibx.mtl\n"), None);
        assert_eq!(find_mtllib("mtllib \n"), None);
        assert_eq!(find_mtllib("v 0 0 0\n"), None);
    }

    #[test]
    fn test_with_mtllib() {
        assert_eq!(with_mtllib("mtllib old.mtl\nv 1 2 3", "new.mtl"), "mtllib new.mtl\nv 1 2 3\n");
        assert_eq!(with_mtllib("v 1 2 3\n", "new.mtl"), "mtllib new.mtl\nv 1 2 3\n");
    }

    #[test]
    fn test_replace_tokens() {
        let replacements = HashMap::from([("a.png".to_string(), "b.png".to_string())]);
        assert_eq!(
            replace_tokens("map_Kd  a.png\n\tmap_Ks xa.png\n", &replacements),
            "map_Kd  b.png\n\tmap_Ks xa.png\n"
        );
    }

    #[test]
    fn test_embedded_mtllib_resolves_against_geometry_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), chair_transport()).unwrap();
        let mut loader = AssetLoader::new(
            AssetDeclaration::new("chair", "models/chair.obj", FormatKind::Mesh),
            BASE,
        );

        let import_path = loader.load(&cache).unwrap();

        let geometry = cache.cache_path("models/chair.obj", "http://x.org/room/models/chair.obj");
        let material = cache.cache_path("chair.mtl", "http://x.org/room/models/chair.mtl");
        let image = cache.cache_path("tex/wood.jpg", "http://x.org/room/models/tex/wood.jpg");
        assert_eq!(loader.state().material_path.as_ref(), Some(&material));

        let expected = dir
            .path()
            .join(format!("{}_{}.obj", file_stem(&geometry), file_stem(&material)));
        assert_eq!(import_path, expected);

        let rewritten = fs::read_to_string(&import_path).unwrap();
        let library = material.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(rewritten, format!("mtllib {}\nv 0 0 0\n", library));

        let image_name = image.file_name().unwrap().to_string_lossy().into_owned();
        let mtl = fs::read_to_string(&material).unwrap();
        assert_eq!(
            mtl,
            format!("newmtl wood\nmap_Kd {0}\nmap_Bump {0}\n", image_name)
        );
        assert_eq!(cache.transport().request_count("http://x.org/room/models/tex/wood.jpg"), 1);

        // The shared geometry itself is untouched
        assert_eq!(fs::read_to_string(&geometry).unwrap(), "mtllib chair.mtl\nv 0 0 0\n");
    }

    #[test]
    fn test_explicit_material_uses_document_base() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new()
            .with_resource("http://x.org/room/box.obj", "v 0 0 0\n")
            .with_resource("http://x.org/room/skins/red.mtl", "newmtl red\nKd 1 0 0\n");
        let cache = FetchCache::new(dir.path(), transport).unwrap();
        let mut declaration = AssetDeclaration::new("box", "box.obj", FormatKind::Mesh);
        declaration.material_locator = Some("skins/red.mtl".to_string());
        let mut loader = AssetLoader::new(declaration, BASE);

        let import_path = loader.load(&cache).unwrap();
        let text = fs::read_to_string(import_path).unwrap();
        assert!(text.starts_with("mtllib "));
        assert!(text.ends_with(".mtl\nv 0 0 0\n"));
    }

    #[test]
    fn test_missing_material_imports_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with_resource("http://x.org/room/a.obj", "mtllib gone.mtl\n");
        let cache = FetchCache::new(dir.path(), transport).unwrap();
        let mut loader = AssetLoader::new(AssetDeclaration::new("a", "a.obj", FormatKind::Mesh), BASE);

        let import_path = loader.load(&cache).unwrap();
        assert_eq!(import_path, cache.cache_path("a.obj", "http://x.org/room/a.obj"));
        assert!(loader.state().material_path.is_none());
    }

    #[test]
    fn test_local_material_sharing_stem_imports_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let prims = dir.path().join("prims");
        fs::create_dir_all(&prims).unwrap();
        fs::write(prims.join("cube.obj"), "mtllib cube.mtl\nv 0 0 0\n").unwrap();
        fs::write(prims.join("cube.mtl"), "newmtl grey\nmap_Kd grey.png\n").unwrap();

        let work = dir.path().join("work");
        let cache = FetchCache::new(&work, MemoryTransport::new()).unwrap();
        let source = crate::locator::file_locator(&prims.join("cube.obj"));
        let mut loader = AssetLoader::new(AssetDeclaration::new("cube", source, FormatKind::Mesh), BASE);

        let import_path = loader.load(&cache).unwrap();
        assert_eq!(import_path, prims.join("cube.obj"));
        assert_eq!(loader.state().material_path.as_ref(), Some(&prims.join("cube.mtl")));
        assert_eq!(fs::read_dir(&work).unwrap().count(), 0);
        assert!(cache.transport().requests().is_empty());
        assert_eq!(
            fs::read_to_string(prims.join("cube.mtl")).unwrap(),
            "newmtl grey\nmap_Kd grey.png\n"
        );
    }

    #[test]
    fn test_cached_material_is_not_rewritten_again() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), chair_transport()).unwrap();
        let declaration = AssetDeclaration::new("chair", "models/chair.obj", FormatKind::Mesh);

        let first = AssetLoader::new(declaration.clone(), BASE).load(&cache).unwrap();
        let mut second = AssetLoader::new(declaration, BASE);
        assert_eq!(second.load(&cache).unwrap(), first);

        // The second loader starts with an empty image map but hits the cached MTL
        assert!(second.state().cached_images.is_empty());
        assert_eq!(cache.transport().request_count("http://x.org/room/models/tex/wood.jpg"), 1);
        assert_eq!(cache.transport().request_count("http://x.org/room/models/chair.mtl"), 1);
    }
}
