//! Content-addressed fetch cache.
//!
//! Every remote or relative source is copied once into a flat working
//! directory under `sha256(resolved locator) + extension`. Gzip sources are
//! decompressed once into a sibling without the `.gz` suffix. There is no
//! invalidation: a file that exists is reused regardless of age.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::locator::{basename, is_local_file, is_remote, local_path, resolve};

/// Errors that can occur while fetching a source into the cache.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("HTTP error fetching {locator}: {message}")]
    Http { locator: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transfer of {locator} failed: {source}")]
    Transfer {
        locator: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decompress {path}: {source}")]
    Decompress {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Empty locator")]
    EmptyLocator,

    #[error("Unsupported locator {0}: expected http(s):// or file://")]
    UnsupportedLocator(String),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Moves the bytes of a resolved locator into a writer.
///
/// One call is one attempt; there is no retry.
pub trait Transport {
    /// Copy the resource named by `locator` into `writer`, returning the byte count.
    fn fetch(&self, locator: &str, writer: &mut dyn Write) -> FetchResult<u64>;
}

/// `file://` locators from disk, `http(s)` through a blocking `ureq` agent.
///
/// Scheme-less locators (such as root-absolute `/x` paths written in a
/// remote room) are refused rather than read from the local disk.
pub struct DefaultTransport {
    agent: ureq::Agent,
}

impl DefaultTransport {
    /// Create a transport with an optional network timeout.
    pub fn new(timeout: Option<Duration>, user_agent: &str) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }
}

impl Default for DefaultTransport {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(30)), concat!("room_import/", env!("CARGO_PKG_VERSION")))
    }
}

impl Transport for DefaultTransport {
    fn fetch(&self, locator: &str, writer: &mut dyn Write) -> FetchResult<u64> {
        if is_remote(locator) {
            let response = self.agent.get(locator).call().map_err(|e| match e {
                ureq::Error::Status(404, _) => FetchError::NotFound(locator.to_string()),
                other => FetchError::Http {
                    locator: locator.to_string(),
                    message: other.to_string(),
                },
            })?;
            let mut reader = response.into_reader();
            return io::copy(&mut reader, writer).map_err(|source| FetchError::Transfer {
                locator: locator.to_string(),
                source,
            });
        }
        if !is_local_file(locator) {
            return Err(FetchError::UnsupportedLocator(locator.to_string()));
        }

        let path = local_path(locator);
        let mut file = File::open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(locator.to_string()),
            _ => FetchError::Io {
                path: path.clone(),
                source,
            },
        })?;
        io::copy(&mut file, writer).map_err(|source| FetchError::Transfer {
            locator: locator.to_string(),
            source,
        })
    }
}

/// In-memory transport serving a fixed set of locators.
///
/// Records every request, which makes it handy for offline runs and for
/// asserting how often a source was actually fetched.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    resources: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryTransport::insert`].
    pub fn with_resource(mut self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(locator, bytes);
        self
    }

    /// Serve `bytes` for `locator`.
    pub fn insert(&mut self, locator: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.resources.insert(locator.into(), bytes.into());
    }

    /// All requested locators, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// How many times `locator` was requested.
    pub fn request_count(&self, locator: &str) -> usize {
        self.requests.borrow().iter().filter(|r| r.as_str() == locator).count()
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, locator: &str, writer: &mut dyn Write) -> FetchResult<u64> {
        self.requests.borrow_mut().push(locator.to_string());
        let bytes = self
            .resources
            .get(locator)
            .ok_or_else(|| FetchError::NotFound(locator.to_string()))?;
        writer
            .write_all(bytes)
            .map_err(|source| FetchError::Transfer {
                locator: locator.to_string(),
                source,
            })?;
        Ok(bytes.len() as u64)
    }
}

/// A local copy handed back by [`FetchCache::retrieve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Retrieved {
    /// Local path, decompressed if the source was gzip
    pub path: PathBuf,

    /// Resolved source locator
    pub locator: String,

    /// True when nothing was fetched or decompressed by this call
    pub cached: bool,
}

/// Fetch cache over a working directory.
pub struct FetchCache<T: Transport = DefaultTransport> {
    working_dir: PathBuf,
    transport: T,
}

impl<T: Transport> FetchCache<T> {
    /// Create a cache, creating the working directory if needed.
    pub fn new(working_dir: impl Into<PathBuf>, transport: T) -> FetchResult<Self> {
        let working_dir = working_dir.into();
        fs::create_dir_all(&working_dir).map_err(|source| FetchError::Io {
            path: working_dir.clone(),
            source,
        })?;
        Ok(Self {
            working_dir,
            transport,
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read a whole resource without caching it (used for the room document).
    pub fn read(&self, locator: &str) -> FetchResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.transport.fetch(locator, &mut bytes)?;
        Ok(bytes)
    }

    /// Return a local path for `candidate`, fetching it on first access.
    ///
    /// `file://` candidates are returned as-is and always count as cached.
    /// Anything else is resolved against `base`, fetched into the working
    /// directory unless its cache file exists, and decompressed if it is a
    /// `.gz` source.
    pub fn retrieve(&self, candidate: &str, base: &str) -> FetchResult<Retrieved> {
        if candidate.is_empty() {
            return Err(FetchError::EmptyLocator);
        }
        if is_local_file(candidate) {
            return Ok(Retrieved {
                path: local_path(candidate),
                locator: candidate.to_string(),
                cached: true,
            });
        }

        let resolved = resolve(base, candidate);
        let target = self.cache_path(candidate, &resolved);
        let mut cached = true;

        if target.exists() {
            log::debug!("Reusing {} as {}", resolved, target.display());
        } else {
            cached = false;
            log::info!("Retrieving {} to {}", resolved, target.display());
            self.download(&resolved, &target)?;
        }

        if is_gzip(candidate) || is_gzip(&target.to_string_lossy()) {
            let plain = target.with_extension("");
            if !plain.exists() {
                cached = false;
                decompress(&target, &plain)?;
            }
            return Ok(Retrieved {
                path: plain,
                locator: resolved,
                cached,
            });
        }

        Ok(Retrieved {
            path: target,
            locator: resolved,
            cached,
        })
    }

    /// Cache file for a resolved locator: `<sha256 hex><extension>`.
    ///
    /// The extension comes from the candidate's file name; `.gz` sources keep
    /// their inner extension too (`a.obj.gz` caches as `<hash>.obj.gz`).
    pub fn cache_path(&self, candidate: &str, resolved: &str) -> PathBuf {
        self.working_dir
            .join(format!("{}{}", sha256_hex(resolved), cache_extension(candidate)))
    }

    fn download(&self, locator: &str, target: &Path) -> FetchResult<()> {
        let part = part_path(target);
        let result = File::create(&part)
            .map_err(|source| FetchError::Io {
                path: part.clone(),
                source,
            })
            .and_then(|mut file| {
                self.transport.fetch(locator, &mut file)?;
                file.flush().map_err(|source| FetchError::Io {
                    path: part.clone(),
                    source,
                })
            })
            .and_then(|_| {
                fs::rename(&part, target).map_err(|source| FetchError::Io {
                    path: target.to_path_buf(),
                    source,
                })
            });

        if result.is_err() {
            let _ = fs::remove_file(&part);
        }
        result
    }
}

fn decompress(source: &Path, target: &Path) -> FetchResult<()> {
    let part = part_path(target);
    let result = (|| -> io::Result<()> {
        let mut decoder = GzDecoder::new(File::open(source)?);
        let mut out = File::create(&part)?;
        io::copy(&mut decoder, &mut out)?;
        out.flush()?;
        drop(out);
        fs::rename(&part, target)
    })();

    result.map_err(|err| {
        let _ = fs::remove_file(&part);
        FetchError::Decompress {
            path: source.to_path_buf(),
            source: err,
        }
    })
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn is_gzip(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".gz")
}

/// Extension of a candidate's file name, with `.gz` keeping its inner extension.
pub fn cache_extension(candidate: &str) -> String {
    let name = basename(candidate);
    let (stem, ext) = split_extension(name);
    if ext.eq_ignore_ascii_case(".gz") {
        let (_, inner) = split_extension(stem);
        return format!("{}{}", inner, ext);
    }
    ext.to_string()
}

// Mirrors `Path::extension`: a leading dot is part of the stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    }
}

/// Hex SHA-256 of a locator.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hash = hasher.finalize();
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::file_locator;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_cache_extension() {
        assert_eq!(cache_extension("models/chair.obj"), ".obj");
        assert_eq!(cache_extension("chair.obj.gz"), ".obj.gz");
        assert_eq!(cache_extension("http://x/a/scene.gltf?v=3"), ".gltf");
        assert_eq!(cache_extension("noext"), "");
        assert_eq!(cache_extension(".hidden"), "");
    }

    #[test]
    fn test_cache_path_is_hash_of_resolved_locator() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), MemoryTransport::new()).unwrap();

        let a = cache.cache_path("chair.obj", "http://x/a/chair.obj");
        let b = cache.cache_path("chair.obj", "http://y/a/chair.obj");
        assert_ne!(a, b);
        assert_eq!(a, cache.cache_path("../a/chair.obj", "http://x/a/chair.obj"));
        assert_eq!(
            a.file_name().unwrap().to_string_lossy(),
            format!("{}.obj", sha256_hex("http://x/a/chair.obj"))
        );
    }

    #[test]
    fn test_retrieve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with_resource("http://x/a/chair.obj", "v 0 0 0\n");
        let cache = FetchCache::new(dir.path(), transport).unwrap();

        let first = cache.retrieve("chair.obj", "http://x/a").unwrap();
        let second = cache.retrieve("chair.obj", "http://x/a/").unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.path, second.path);
        assert_eq!(first.locator, "http://x/a/chair.obj");
        assert_eq!(cache.transport().request_count("http://x/a/chair.obj"), 1);
        assert_eq!(fs::read_to_string(&first.path).unwrap(), "v 0 0 0\n");
    }

    #[test]
    fn test_local_file_locator_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), MemoryTransport::new()).unwrap();

        let retrieved = cache.retrieve("file:///opt/prims/cube.obj", "http://x/").unwrap();
        assert!(retrieved.cached);
        assert_eq!(retrieved.path, PathBuf::from("/opt/prims/cube.obj"));
        assert!(cache.transport().requests().is_empty());
    }

    #[test]
    fn test_fetch_failure_leaves_no_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), MemoryTransport::new()).unwrap();

        let err = cache.retrieve("missing.png", "http://x/").unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        // A second attempt tries again rather than reusing a partial file
        assert!(cache.retrieve("missing.png", "http://x/").is_err());
        assert_eq!(cache.transport().request_count("http://x/missing.png"), 2);
    }

    #[test]
    fn test_empty_locator() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), MemoryTransport::new()).unwrap();
        assert!(matches!(cache.retrieve("", "http://x/"), Err(FetchError::EmptyLocator)));
    }

    #[test]
    fn test_gzip_source_is_decompressed_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            MemoryTransport::new().with_resource("http://x/chair.obj.gz", gzip(b"v 1 2 3\n"));
        let cache = FetchCache::new(dir.path(), transport).unwrap();

        let first = cache.retrieve("chair.obj.gz", "http://x/").unwrap();
        assert!(!first.cached);
        assert!(first.path.to_string_lossy().ends_with(".obj"));
        assert_eq!(fs::read_to_string(&first.path).unwrap(), "v 1 2 3\n");

        let compressed = cache.cache_path("chair.obj.gz", "http://x/chair.obj.gz");
        assert!(compressed.exists());
        assert_eq!(first.path, compressed.with_extension(""));

        // Sibling exists: no fetch, no decompression
        fs::write(&first.path, "edited\n").unwrap();
        let second = cache.retrieve("chair.obj.gz", "http://x/").unwrap();
        assert!(second.cached);
        assert_eq!(fs::read_to_string(&second.path).unwrap(), "edited\n");
        assert_eq!(cache.transport().request_count("http://x/chair.obj.gz"), 1);
    }

    #[test]
    fn test_corrupt_gzip_reports_decompress_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MemoryTransport::new().with_resource("http://x/bad.obj.gz", "not gzip");
        let cache = FetchCache::new(dir.path(), transport).unwrap();

        let err = cache.retrieve("bad.obj.gz", "http://x/").unwrap_err();
        assert!(matches!(err, FetchError::Decompress { .. }));
    }

    #[test]
    fn test_default_transport_reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mtl");
        fs::write(&source, "newmtl wood\n").unwrap();

        let transport = DefaultTransport::default();
        let mut bytes = Vec::new();
        let count = transport.fetch(&file_locator(&source), &mut bytes).unwrap();
        assert_eq!(count, 12);
        assert_eq!(bytes, b"newmtl wood\n");

        let missing = transport.fetch("file:///definitely/not/here.mtl", &mut Vec::new());
        assert!(matches!(missing, Err(FetchError::NotFound(_))));
    }

    #[test]
    fn test_default_transport_refuses_scheme_less_paths() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("secret.mtl");
        fs::write(&secret, "newmtl private\n").unwrap();

        let transport = DefaultTransport::default();
        let mut bytes = Vec::new();
        let err = transport.fetch(&secret.to_string_lossy(), &mut bytes).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedLocator(_)));
        assert!(bytes.is_empty());

        // A remote room naming a root-absolute material gets nothing copied
        let work = dir.path().join("work");
        let cache = FetchCache::new(&work, DefaultTransport::default()).unwrap();
        let err = cache
            .retrieve(&secret.to_string_lossy(), "http://x.org/room/")
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedLocator(_)));
        assert_eq!(fs::read_dir(&work).unwrap().count(), 0);
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
