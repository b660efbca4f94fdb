//! FBX files.
//!
//! References inside an FBX file are opaque to us and left to the host
//! importer, so only the primary file is staged.

use std::path::PathBuf;

use crate::cache::Retrieved;

pub(super) fn load(primary: &Retrieved) -> PathBuf {
    primary.path.clone()
}
