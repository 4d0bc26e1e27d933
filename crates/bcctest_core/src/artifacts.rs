//! Build artifact naming.
//!
//! Every artifact sits next to its source and differs only by suffix:
//! `tests/ret.c` → `tests/ret.s`, `tests/ret.o`, `tests/ret`.

use std::path::{Path, PathBuf};

/// Suffix of the generated assembly file.
pub const ASSEMBLY_EXTENSION: &str = "s";
/// Suffix of the assembled object file.
pub const OBJECT_EXTENSION: &str = "o";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifacts {
    pub assembly: PathBuf,
    pub object: PathBuf,
    pub executable: PathBuf,
}

impl BuildArtifacts {
    pub fn for_source(source: &Path) -> Self {
        Self {
            assembly: source.with_extension(ASSEMBLY_EXTENSION),
            object: source.with_extension(OBJECT_EXTENSION),
            executable: source.with_extension(""),
        }
    }

    /// All artifact paths, in the order the stages create them.
    pub fn paths(&self) -> [&Path; 3] {
        [&self.assembly, &self.object, &self.executable]
    }
}
