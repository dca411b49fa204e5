use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tracing::info;

/// A read-only store of named content files such as shaders, models, textures
/// and the scene configuration. Paths are relative to the store's root and use
/// forward slashes (eg `shaders/basic.vert.wgsl`).
pub trait AssetSource {
    /// Load the file at `file_path` and return it as a string.
    fn load_as_string(&self, file_path: &str) -> anyhow::Result<String>;

    /// Load the file at `file_path` and return it as a vector of bytes.
    fn load_as_binary(&self, file_path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Loads content files from a directory on disk.
#[derive(Clone, Debug)]
pub struct ContentDir {
    root: PathBuf,
}

impl ContentDir {
    /// Create a content directory that resolves paths relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The `content/` directory that `build.rs` copies next to the build
    /// output.
    pub fn from_build_output() -> Self {
        Self::new(Path::new(env!("OUT_DIR")).join("content"))
    }

    /// Get the directory that content paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        self.root.join(file_path)
    }
}

impl AssetSource for ContentDir {
    fn load_as_string(&self, file_path: &str) -> anyhow::Result<String> {
        info!("load file as string: {file_path:?}");

        let full_path = self.resolve(file_path);
        std::fs::read_to_string(&full_path)
            .with_context(|| format!("failed to read {}", full_path.display()))
    }

    fn load_as_binary(&self, file_path: &str) -> anyhow::Result<Vec<u8>> {
        info!("load file as binary: {file_path:?}");

        let full_path = self.resolve(file_path);
        std::fs::read(&full_path).with_context(|| format!("failed to read {}", full_path.display()))
    }
}

/// An asset source that serves files from memory. Every load is counted which
/// makes it handy for checking how often a cache goes back to its source.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
    load_counts: RefCell<HashMap<String, usize>>,
}

impl MemoryAssets {
    /// Create an empty in-memory asset source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the file stored at `file_path`.
    pub fn insert(&mut self, file_path: &str, contents: impl Into<Vec<u8>>) {
        self.files.insert(file_path.to_owned(), contents.into());
    }

    /// Builder style version of `insert`.
    pub fn with(mut self, file_path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(file_path, contents);
        self
    }

    /// Number of times `file_path` was requested, including failed requests.
    pub fn load_count(&self, file_path: &str) -> usize {
        self.load_counts
            .borrow()
            .get(file_path)
            .copied()
            .unwrap_or_default()
    }

    fn fetch(&self, file_path: &str) -> anyhow::Result<&[u8]> {
        *self
            .load_counts
            .borrow_mut()
            .entry(file_path.to_owned())
            .or_default() += 1;

        self.files
            .get(file_path)
            .map(Vec::as_slice)
            .with_context(|| format!("no such asset: {file_path}"))
    }
}

impl AssetSource for MemoryAssets {
    fn load_as_string(&self, file_path: &str) -> anyhow::Result<String> {
        let bytes = self.fetch(file_path)?;
        Ok(std::str::from_utf8(bytes)
            .with_context(|| format!("{file_path} is not valid utf8"))?
            .to_owned())
    }

    fn load_as_binary(&self, file_path: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.fetch(file_path)?.to_vec())
    }
}
