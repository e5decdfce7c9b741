//! Loading every filter's program: concurrent source fetch, then compile
//! and link.
//!
//! Loading is all-or-nothing. Sources for all filters are fetched
//! concurrently and joined; the first failed fetch fails the whole load
//! before any GPU call is made. Programs are then built one by one, and if
//! any build fails the ones already built are deleted. A [`ShaderLibrary`]
//! value therefore only ever exists fully populated.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::hash::BuildHasher;
use std::io;
use std::path::PathBuf;

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filter::FilterName;
use crate::gpu::Gpu;
use crate::program::{ShaderProgram, ShaderStage};

/// Asynchronous read of shader source text by path.
///
/// The path is opaque to the loader: a file path, a URL or a key.
pub trait SourceFetcher {
    /// Fetch the source text at `path`.
    fn fetch(&self, path: &str) -> impl Future<Output = io::Result<String>>;
}

/// Reads sources from files under a root directory.
///
/// Each fetch reads its file on a short-lived thread and resolves through a
/// oneshot channel, so concurrent fetches overlap and the polling thread
/// never blocks on disk.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    /// Resolve fetched paths relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceFetcher for DirectoryFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = io::Result<String>> {
        let full = self.root.join(path);
        let (tx, rx) = oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("shader-fetch".to_owned())
            .spawn(move || {
                // The receiver is gone only if the load was dropped.
                let _ = tx.send(std::fs::read_to_string(full));
            });
        async move {
            if let Err(err) = spawned {
                return Err(err);
            }
            rx.await
                .unwrap_or_else(|_| Err(io::Error::other("shader read thread exited")))
        }
    }
}

/// Embedded sources keyed by path; a missing key is `NotFound`.
impl<S: BuildHasher> SourceFetcher for HashMap<String, String, S> {
    fn fetch(&self, path: &str) -> impl Future<Output = io::Result<String>> {
        let result = self.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no shader source at {path}"))
        });
        std::future::ready(result)
    }
}

/// Which copy of the shader tree to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderVariant {
    /// `<root>/<name>.vert`
    #[default]
    Standard,
    /// `<root>/solution/<name>.vert`
    Solution,
}

/// Naming convention for shader files: `<root>[/solution]/<name>.<vert|frag>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderLayout {
    root: String,
    variant: ShaderVariant,
}

impl ShaderLayout {
    /// Layout rooted at `root` (may be empty).
    pub fn new(root: impl Into<String>, variant: ShaderVariant) -> Self {
        let mut root = root.into();
        while root.ends_with('/') {
            root.pop();
        }
        Self { root, variant }
    }

    /// Path of one stage of one filter.
    #[must_use]
    pub fn path(&self, filter: FilterName, stage: ShaderStage) -> String {
        let mut path = String::new();
        if !self.root.is_empty() {
            path.push_str(&self.root);
            path.push('/');
        }
        if self.variant == ShaderVariant::Solution {
            path.push_str("solution/");
        }
        path.push_str(filter.file_stem());
        path.push('.');
        path.push_str(stage.extension());
        path
    }
}

impl Default for ShaderLayout {
    fn default() -> Self {
        Self::new("shaders", ShaderVariant::Standard)
    }
}

/// Vertex and fragment source locations for one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    /// Vertex stage path.
    pub vertex: String,
    /// Fragment stage path.
    pub fragment: String,
}

/// The filters to load and where their sources live, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSources {
    entries: Vec<(FilterName, SourcePair)>,
}

impl ShaderSources {
    /// No filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `filters` laid out by `layout`.
    #[must_use]
    pub fn conventional(layout: &ShaderLayout, filters: &[FilterName]) -> Self {
        let mut sources = Self::new();
        for &filter in filters {
            sources.insert(
                filter,
                layout.path(filter, ShaderStage::Vertex),
                layout.path(filter, ShaderStage::Fragment),
            );
        }
        sources
    }

    /// All six filters laid out by `layout`.
    #[must_use]
    pub fn all(layout: &ShaderLayout) -> Self {
        Self::conventional(layout, &FilterName::ALL)
    }

    /// Add or replace a filter's source pair.
    pub fn insert(
        &mut self,
        filter: FilterName,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> &mut Self {
        let pair = SourcePair {
            vertex: vertex.into(),
            fragment: fragment.into(),
        };
        match self.entries.iter_mut().find(|(name, _)| *name == filter) {
            Some(entry) => entry.1 = pair,
            None => self.entries.push((filter, pair)),
        }
        self
    }

    /// Entries in load order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterName, &SourcePair)> {
        self.entries.iter().map(|(name, pair)| (*name, pair))
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no filter is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetched source text for one filter.
struct FetchedSources {
    filter: FilterName,
    vertex: String,
    fragment: String,
}

/// The fully loaded registry of filter programs.
pub struct ShaderLibrary<G: Gpu> {
    programs: BTreeMap<FilterName, ShaderProgram<G>>,
}

impl<G: Gpu> std::fmt::Debug for ShaderLibrary<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.programs.iter()).finish()
    }
}

impl<G: Gpu> ShaderLibrary<G> {
    /// Fetch every source concurrently, then build every program.
    ///
    /// No GPU call is made until all fetches have succeeded. A fetch that
    /// never resolves keeps the load pending indefinitely.
    ///
    /// # Errors
    ///
    /// - [`Error::ShaderLoad`] for the first failed fetch; other results are
    ///   discarded,
    /// - any error from [`ShaderProgram::build`]; programs already built are
    ///   deleted first.
    pub async fn load_all<F: SourceFetcher>(
        gpu: &G,
        sources: &ShaderSources,
        fetcher: &F,
    ) -> Result<Self> {
        let fetched = fetch_all(sources, fetcher).await?;
        debug!("Fetched {} shader source pairs", fetched.len());
        Self::build_all(gpu, fetched)
    }

    fn build_all(gpu: &G, fetched: Vec<FetchedSources>) -> Result<Self> {
        let mut programs: BTreeMap<FilterName, ShaderProgram<G>> = BTreeMap::new();
        for FetchedSources {
            filter,
            vertex,
            fragment,
        } in fetched
        {
            match ShaderProgram::build(gpu, filter, &vertex, &fragment) {
                Ok(program) => {
                    programs.insert(filter, program);
                }
                Err(err) => {
                    for program in programs.values() {
                        program.delete(gpu);
                    }
                    return Err(err);
                }
            }
        }

        info!(
            "Shader library ready: {}",
            programs
                .keys()
                .map(|filter| filter.file_stem())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self { programs })
    }

    /// The program for `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFilter`] if `filter` was not loaded.
    pub fn get(&self, filter: FilterName) -> Result<&ShaderProgram<G>> {
        self.programs
            .get(&filter)
            .ok_or_else(|| Error::UnknownFilter(filter.to_string()))
    }

    /// Whether `filter` was loaded.
    #[must_use]
    pub fn contains(&self, filter: FilterName) -> bool {
        self.programs.contains_key(&filter)
    }

    /// Loaded filters in canonical order.
    pub fn filters(&self) -> impl Iterator<Item = FilterName> + '_ {
        self.programs.keys().copied()
    }

    /// Number of loaded programs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the library holds no program.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Delete every program.
    pub fn destroy(self, gpu: &G) {
        for program in self.programs.values() {
            program.delete(gpu);
        }
    }
}

/// Fetch both stages of every filter concurrently; first failure wins.
async fn fetch_all<F: SourceFetcher>(
    sources: &ShaderSources,
    fetcher: &F,
) -> Result<Vec<FetchedSources>> {
    let pending = sources.iter().map(|(filter, pair)| async move {
        let (vertex, fragment) = futures::try_join!(
            fetch_stage(fetcher, filter, ShaderStage::Vertex, &pair.vertex),
            fetch_stage(fetcher, filter, ShaderStage::Fragment, &pair.fragment),
        )?;
        Ok::<_, Error>(FetchedSources {
            filter,
            vertex,
            fragment,
        })
    });
    futures::future::try_join_all(pending).await
}

async fn fetch_stage<F: SourceFetcher>(
    fetcher: &F,
    filter: FilterName,
    stage: ShaderStage,
    path: &str,
) -> Result<String> {
    fetcher
        .fetch(path)
        .await
        .map_err(|source| Error::ShaderLoad {
            filter,
            stage,
            path: path.to_owned(),
            source,
        })
}
