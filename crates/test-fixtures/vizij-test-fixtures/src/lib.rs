use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "anim-graphs")]
    anim_graphs: HashMap<String, AnimGraphEntry>,
    skeletons: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnimGraphEntry {
    Path(String),
    Detailed {
        graph: String,
        #[serde(default)]
        skeleton: Option<String>,
    },
}

impl AnimGraphEntry {
    fn graph(&self) -> &str {
        match self {
            AnimGraphEntry::Path(path) => path,
            AnimGraphEntry::Detailed { graph, .. } => graph,
        }
    }

    fn skeleton(&self) -> Option<&str> {
        match self {
            AnimGraphEntry::Path(_) => None,
            AnimGraphEntry::Detailed { skeleton, .. } => skeleton.as_deref(),
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod anim_graphs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.anim_graphs.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.anim_graphs, "anim graph", name)?;
        read_to_string(entry.graph())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.anim_graphs, "anim graph", name)?;
        super::load_json(entry.graph())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.anim_graphs, "anim graph", name)?;
        Ok(resolve_path(entry.graph()))
    }

    /// Name of the skeleton fixture the graph is authored against, if any.
    pub fn skeleton_name(name: &str) -> Result<Option<String>> {
        let entry = lookup(&MANIFEST.anim_graphs, "anim graph", name)?;
        Ok(entry.skeleton().map(str::to_string))
    }

    /// Load the graph's paired skeleton fixture.
    pub fn skeleton<T: DeserializeOwned>(name: &str) -> Result<Option<T>> {
        match skeleton_name(name)? {
            Some(skeleton) => super::skeletons::load(&skeleton).map(Some),
            None => Ok(None),
        }
    }
}

pub mod skeletons {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.skeletons.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.skeletons, "skeleton", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.skeletons, "skeleton", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.skeletons, "skeleton", name)?;
        Ok(resolve_path(rel))
    }
}
