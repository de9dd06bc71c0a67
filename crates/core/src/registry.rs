use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::scene::{Scene, SceneDefinition, SceneId};
use crate::errors::{SceneDefinitionError, SceneLoadError};

/// One scene-definition document: a JSON object keyed by scene id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneSource {
    File(PathBuf),
    Inline { origin: String, contents: String },
}

impl SceneSource {
    pub fn inline(origin: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::Inline { origin: origin.into(), contents: contents.into() }
    }

    pub fn origin(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { origin, .. } => origin.clone(),
        }
    }

    fn read(&self) -> Result<String, SceneLoadError> {
        match self {
            Self::File(path) => fs::read_to_string(path)
                .map_err(|source| SceneLoadError::ReadFile { path: path.clone(), source }),
            Self::Inline { contents, .. } => Ok(contents.clone()),
        }
    }
}

/// Read-only scene lookup, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct SceneRegistry {
    scenes: Vec<Scene>,
    index: HashMap<SceneId, usize>,
}

#[derive(Debug, Default)]
pub struct RegistryLoad {
    pub registry: SceneRegistry,
    pub skipped: Vec<SceneLoadError>,
}

impl SceneRegistry {
    pub fn load<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = SceneSource>,
    {
        Self::load_with_report(sources).registry
    }

    /// Merges sources in iteration order. The first definition of a scene id wins; broken
    /// sources and broken entries are skipped and reported.
    pub fn load_with_report<I>(sources: I) -> RegistryLoad
    where
        I: IntoIterator<Item = SceneSource>,
    {
        let mut registry = SceneRegistry::default();
        let mut skipped = Vec::new();

        for source in sources {
            let origin = source.origin();
            match registry.merge_source(&source, &mut skipped) {
                Ok(added) => debug!(
                    event_name = "scenes.source_loaded",
                    origin = %origin,
                    added,
                    "scene source merged"
                ),
                Err(error) => {
                    warn!(
                        event_name = "scenes.source_skipped",
                        origin = %origin,
                        error = %error,
                        "skipping unreadable scene source"
                    );
                    skipped.push(error);
                }
            }
        }

        info!(
            event_name = "scenes.registry_loaded",
            scene_count = registry.len(),
            skipped_count = skipped.len(),
            "scene registry loaded"
        );
        RegistryLoad { registry, skipped }
    }

    /// Loads every `*.json` file below `dir`, in sorted path order.
    pub fn load_dir(dir: &Path) -> RegistryLoad {
        let mut skipped = Vec::new();
        let sources = discover(dir, &mut skipped);
        let mut load = Self::load_with_report(sources);
        skipped.append(&mut load.skipped);
        load.skipped = skipped;
        load
    }

    fn merge_source(
        &mut self,
        source: &SceneSource,
        skipped: &mut Vec<SceneLoadError>,
    ) -> Result<usize, SceneLoadError> {
        let origin = source.origin();
        let raw = source.read()?;
        let document = serde_json::from_str::<Value>(&raw)
            .map_err(|error| SceneLoadError::ParseJson { origin: origin.clone(), source: error })?;
        let Value::Object(entries) = document else {
            return Err(SceneLoadError::NotAnObject { origin });
        };

        let mut added = 0;
        for (key, value) in entries {
            let id = SceneId(key);
            if self.index.contains_key(&id) {
                debug!(
                    event_name = "scenes.duplicate_ignored",
                    origin = %origin,
                    scene_id = %id,
                    "scene already defined by an earlier source"
                );
                continue;
            }

            let scene = serde_json::from_value::<SceneDefinition>(value)
                .map_err(|error| SceneDefinitionError::Malformed(error.to_string()))
                .and_then(|definition| Scene::from_definition(id.clone(), definition));
            match scene {
                Ok(scene) => {
                    self.index.insert(id, self.scenes.len());
                    self.scenes.push(scene);
                    added += 1;
                }
                Err(source) => {
                    let error = SceneLoadError::InvalidDefinition {
                        origin: origin.clone(),
                        scene_id: id.0,
                        source,
                    };
                    warn!(
                        event_name = "scenes.definition_skipped",
                        error = %error,
                        "skipping invalid scene definition"
                    );
                    skipped.push(error);
                }
            }
        }
        Ok(added)
    }

    pub fn get(&self, id: &SceneId) -> Option<&Scene> {
        self.index.get(id).map(|position| &self.scenes[*position])
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.index.contains_key(id)
    }

    /// Scenes in load order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

fn discover(dir: &Path, skipped: &mut Vec<SceneLoadError>) -> Vec<SceneSource> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        match entry {
            Ok(entry) => {
                let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
                if entry.file_type().is_file() && is_json {
                    paths.push(entry.path().to_path_buf());
                }
            }
            Err(error) => {
                let error =
                    SceneLoadError::Discovery { path: dir.to_path_buf(), message: error.to_string() };
                warn!(event_name = "scenes.discovery_failed", error = %error, "scene discovery error");
                skipped.push(error);
            }
        }
    }

    paths.sort();
    paths.into_iter().map(SceneSource::File).collect()
}
