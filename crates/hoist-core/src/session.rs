//! Compilation sessions.
//!
//! A manifest lists compilation units, each with its source documents and
//! dependencies. A dependency without a version names another unit of the
//! manifest; one with a version is an external library, unless a unit with
//! that name and version exists.
//!
//! ```yaml
//! units:
//!   - name: app
//!     version: "1.0"
//!     sources: [app/Main.yaml]
//!     dependencies:
//!       - name: core
//!       - name: stdlib
//!         version: "1.9"
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read manifest `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("dependency cycle: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },
    #[error("`{name}` matches more than one unit: {}", candidates.join(", "))]
    AmbiguousTarget {
        name: String,
        candidates: Vec<String>,
    },
    #[error("no unit named `{name}`")]
    UnknownUnit { name: String },
    #[error("unit `{unit}` depends on unknown unit `{dependency}`")]
    UnknownDependency { unit: String, dependency: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    /// Directory source paths are relative to.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

impl UnitSpec {
    /// `name@version`.
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DependencySpec {
    pub fn new(name: impl Into<String>, version: Option<&str>) -> Self {
        DependencySpec {
            name: name.into(),
            version: version.map(str::to_string),
        }
    }
}

/// Merged dependency lists, keyed by unit index.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    merged: FxHashMap<usize, Vec<DependencySpec>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }
}

impl Manifest {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut manifest = Self::from_yaml(&text)?;
        manifest.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    /// Finds the single unit matching `target`, either a bare name or
    /// `name@version`.
    pub fn find_target(&self, target: &str) -> Result<&UnitSpec> {
        let (name, version) = match target.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (target, None),
        };
        let index = self
            .lookup(name, version)?
            .ok_or_else(|| SessionError::UnknownUnit {
                name: target.to_string(),
            })?;
        Ok(&self.units[index])
    }

    /// Source documents of `unit`, resolved against the manifest directory.
    pub fn source_paths(&self, unit: &UnitSpec) -> Vec<PathBuf> {
        unit.sources.iter().map(|s| self.root.join(s)).collect()
    }

    /// Every unit, each after the units it depends on. Units without a
    /// dependency relation keep manifest order.
    pub fn build_order(&self) -> Result<Vec<&UnitSpec>> {
        let mut order = Vec::with_capacity(self.units.len());
        let mut done = FxHashSet::default();
        let mut stack = Vec::new();
        for index in 0..self.units.len() {
            self.visit(index, &mut done, &mut stack, &mut order)?;
        }
        Ok(order.into_iter().map(|i| &self.units[i]).collect())
    }

    fn visit(
        &self,
        index: usize,
        done: &mut FxHashSet<usize>,
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<()> {
        if done.contains(&index) {
            return Ok(());
        }
        if stack.contains(&index) {
            return Err(self.cycle(stack, index));
        }
        stack.push(index);
        for dependency in self.unit_dependencies(index)? {
            self.visit(dependency, done, stack, order)?;
        }
        stack.pop();
        done.insert(index);
        order.push(index);
        Ok(())
    }

    /// Transitive dependencies of `unit`: its own list first, then the merged
    /// lists of the units it depends on, in declaration order. When the same
    /// name appears twice the first occurrence wins.
    pub fn merged_dependencies(
        &self,
        unit: &UnitSpec,
        cache: &mut ResolutionCache,
    ) -> Result<Vec<DependencySpec>> {
        let index = self
            .units
            .iter()
            .position(|u| u == unit)
            .ok_or_else(|| SessionError::UnknownUnit { name: unit.id() })?;
        self.merge(index, cache, &mut Vec::new())
    }

    fn merge(
        &self,
        index: usize,
        cache: &mut ResolutionCache,
        stack: &mut Vec<usize>,
    ) -> Result<Vec<DependencySpec>> {
        if let Some(merged) = cache.merged.get(&index) {
            return Ok(merged.clone());
        }
        if stack.contains(&index) {
            return Err(self.cycle(stack, index));
        }
        stack.push(index);

        let unit = &self.units[index];
        let mut merged: Vec<DependencySpec> = Vec::new();
        let mut seen: FxHashMap<String, usize> = FxHashMap::default();
        let mut add = |dependency: DependencySpec, merged: &mut Vec<DependencySpec>| {
            match seen.get(&dependency.name) {
                Some(&at) => {
                    let kept = &merged[at];
                    if kept.version != dependency.version && dependency.version.is_some() {
                        warn!(
                            unit = %unit.name,
                            dependency = %dependency.name,
                            kept = kept.version.as_deref().unwrap_or("-"),
                            ignored = dependency.version.as_deref().unwrap_or("-"),
                            "conflicting dependency versions, keeping the first"
                        );
                    }
                }
                None => {
                    seen.insert(dependency.name.clone(), merged.len());
                    merged.push(dependency);
                }
            }
        };

        for dependency in &unit.dependencies {
            add(dependency.clone(), &mut merged);
        }
        for dependency in self.unit_dependencies(index)? {
            for transitive in self.merge(dependency, cache, stack)? {
                add(transitive, &mut merged);
            }
        }

        stack.pop();
        debug!(unit = %unit.name, dependencies = merged.len(), "merged dependencies");
        cache.merged.insert(index, merged.clone());
        Ok(merged)
    }

    fn cycle(&self, stack: &[usize], index: usize) -> SessionError {
        let start = stack.iter().position(|&i| i == index).unwrap_or(0);
        let path = stack[start..]
            .iter()
            .chain(std::iter::once(&index))
            .map(|&i| self.units[i].name.clone())
            .collect();
        SessionError::DependencyCycle { path }
    }

    /// Indices of the units `index` depends on, in declaration order.
    fn unit_dependencies(&self, index: usize) -> Result<Vec<usize>> {
        let unit = &self.units[index];
        let mut out = Vec::new();
        for dependency in &unit.dependencies {
            match self.lookup(&dependency.name, dependency.version.as_deref())? {
                Some(found) => out.push(found),
                None if dependency.version.is_none() => {
                    return Err(SessionError::UnknownDependency {
                        unit: unit.name.clone(),
                        dependency: dependency.name.clone(),
                    });
                }
                // External library.
                None => {}
            }
        }
        Ok(out)
    }

    fn lookup(&self, name: &str, version: Option<&str>) -> Result<Option<usize>> {
        let matches: Vec<usize> = self
            .units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.name == name && version.map_or(true, |v| u.version == v))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            _ => Err(SessionError::AmbiguousTarget {
                name: name.to_string(),
                candidates: matches.iter().map(|&i| self.units[i].id()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
units:
  - name: app
    version: "1.0"
    dependencies:
      - name: net
      - name: core
      - name: json
        version: "2.0"
  - name: net
    version: "1.0"
    dependencies:
      - name: core
      - name: json
        version: "1.5"
      - name: tls
        version: "0.3"
  - name: core
    version: "1.0"
    dependencies:
      - name: stdlib
        version: "1.9"
"#;

    fn names(units: &[&UnitSpec]) -> Vec<String> {
        units.iter().map(|u| u.name.clone()).collect()
    }

    #[test]
    fn test_build_order_puts_dependencies_first() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let order = manifest.build_order().unwrap();
        assert_eq!(names(&order), vec!["core", "net", "app"]);
    }

    #[test]
    fn test_merged_dependencies_first_wins() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let app = manifest.find_target("app").unwrap();
        let mut cache = ResolutionCache::new();
        let merged = manifest.merged_dependencies(app, &mut cache).unwrap();
        assert_eq!(
            merged,
            vec![
                DependencySpec::new("net", None),
                DependencySpec::new("core", None),
                DependencySpec::new("json", Some("2.0")),
                DependencySpec::new("tls", Some("0.3")),
                DependencySpec::new("stdlib", Some("1.9")),
            ]
        );
        // app, net and core are memoized.
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_cycle_reported_with_path() {
        let manifest = Manifest::from_yaml(
            r#"
units:
  - { name: a, version: "1", dependencies: [{ name: b }] }
  - { name: b, version: "1", dependencies: [{ name: c }] }
  - { name: c, version: "1", dependencies: [{ name: a }] }
"#,
        )
        .unwrap();
        let err = manifest.build_order().unwrap_err();
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> c -> a");
    }

    #[test]
    fn test_find_target_disambiguates_by_version() {
        let manifest = Manifest::from_yaml(
            r#"
units:
  - { name: core, version: "1.0" }
  - { name: core, version: "2.0" }
"#,
        )
        .unwrap();
        let err = manifest.find_target("core").unwrap_err();
        assert!(matches!(
            err,
            SessionError::AmbiguousTarget { ref candidates, .. }
                if *candidates == vec!["core@1.0".to_string(), "core@2.0".to_string()]
        ));
        assert_eq!(manifest.find_target("core@2.0").unwrap().version, "2.0");
        assert!(matches!(
            manifest.find_target("web"),
            Err(SessionError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn test_unknown_unit_dependency() {
        let manifest = Manifest::from_yaml(
            r#"
units:
  - { name: app, version: "1", dependencies: [{ name: missing }] }
"#,
        )
        .unwrap();
        let err = manifest.build_order().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unit `app` depends on unknown unit `missing`"
        );
    }
}
