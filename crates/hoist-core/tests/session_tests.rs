use hoist_core::session::{DependencySpec, Manifest, ResolutionCache};
use hoist_core::{DefaultInterop, Lowerer, LoweringConfig, Program, SessionError};
use hoist_test_helpers::fixtures::{COMPANION_COUNTER, STANDALONE_SINGLETON};
use indoc::indoc;
use std::fs;
use tempfile::TempDir;

const MANIFEST: &str = indoc! {r#"
    units:
      - name: app
        version: "2.0"
        sources: [app/Counter.yaml]
        dependencies:
          - name: registry
          - name: logging
            version: "1.2"
      - name: registry
        version: "1.0"
        sources: [registry/Registry.yaml]
        dependencies:
          - name: logging
            version: "1.1"
          - name: collections
            version: "0.4"
"#};

fn workspace() -> (TempDir, Manifest) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::create_dir_all(dir.path().join("registry")).unwrap();
    fs::write(dir.path().join("app/Counter.yaml"), COMPANION_COUNTER).unwrap();
    fs::write(dir.path().join("registry/Registry.yaml"), STANDALONE_SINGLETON).unwrap();
    let manifest_path = dir.path().join("hoist-session.yaml");
    fs::write(&manifest_path, MANIFEST).unwrap();
    let manifest = Manifest::load(&manifest_path).unwrap();
    (dir, manifest)
}

#[test]
fn test_units_lowered_in_build_order() {
    let (_dir, manifest) = workspace();
    let order = manifest.build_order().unwrap();
    let names: Vec<&str> = order.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["registry", "app"]);

    let config = LoweringConfig::default();
    let interop = DefaultInterop::new(&config);
    let lowerer = Lowerer::new(&config, &interop);
    let mut lowered = Vec::new();
    for unit in order {
        let mut programs: Vec<Program> = manifest
            .source_paths(unit)
            .iter()
            .map(|path| Program::load(path).unwrap())
            .collect();
        for report in lowerer.lower_all(&mut programs).unwrap() {
            lowered.push(report.program);
        }
    }
    assert_eq!(lowered, vec!["Registry.kt", "Counter.kt"]);
}

#[test]
fn test_merged_dependencies_keep_first_version() {
    let (_dir, manifest) = workspace();
    let app = manifest.find_target("app@2.0").unwrap();
    let mut cache = ResolutionCache::new();

    let merged = manifest.merged_dependencies(app, &mut cache).unwrap();
    assert_eq!(
        merged,
        vec![
            DependencySpec::new("registry", None),
            DependencySpec::new("logging", Some("1.2")),
            DependencySpec::new("collections", Some("0.4")),
        ]
    );

    // A second query is served from the cache.
    let cached = cache.len();
    let again = manifest.merged_dependencies(app, &mut cache).unwrap();
    assert_eq!(again, merged);
    assert_eq!(cache.len(), cached);
}

#[test]
fn test_missing_manifest_reported() {
    let dir = TempDir::new().unwrap();
    let err = Manifest::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, SessionError::Io { .. }));
}
