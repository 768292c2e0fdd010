use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::{BuildManifest, ModuleConfig};
use crate::driver::{DriverOptions, run_build};

fn write_header(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(dir).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn manifest_for(root: &Path) -> BuildManifest {
    BuildManifest {
        project_folder: root.to_path_buf(),
        modules: vec![ModuleConfig {
            name: "Core".to_string(),
            source_folder: root.join("Source/Core"),
            intermediate_folder: root.join("Cache/Core"),
            namespace: Some("Game".to_string()),
            binary_module: Some("Game".to_string()),
            ..ModuleConfig::default()
        }],
        ..BuildManifest::default()
    }
}

const ACTOR_HEADER: &str = r#"
API_CLASS() class FLAX_API Actor : public ScriptingObject
{
public:
    API_FUNCTION() int32 GetOrder() const;
};
"#;

#[test]
fn build_emits_glue_and_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    write_header(&dir.path().join("Source/Core"), "Actor.h", ACTOR_HEADER);
    let manifest = manifest_for(dir.path());

    let results = run_build(&manifest, &DriverOptions::default()).unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.generated);
    assert!(!result.from_cache);
    assert!(result.native_path.ends_with("Core.Bindings.Gen.cpp"));
    assert!(result.managed_path.ends_with("Core.Bindings.Gen.cs"));

    let glue = fs::read_to_string(&result.native_path).unwrap();
    assert!(glue.contains("ADD_INTERNAL_CALL(\"Game.Actor::Internal_GetOrder\""));

    assert!(dir.path().join("Source/Game.Gen.h").exists());
    assert!(dir.path().join("Source/Game.Gen.cpp").exists());
}

#[test]
fn second_run_hits_the_cache_and_touch_invalidates() {
    let dir = tempfile::tempdir().unwrap();
    let header = write_header(&dir.path().join("Source/Core"), "Actor.h", ACTOR_HEADER);
    let manifest = manifest_for(dir.path());

    let first = run_build(&manifest, &DriverOptions::default()).unwrap();
    assert!(!first[0].from_cache);

    let second = run_build(&manifest, &DriverOptions::default()).unwrap();
    assert!(second[0].from_cache, "unchanged inputs should hit the cache");

    // Touch the header past the tick resolution: the next run reparses.
    let later = fs::metadata(&header).unwrap().modified().unwrap() + Duration::from_secs(2);
    let file = fs::File::options().append(true).open(&header).unwrap();
    file.set_modified(later).unwrap();
    drop(file);

    let third = run_build(&manifest, &DriverOptions::default()).unwrap();
    assert!(!third[0].from_cache, "touched header must force a reparse");
}

#[test]
fn force_skips_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_header(&dir.path().join("Source/Core"), "Actor.h", ACTOR_HEADER);
    let manifest = manifest_for(dir.path());

    run_build(&manifest, &DriverOptions::default()).unwrap();
    let forced = run_build(
        &manifest,
        &DriverOptions {
            force: true,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    assert!(!forced[0].from_cache);
}

#[test]
fn module_filter_limits_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_header(&dir.path().join("Source/Core"), "Actor.h", ACTOR_HEADER);
    let mut manifest = manifest_for(dir.path());
    manifest.modules.push(ModuleConfig {
        name: "Missing".to_string(),
        source_folder: dir.path().join("Source/DoesNotExist"),
        intermediate_folder: dir.path().join("Cache/Missing"),
        ..ModuleConfig::default()
    });

    let results = run_build(
        &manifest,
        &DriverOptions {
            module_filter: vec!["Core".to_string()],
            ..DriverOptions::default()
        },
    )
    .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].module, "Core");
}

#[test]
fn failing_module_does_not_abort_others() {
    let dir = tempfile::tempdir().unwrap();
    write_header(&dir.path().join("Source/Core"), "Actor.h", ACTOR_HEADER);
    // Mismatched closing brace: a syntax error for this module only.
    write_header(&dir.path().join("Source/Broken"), "Bad.h", "}\n");

    let mut manifest = manifest_for(dir.path());
    manifest.modules.push(ModuleConfig {
        name: "Broken".to_string(),
        source_folder: dir.path().join("Source/Broken"),
        intermediate_folder: dir.path().join("Cache/Broken"),
        ..ModuleConfig::default()
    });

    let err = run_build(&manifest, &DriverOptions::default()).unwrap_err();
    assert!(err.to_string().contains("1 module(s) failed"), "{err}");
    // The healthy module still emitted.
    assert!(
        dir.path()
            .join("Cache/Core/Core.Bindings.Gen.cpp")
            .exists()
    );
}

#[test]
fn serial_and_parallel_outputs_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Source/Core");
    write_header(&source, "Actor.h", ACTOR_HEADER);
    write_header(
        &source,
        "Vector.h",
        "API_STRUCT() struct FLAX_API Vec2\n{\n    API_FIELD() float X;\n    API_FIELD() float Y;\n};\n",
    );
    let manifest = manifest_for(dir.path());

    run_build(
        &manifest,
        &DriverOptions {
            serial: true,
            force: true,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    let serial = fs::read_to_string(dir.path().join("Cache/Core/Core.Bindings.Gen.cpp")).unwrap();

    run_build(
        &manifest,
        &DriverOptions {
            force: true,
            ..DriverOptions::default()
        },
    )
    .unwrap();
    let parallel =
        fs::read_to_string(dir.path().join("Cache/Core/Core.Bindings.Gen.cpp")).unwrap();
    assert_eq!(serial, parallel);
}
