//! The JSON build manifest.
//!
//! The build system hands the generator one manifest per invocation:
//! target triple ordinals, the project folder, and a module list with
//! source/intermediate folders and definition sets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Target platform. Ordinals participate in the cache key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "PascalCase")]
pub enum Platform {
    #[default]
    Windows,
    Linux,
    Mac,
    Android,
    IOS,
    PS5,
    XboxSeries,
    Switch,
}

/// Target architecture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    X64,
    X86,
    Arm64,
}

/// Build configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "PascalCase")]
pub enum Configuration {
    Debug,
    #[default]
    Development,
    Release,
}

/// One module to scan.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModuleConfig {
    pub name: String,
    /// Folder scanned recursively for `.h` files.
    pub source_folder: PathBuf,
    /// Folder receiving the generated glue and the cache file.
    pub intermediate_folder: PathBuf,
    /// Default namespace for types that declare none.
    #[serde(default)]
    pub namespace: Option<String>,
    /// The binary module this module belongs to; a descriptor pair is
    /// emitted per binary module.
    #[serde(default)]
    pub binary_module: Option<String>,
    /// The engine-core module skips the API-definitions header.
    #[serde(default)]
    pub core_module: bool,
    #[serde(default)]
    pub public_defines: Vec<String>,
    #[serde(default)]
    pub private_defines: Vec<String>,
    #[serde(default)]
    pub build_flags: Vec<String>,
}

/// The whole manifest.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildManifest {
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub configuration: Configuration,
    /// Project root; descriptor pairs land under `Source/` here.
    pub project_folder: PathBuf,
    /// Compile-environment definitions shared by every module.
    #[serde(default)]
    pub env_defines: Vec<String>,
    pub modules: Vec<ModuleConfig>,
}

impl BuildManifest {
    pub fn load(path: &Path) -> Result<BuildManifest> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading build manifest {}", path.display()))?;
        let manifest: BuildManifest = serde_json::from_str(&text)
            .with_context(|| format!("parsing build manifest {}", path.display()))?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_with_defaults() {
        let text = r#"
{
    "projectFolder": "/game",
    "modules": [
        {
            "name": "Core",
            "sourceFolder": "/game/Source/Core",
            "intermediateFolder": "/game/Cache/Core",
            "namespace": "Game",
            "coreModule": true,
            "publicDefines": ["USE_EDITOR"]
        }
    ]
}
"#;
        let manifest: BuildManifest = serde_json::from_str(text).unwrap();
        assert_eq!(manifest.platform, Platform::Windows);
        assert_eq!(manifest.configuration, Configuration::Development);
        assert_eq!(manifest.modules.len(), 1);
        let module = &manifest.modules[0];
        assert!(module.core_module);
        assert_eq!(module.namespace.as_deref(), Some("Game"));
        assert_eq!(module.public_defines, vec!["USE_EDITOR"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = r#"{ "projectFolder": "/g", "modules": [], "typo": 1 }"#;
        assert!(serde_json::from_str::<BuildManifest>(text).is_err());
    }
}
