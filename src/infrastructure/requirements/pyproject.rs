//! `pyproject.toml` requirements
//!
//! Reads `[tool.robotpy]`:
//!
//! ```toml
//! [tool.robotpy]
//! robotpy_version = "2025.1.1"
//! robotpy_extras = ["commands2"]
//! requires = ["numpy==1.26.4", "photonlibpy"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::entities::{DeclaredRequirements, PackageManifest, ANY_VERSION};
use crate::domain::ports::RequirementsSource;
use crate::error::RequirementsError;

pub const PYPROJECT_FILE: &str = "pyproject.toml";

const ROBOTPY_PACKAGE: &str = "robotpy";

#[derive(Debug, Deserialize)]
struct PyProject {
    #[serde(default)]
    tool: Option<Tools>,
}

#[derive(Debug, Deserialize)]
struct Tools {
    #[serde(default)]
    robotpy: Option<RobotPyTable>,
}

#[derive(Debug, Deserialize)]
struct RobotPyTable {
    #[serde(default)]
    robotpy_version: Option<String>,
    #[serde(default)]
    robotpy_extras: Option<OneOrMany>,
    #[serde(default)]
    requires: Option<OneOrMany>,
}

/// A list, or a single string treated as a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) if s.trim().is_empty() => Vec::new(),
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// One parsed `requires` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    /// Pinned version, or `*` when unpinned
    pub version: String,
}

fn unsupported(line: &str, reason: &str) -> RequirementsError {
    RequirementsError::Unsupported {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Parse `name`, `name==version`, or `name[extra,...]==version`.
///
/// Ranges are resolved before requirements reach the controller, so any
/// other specifier is rejected.
pub fn parse_requirement(line: &str) -> Result<Requirement, RequirementsError> {
    let text = line.split('#').next().unwrap_or("").trim();
    if text.is_empty() {
        return Err(unsupported(line, "empty requirement"));
    }
    if text.contains(';') {
        return Err(unsupported(line, "environment markers are not supported"));
    }
    if text.contains('@') {
        return Err(unsupported(line, "direct references are not supported"));
    }

    let name_end = text.find(|c: char| !is_name_char(c)).unwrap_or(text.len());
    let name = &text[..name_end];
    if name.is_empty() {
        return Err(unsupported(line, "missing package name"));
    }
    let mut rest = text[name_end..].trim_start();

    let mut extras = Vec::new();
    if let Some(after) = rest.strip_prefix('[') {
        let close = after
            .find(']')
            .ok_or_else(|| unsupported(line, "unterminated extras"))?;
        extras = after[..close]
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        rest = after[close + 1..].trim_start();
    }

    if rest.is_empty() {
        return Ok(Requirement {
            name: name.to_string(),
            extras,
            version: ANY_VERSION.to_string(),
        });
    }

    match rest.strip_prefix("==") {
        Some(version) if !version.starts_with('=') => {
            let version = version.trim();
            if version.is_empty()
                || version.contains('*')
                || version.contains(',')
                || version.contains(char::is_whitespace)
            {
                return Err(unsupported(line, "version must be a single exact pin"));
            }
            Ok(Requirement {
                name: name.to_string(),
                extras,
                version: version.to_string(),
            })
        }
        _ => Err(unsupported(
            line,
            "only exact pins (name==version) are supported",
        )),
    }
}

/// Parse the contents of a `pyproject.toml` found at `path`.
pub fn parse_pyproject(
    path: &Path,
    content: &str,
) -> Result<DeclaredRequirements, RequirementsError> {
    let doc: PyProject = toml::from_str(content).map_err(|e| RequirementsError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let table = doc
        .tool
        .and_then(|t| t.robotpy)
        .ok_or_else(|| RequirementsError::MissingSection(path.to_path_buf()))?;

    let robotpy_version = table
        .robotpy_version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RequirementsError::MissingVersion(path.to_path_buf()))?;
    let robotpy_line = format!("{}=={}", ROBOTPY_PACKAGE, robotpy_version);
    let robotpy = parse_requirement(&robotpy_line)?;

    let mut manifest = PackageManifest::new();
    manifest.insert(&robotpy.name, robotpy.version);
    let robotpy_extras = table.robotpy_extras.map(OneOrMany::into_vec).unwrap_or_default();

    let mut requirements = Vec::new();
    for line in table.requires.map(OneOrMany::into_vec).unwrap_or_default() {
        requirements.push(parse_requirement(&line)?);
    }
    for req in &requirements {
        manifest.insert(&req.name, req.version.clone());
    }

    let mut declared =
        DeclaredRequirements::new(manifest).with_extras(ROBOTPY_PACKAGE, robotpy_extras);
    for req in requirements {
        declared = declared.with_extras(&req.name, req.extras);
    }
    Ok(declared)
}

/// Reads requirements from `<project>/pyproject.toml`.
#[derive(Debug, Clone, Default)]
pub struct PyprojectRequirements {
    file_name: Option<PathBuf>,
}

impl PyprojectRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a different file, relative to the project root.
    pub fn with_file(mut self, file_name: impl Into<PathBuf>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl RequirementsSource for PyprojectRequirements {
    fn load(&self, project_root: &Path) -> Result<DeclaredRequirements, RequirementsError> {
        let path = project_root.join(
            self.file_name
                .as_deref()
                .unwrap_or_else(|| Path::new(PYPROJECT_FILE)),
        );
        if !path.is_file() {
            return Err(RequirementsError::Missing(path));
        }
        let content = fs::read_to_string(&path).map_err(|source| RequirementsError::Io {
            path: path.clone(),
            source,
        })?;
        let declared = parse_pyproject(&path, &content)?;
        tracing::debug!(
            event = "requirements.loaded",
            path = %path.display(),
            packages = declared.manifest.len()
        );
        Ok(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(content: &str) -> Result<DeclaredRequirements, RequirementsError> {
        parse_pyproject(Path::new("pyproject.toml"), content)
    }

    #[test]
    fn reads_robotpy_section() {
        let declared = parse(
            r#"
[project]
name = "robot"

[tool.robotpy]
robotpy_version = "2025.1.1"
robotpy_extras = ["commands2", "cscore"]
requires = ["numpy==1.26.4", "PhotonLibPy"]
"#,
        )
        .unwrap();

        assert_eq!(declared.manifest.get("robotpy"), Some("2025.1.1"));
        assert_eq!(declared.manifest.get("numpy"), Some("1.26.4"));
        assert_eq!(declared.manifest.get("photonlibpy"), Some("*"));
        assert_eq!(declared.manifest.len(), 3);
        assert_eq!(
            declared.install_spec("robotpy", "2025.1.1"),
            "robotpy[commands2,cscore]==2025.1.1"
        );
        assert_eq!(declared.install_spec("photonlibpy", "*"), "photonlibpy");
    }

    #[test]
    fn single_strings_are_accepted() {
        let declared = parse(
            r#"
[tool.robotpy]
robotpy_version = "2025.1.1"
robotpy_extras = "commands2"
requires = "numpy==1.26.4"
"#,
        )
        .unwrap();

        assert_eq!(declared.manifest.get("numpy"), Some("1.26.4"));
        assert_eq!(
            declared.extras.get("robotpy"),
            Some(&vec!["commands2".to_string()])
        );
    }

    #[test]
    fn missing_section_and_version_are_errors() {
        let err = parse("[project]\nname = \"robot\"\n").unwrap_err();
        assert!(matches!(err, RequirementsError::MissingSection(_)));

        let err = parse("[tool.robotpy]\nrequires = []\n").unwrap_err();
        assert!(matches!(err, RequirementsError::MissingVersion(_)));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = parse("[tool.robotpy\n").unwrap_err();
        assert!(matches!(err, RequirementsError::Parse { .. }));
    }

    #[test]
    fn ranges_are_rejected() {
        for line in ["numpy>=1.0", "numpy~=1.2", "numpy!=1.0", "numpy==1.*", "numpy===1.0"] {
            let err = parse_requirement(line).unwrap_err();
            assert!(
                matches!(err, RequirementsError::Unsupported { .. }),
                "{} should be rejected",
                line
            );
        }
    }

    #[test]
    fn requirement_forms() {
        assert_eq!(
            parse_requirement("phoenix6[wpilib] == 25.1.0 # motors").unwrap(),
            Requirement {
                name: "phoenix6".to_string(),
                extras: vec!["wpilib".to_string()],
                version: "25.1.0".to_string(),
            }
        );
        assert_eq!(parse_requirement("robotpy-rev").unwrap().version, "*");
        assert!(parse_requirement("numpy; python_version > '3.8'").is_err());
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let err = PyprojectRequirements::new().load(dir.path()).unwrap_err();
        match err {
            RequirementsError::Missing(path) => assert!(path.ends_with("pyproject.toml")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn loads_from_project_root() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.robotpy]\nrobotpy_version = \"2025.1.1\"\n",
        )
        .unwrap();

        let declared = PyprojectRequirements::new().load(dir.path()).unwrap();
        assert_eq!(declared.manifest.get("robotpy"), Some("2025.1.1"));
    }
}
