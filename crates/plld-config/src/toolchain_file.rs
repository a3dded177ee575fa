//! Toolchain files (plld.toml, ~/.plld/config.toml)
//!
//! Both files share one schema. Every field is optional; a missing field
//! falls through to the next source in the hierarchy.
//!
//! ```toml
//! [toolchain]
//! cc = "gcc"
//! cxx = "g++"
//! ld = "gcc"
//! pl = "swipl"
//!
//! [options]
//! cc = ["-O2", "-Wall"]
//! ld = ["-rdynamic"]
//! pl = ["--traditional"]
//!
//! [embed]
//! goal = "main"
//! toplevel = "halt"
//! initfile = "none"
//! ```

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of a toolchain file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolchainFile {
    /// External programs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolSection>,

    /// Extra options appended to each tool's option group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OptionsSection>,

    /// Entry points saved into the program image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedSection>,
}

/// External program selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolSection {
    /// C compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,

    /// C++ compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cxx: Option<String>,

    /// Link editor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ld: Option<String>,

    /// Language runtime executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pl: Option<String>,
}

/// Per-tool option groups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OptionsSection {
    /// C and C++ compiler options
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,

    /// Linker options
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ld: Vec<String>,

    /// Runtime options for the program-image step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pl: Vec<String>,
}

/// Embedded entry points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EmbedSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub toplevel: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initfile: Option<String>,
}

impl ToolchainFile {
    /// Load a toolchain file from disk
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let file: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        file.validate()?;
        Ok(file)
    }

    /// Reject empty program names, which would otherwise shadow defaults
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(tools) = &self.toolchain {
            for (field, value) in [
                ("toolchain.cc", &tools.cc),
                ("toolchain.cxx", &tools.cxx),
                ("toolchain.ld", &tools.ld),
                ("toolchain.pl", &tools.pl),
            ] {
                if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        reason: "program name cannot be empty".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fill every field still unset here from `lower`.
    ///
    /// Option lists are not merged: a higher-priority file that names a list
    /// replaces the lower one entirely.
    pub fn fill_from(&mut self, lower: &ToolchainFile) {
        match (&mut self.toolchain, &lower.toolchain) {
            (Some(mine), Some(theirs)) => {
                fill(&mut mine.cc, &theirs.cc);
                fill(&mut mine.cxx, &theirs.cxx);
                fill(&mut mine.ld, &theirs.ld);
                fill(&mut mine.pl, &theirs.pl);
            }
            (None, Some(theirs)) => self.toolchain = Some(theirs.clone()),
            _ => {}
        }

        match (&mut self.options, &lower.options) {
            (Some(mine), Some(theirs)) => {
                if mine.cc.is_empty() {
                    mine.cc = theirs.cc.clone();
                }
                if mine.ld.is_empty() {
                    mine.ld = theirs.ld.clone();
                }
                if mine.pl.is_empty() {
                    mine.pl = theirs.pl.clone();
                }
            }
            (None, Some(theirs)) => self.options = Some(theirs.clone()),
            _ => {}
        }

        match (&mut self.embed, &lower.embed) {
            (Some(mine), Some(theirs)) => {
                fill(&mut mine.goal, &theirs.goal);
                fill(&mut mine.toplevel, &theirs.toplevel);
                fill(&mut mine.initfile, &theirs.initfile);
            }
            (None, Some(theirs)) => self.embed = Some(theirs.clone()),
            _ => {}
        }
    }

    pub fn compiler(&self) -> Option<&str> {
        self.toolchain.as_ref().and_then(|t| t.cc.as_deref())
    }

    pub fn cxx_compiler(&self) -> Option<&str> {
        self.toolchain.as_ref().and_then(|t| t.cxx.as_deref())
    }

    pub fn linker(&self) -> Option<&str> {
        self.toolchain.as_ref().and_then(|t| t.ld.as_deref())
    }

    pub fn runtime(&self) -> Option<&str> {
        self.toolchain.as_ref().and_then(|t| t.pl.as_deref())
    }

    pub fn compiler_options(&self) -> &[String] {
        self.options.as_ref().map(|o| o.cc.as_slice()).unwrap_or(&[])
    }

    pub fn linker_options(&self) -> &[String] {
        self.options.as_ref().map(|o| o.ld.as_slice()).unwrap_or(&[])
    }

    pub fn runtime_options(&self) -> &[String] {
        self.options.as_ref().map(|o| o.pl.as_slice()).unwrap_or(&[])
    }

    pub fn goal(&self) -> Option<&str> {
        self.embed.as_ref().and_then(|e| e.goal.as_deref())
    }

    pub fn toplevel(&self) -> Option<&str> {
        self.embed.as_ref().and_then(|e| e.toplevel.as_deref())
    }

    pub fn initfile(&self) -> Option<&str> {
        self.embed.as_ref().and_then(|e| e.initfile.as_deref())
    }

    /// Mutable access to the program section, creating it on demand
    pub fn toolchain_mut(&mut self) -> &mut ToolSection {
        self.toolchain.get_or_insert_with(ToolSection::default)
    }
}

fn fill(slot: &mut Option<String>, lower: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(lower);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_file() {
        let file: ToolchainFile = toml::from_str("").unwrap();
        assert_eq!(file, ToolchainFile::default());
        assert!(file.compiler().is_none());
        assert!(file.compiler_options().is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let toml = r#"
[toolchain]
cc = "gcc"
cxx = "g++"
ld = "gcc"
pl = "swipl"

[options]
cc = ["-O2"]
ld = ["-rdynamic"]
pl = ["--traditional"]

[embed]
goal = "main"
toplevel = "halt"
initfile = "none"
"#;
        let file: ToolchainFile = toml::from_str(toml).unwrap();
        assert_eq!(file.compiler(), Some("gcc"));
        assert_eq!(file.cxx_compiler(), Some("g++"));
        assert_eq!(file.linker(), Some("gcc"));
        assert_eq!(file.runtime(), Some("swipl"));
        assert_eq!(file.compiler_options(), ["-O2".to_string()]);
        assert_eq!(file.linker_options(), ["-rdynamic".to_string()]);
        assert_eq!(file.runtime_options(), ["--traditional".to_string()]);
        assert_eq!(file.goal(), Some("main"));
        assert_eq!(file.toplevel(), Some("halt"));
        assert_eq!(file.initfile(), Some("none"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ToolchainFile, _> = toml::from_str("[toolchain]\nfortran = \"f77\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_program_rejected() {
        let file: ToolchainFile = toml::from_str("[toolchain]\ncc = \"  \"\n").unwrap();
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "toolchain.cc"
        ));
    }

    #[test]
    fn test_fill_from_keeps_higher_priority() {
        let mut project: ToolchainFile = toml::from_str(
            "[toolchain]\ncc = \"clang\"\n[embed]\ngoal = \"main\"\n",
        )
        .unwrap();
        let global: ToolchainFile = toml::from_str(
            "[toolchain]\ncc = \"gcc\"\npl = \"swipl\"\n[options]\nld = [\"-s\"]\n[embed]\ngoal = \"go\"\ntoplevel = \"halt\"\n",
        )
        .unwrap();

        project.fill_from(&global);

        assert_eq!(project.compiler(), Some("clang"));
        assert_eq!(project.runtime(), Some("swipl"));
        assert_eq!(project.linker_options(), ["-s".to_string()]);
        assert_eq!(project.goal(), Some("main"));
        assert_eq!(project.toplevel(), Some("halt"));
    }
}
