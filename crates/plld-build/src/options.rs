//! Per-tool option groups and pipeline mode switches

use crate::arglist::ArgList;

/// Options accumulated from the command line, config files and the runtime
/// query, consumed by the compile, link and bundle stages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Options for the C compiler
    pub c_options: ArgList,
    /// Options for the C++ compiler
    pub cpp_options: ArgList,
    /// Options for the linker, placed before the objects
    pub ld_options: ArgList,
    /// Options for the runtime when saving the program image
    pub pl_options: ArgList,
    /// Header search directories (without `-I`)
    pub include_dirs: ArgList,
    /// Library search directories (without `-L`)
    pub lib_dirs: ArgList,
    /// Libraries (without `-l`), linked after the embedding library
    pub libs: ArgList,
    /// Libraries that must come last on the link line
    pub last_libs: ArgList,

    /// Echo every step
    pub verbose: bool,
    /// Echo only, run nothing but the runtime query
    pub dry_run: bool,
    /// Stop after compiling
    pub compile_only: bool,
    /// Link the final output directly, without a program image
    pub no_state: bool,
    /// Request debug information from compiler and linker
    pub debug: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token to both the C and the C++ option group
    pub fn add_compiler_option(&mut self, option: impl Into<String>) {
        let option = option.into();
        self.c_options.append(option.clone());
        self.cpp_options.append(option);
    }

    /// Add the fields of a separator-delimited spec to both compiler groups
    pub fn add_compiler_options(&mut self, spec: &str) {
        self.c_options.extend_separated(spec);
        self.cpp_options.extend_separated(spec);
    }

    /// Add whitespace-separated library words, dropping any `-l` prefix
    pub fn add_library_words(&mut self, text: &str) {
        for word in text.split_ascii_whitespace() {
            let name = match word.strip_prefix("-l") {
                Some(rest) if !rest.is_empty() => rest,
                _ => word,
            };
            self.libs.append(name);
        }
    }

    /// Whether a link stage follows compilation
    pub fn links(&self) -> bool {
        !self.compile_only
    }

    /// Whether a bundle stage follows linking
    pub fn bundles(&self) -> bool {
        !self.compile_only && !self.no_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compiler_options_reach_both_languages() {
        let mut options = BuildOptions::new();
        options.add_compiler_option("-DDEBUG");
        options.add_compiler_options(",-O2,-Wall");
        let expected: ArgList = ["-DDEBUG", "-O2", "-Wall"].into_iter().collect();
        assert_eq!(options.c_options, expected);
        assert_eq!(options.cpp_options, expected);
    }

    #[test]
    fn test_library_words_strip_prefix() {
        let mut options = BuildOptions::new();
        options.add_library_words("  -lm -ldl\treadline -l ");
        let expected: ArgList = ["m", "dl", "readline", "-l"].into_iter().collect();
        assert_eq!(options.libs, expected);
    }

    #[test]
    fn test_stage_selection() {
        let mut options = BuildOptions::new();
        assert!(options.links() && options.bundles());

        options.no_state = true;
        assert!(options.links() && !options.bundles());

        options.compile_only = true;
        assert!(!options.links() && !options.bundles());
    }
}
