//! Platform conventions for the external toolchain
//!
//! Everything that differs between a Unix `cc` toolchain and the Windows
//! `link.exe` toolchain lives here, so the stages can be exercised for
//! either convention on any host.

use crate::classify::InputKind;
use std::fmt;

/// Toolchain convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// `cc`-style compiler driver used as linker
    Unix,
    /// MSVC-style `link.exe`
    Windows,
}

impl Platform {
    /// Convention of the running host
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    /// Extension (without dot) given to compiled objects
    pub fn object_extension(&self) -> &'static str {
        match self {
            Self::Unix => "o",
            Self::Windows => "obj",
        }
    }

    /// Whether file extensions compare case-insensitively
    pub fn case_insensitive(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Whether `\` separates path segments
    pub fn backslash_separator(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Recognized input extensions and their kinds
    pub fn extension_table(&self) -> &'static [(&'static str, InputKind)] {
        match self {
            Self::Unix => &[
                ("o", InputKind::Object),
                ("a", InputKind::Object),
                ("c", InputKind::CSource),
                ("cpp", InputKind::CppSource),
                ("cxx", InputKind::CppSource),
                ("cc", InputKind::CppSource),
                ("C", InputKind::CppSource),
                ("pl", InputKind::ScriptSource),
                ("qlf", InputKind::SerializedScript),
            ],
            Self::Windows => &[
                ("obj", InputKind::Object),
                ("lib", InputKind::Library),
                ("c", InputKind::CSource),
                ("cpp", InputKind::CppSource),
                ("cxx", InputKind::CppSource),
                ("cc", InputKind::CppSource),
                ("pl", InputKind::ScriptSource),
                ("qlf", InputKind::SerializedScript),
            ],
        }
    }

    /// Default runtime executable
    pub fn default_runtime(&self) -> &'static str {
        match self {
            Self::Unix => "pl",
            Self::Windows => "plcon.exe",
        }
    }

    /// Default linker; `None` means "same as the C compiler"
    pub fn default_linker(&self) -> Option<&'static str> {
        match self {
            Self::Unix => None,
            Self::Windows => Some("link.exe"),
        }
    }

    /// Default final output name
    pub fn default_output(&self) -> &'static str {
        match self {
            Self::Unix => "a.out",
            Self::Windows => "plout.exe",
        }
    }

    /// Flag requesting debug information from compiler and linker
    pub fn debug_flag(&self) -> &'static str {
        match self {
            Self::Unix => "-g",
            Self::Windows => "/debug",
        }
    }

    /// The embedding support library, as it appears on the link line
    pub fn embedding_library(&self) -> &'static str {
        match self {
            Self::Unix => "-lpl",
            Self::Windows => "libpl.lib",
        }
    }

    /// Prefix turning a bare library name into a linker argument
    pub fn library_prefix(&self) -> &'static str {
        match self {
            Self::Unix => "-l",
            Self::Windows => "",
        }
    }

    /// Whether the architecture tag takes part in the library directory
    pub fn needs_arch(&self) -> bool {
        matches!(self, Self::Unix)
    }

    /// Library directory of the runtime installation
    pub fn runtime_library_dir(&self, base: &str, arch: &str) -> String {
        match self {
            Self::Unix => format!("{}/runtime/{}", base, arch),
            Self::Windows => format!("{}/lib", base),
        }
    }

    /// Header directory of the runtime installation
    pub fn runtime_include_dir(&self, base: &str) -> String {
        format!("{}/include", base)
    }

    /// Options every compile must carry on this platform
    pub fn required_compiler_options(&self) -> &'static [&'static str] {
        match self {
            Self::Unix => &[],
            Self::Windows => &["/MD", "/DWIN32", "/nologo"],
        }
    }

    /// Options every link must carry on this platform
    pub fn required_linker_options(&self) -> &'static [&'static str] {
        match self {
            Self::Unix => &[],
            Self::Windows => &["/nologo"],
        }
    }

    /// Extensions of linker side artifacts written next to an executable
    pub fn link_side_artifacts(&self) -> &'static [&'static str] {
        match self {
            Self::Unix => &[],
            Self::Windows => &["exp", "lib"],
        }
    }

    /// Convert `/` separators to the native form
    pub fn native_path(&self, path: &str) -> String {
        match self {
            Self::Unix => path.to_string(),
            Self::Windows => path.replace('/', "\\"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Windows => write!(f, "windows"),
        }
    }
}
