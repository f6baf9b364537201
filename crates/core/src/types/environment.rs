//! Target environments and sanitizer variants

use crate::impl_case_insensitive_enum;

/// The kind of environment a test bundle is built for and executed in.
///
/// This does not name a concrete runtime, only enough to plan the build and
/// pick a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Generic command-line WASM runtime
    #[default]
    Wasmer,
    /// JavaScript host on the command line
    Node,
    /// A browser driven over WebDriver
    DefaultBrowser,
}

impl_case_insensitive_enum!(
    "environment",
    Environment,
    Wasmer => "wasmer",
    Node => "node",
    DefaultBrowser => "defaultBrowser",
);

impl Environment {
    /// Every environment, in declaration order
    pub const ALL: [Environment; 3] = [
        Environment::Wasmer,
        Environment::Node,
        Environment::DefaultBrowser,
    ];

    /// Whether bundles for this environment run as a local process
    pub fn is_command_line(&self) -> bool {
        match self {
            Environment::Wasmer | Environment::Node => true,
            Environment::DefaultBrowser => false,
        }
    }
}

/// Instrumentation variants the builder can compile in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanitizeVariant {
    StackOverflow,
}

impl_case_insensitive_enum!(
    "sanitizer",
    SanitizeVariant,
    StackOverflow => "stackOverflow",
);
