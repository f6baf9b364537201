//! External command construction

pub mod builder;
pub mod tool_command;

// Re-export commonly used types
pub use builder::CommandBuilder;
pub use tool_command::ToolCommand;
