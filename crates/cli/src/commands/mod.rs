pub mod init;
pub mod test;

pub use init::init_command;
pub use test::{TestOptions, test_command};
