//! CLI command implementations, one module per subcommand.

mod analyze;
mod connection;
mod helpers;
mod indexes;
mod run;
mod validate;

pub use analyze::analyze;
pub use connection::test_connection;
pub use indexes::indexes;
pub use run::{run, RunArgs};
pub use validate::validate;

#[cfg(test)]
mod tests;
