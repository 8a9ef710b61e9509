//! Command pattern interfaces
//!
//! Each CLI subcommand is a [`Command`] built by a [`CommandFactory`] from
//! the parsed arguments.

use crate::errors::FishnetResult;
use crate::utils::logger::Logger;

/// An executable CLI operation
pub trait Command {
    /// Execute the command
    fn execute(&self) -> FishnetResult<()>;
}

/// Builds the command selected by the CLI arguments
pub trait CommandFactory<'a> {
    /// Create the command for `args`
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger recording what the command did
    fn create_command(&self, args: &clap::ArgMatches, logger: &'a Logger) -> FishnetResult<Box<dyn Command + 'a>>;
}
