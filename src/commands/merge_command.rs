//! Shapefile merge command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::required_string;
use crate::errors::{FishnetError, FishnetResult};
use crate::utils::logger::Logger;
use crate::vector::VectorUtils;

/// Concatenates polygon files sharing one schema
pub struct MergeCommand<'a> {
    inputs: Vec<PathBuf>,
    output_file: PathBuf,
    logger: &'a Logger,
}

impl<'a> MergeCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> FishnetResult<Self> {
        let inputs: Vec<PathBuf> = args
            .get_many::<String>("inputs")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default();
        if inputs.is_empty() {
            return Err(FishnetError::Generic("Missing input shapefiles".to_string()));
        }

        Ok(MergeCommand {
            inputs,
            output_file: PathBuf::from(required_string(args, "output")?),
            logger,
        })
    }
}

impl<'a> Command for MergeCommand<'a> {
    fn execute(&self) -> FishnetResult<()> {
        let message = VectorUtils::default().merge_vector_files(&self.inputs, &self.output_file)?;
        info!("{}", message);
        self.logger.log(&format!("Merged {} files into {}", self.inputs.len(), self.output_file.display()))?;
        Ok(())
    }
}
