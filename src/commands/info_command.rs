//! Raster description command

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::required_string;
use crate::config::DisplayOptions;
use crate::errors::FishnetResult;
use crate::raster::RasterLoader;
use crate::utils::logger::Logger;

/// Loads a raster and prints what was found
pub struct InfoCommand<'a> {
    input_file: String,
    display: DisplayOptions,
    logger: &'a Logger,
}

impl<'a> InfoCommand<'a> {
    pub fn new(args: &ArgMatches, display: DisplayOptions, logger: &'a Logger) -> FishnetResult<Self> {
        Ok(InfoCommand {
            input_file: required_string(args, "input")?,
            display,
            logger,
        })
    }
}

impl<'a> Command for InfoCommand<'a> {
    fn execute(&self) -> FishnetResult<()> {
        let loader = RasterLoader::default().with_display(self.display);
        let raster = loader.try_load(&self.input_file)?;

        for line in raster.to_string().lines() {
            info!("{}", line);
        }

        self.logger.log(&format!(
            "Described {} ({}x{}, {} bands)",
            self.input_file, raster.width, raster.height, raster.bands_count
        ))?;
        Ok(())
    }
}
