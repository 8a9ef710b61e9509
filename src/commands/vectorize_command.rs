//! Band polygonization command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::required_string;
use crate::config::DisplayOptions;
use crate::errors::FishnetResult;
use crate::raster::RasterLoader;
use crate::utils::logger::Logger;
use crate::vector::VectorUtils;

/// Polygonizes one band of a raster into a shapefile
pub struct VectorizeCommand<'a> {
    input_file: String,
    output_file: PathBuf,
    band: usize,
    threshold: f64,
    display: DisplayOptions,
    logger: &'a Logger,
}

impl<'a> VectorizeCommand<'a> {
    pub fn new(args: &ArgMatches, display: DisplayOptions, logger: &'a Logger) -> FishnetResult<Self> {
        Ok(VectorizeCommand {
            input_file: required_string(args, "input")?,
            output_file: PathBuf::from(required_string(args, "output")?),
            band: args.get_one::<usize>("band").copied().unwrap_or(1),
            threshold: args.get_one::<f64>("threshold").copied().unwrap_or(0.0),
            display,
            logger,
        })
    }
}

impl<'a> Command for VectorizeCommand<'a> {
    fn execute(&self) -> FishnetResult<()> {
        let loader = RasterLoader::default().with_display(self.display);
        let mut raster = loader.try_load(&self.input_file)?;

        let message = VectorUtils::default().raster_to_vector(&mut raster, &self.output_file, self.band, self.threshold)?;
        info!("{}", message);

        self.logger.log(&format!(
            "Vectorized band {} of {} (threshold {})",
            self.band, self.input_file, self.threshold
        ))?;
        Ok(())
    }
}
