//! Capability report command

use log::info;

use crate::commands::command_traits::Command;
use crate::errors::FishnetResult;
use crate::raster::RasterLoader;
use crate::utils::logger::Logger;

/// Prints the backend and capability diagnostics
pub struct DiagnoseCommand<'a> {
    loader: RasterLoader,
    logger: &'a Logger,
}

impl<'a> DiagnoseCommand<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        DiagnoseCommand {
            loader: RasterLoader::default(),
            logger,
        }
    }
}

impl<'a> Command for DiagnoseCommand<'a> {
    fn execute(&self) -> FishnetResult<()> {
        let report = self.loader.diagnostic_info();
        for line in report.lines() {
            info!("{}", line);
        }
        self.logger.log(&report)?;
        Ok(())
    }
}
