//! Grid tiling and export command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::required_string;
use crate::config::{DisplayOptions, ExportOptions, FishnetConfig};
use crate::errors::FishnetResult;
use crate::fishnet::FishnetSegmentation;
use crate::raster::RasterLoader;
use crate::utils::logger::Logger;
use crate::vector::VectorUtils;

/// Loads a raster, splits it into a grid and exports the tiles
pub struct TileCommand<'a> {
    input_file: String,
    output_dir: PathBuf,
    rows: usize,
    cols: usize,
    display: DisplayOptions,
    options: ExportOptions,
    logger: &'a Logger,
}

impl<'a> TileCommand<'a> {
    /// Command-line values override the configuration
    pub fn new(args: &ArgMatches, config: &FishnetConfig, logger: &'a Logger) -> FishnetResult<Self> {
        let mut options = config.export;
        if args.get_flag("no-subfolders") {
            options.create_subfolders = false;
        }
        if args.get_flag("shp") {
            options.export_shp = true;
        }
        if args.get_flag("as-image") {
            options.export_as_image = true;
        }

        Ok(TileCommand {
            input_file: required_string(args, "input")?,
            output_dir: PathBuf::from(required_string(args, "output")?),
            rows: args.get_one::<usize>("rows").copied().unwrap_or(config.rows),
            cols: args.get_one::<usize>("cols").copied().unwrap_or(config.cols),
            display: config.display,
            options,
            logger,
        })
    }
}

impl<'a> Command for TileCommand<'a> {
    fn execute(&self) -> FishnetResult<()> {
        let loader = RasterLoader::default().with_display(self.display);
        let mut segmentation = FishnetSegmentation::new(loader, VectorUtils::default());

        let image = segmentation.load_image(&self.input_file)?;
        info!("Loaded {}: {}", self.input_file, image);

        let params = segmentation.set_grid_parameters((self.rows, self.cols))?;
        info!("Grid: {}", params);

        let tiles = segmentation.generate_grid()?.len();
        info!("Generated {} tiles", tiles);

        let summary = segmentation.export_result(&self.output_dir, &self.options)?;
        info!("Wrote {} files to {}", summary.files_count, summary.save_dir.display());
        if let Some(warning) = segmentation.last_error() {
            info!("Last warning: {}", warning);
        }

        self.logger.log(&format!(
            "Tiled {} into {} tiles; {} files in {}",
            self.input_file, tiles, summary.files_count, summary.save_dir.display()
        ))?;
        Ok(())
    }
}
