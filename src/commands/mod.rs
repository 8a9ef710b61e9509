//! CLI command implementations
//!
//! Each subcommand of the `fishnet` binary is a [`Command`] created by
//! [`FishnetCommandFactory`].

pub mod command_traits;
pub mod diagnose_command;
pub mod info_command;
pub mod merge_command;
pub mod tile_command;
pub mod vectorize_command;

pub use command_traits::{Command, CommandFactory};
pub use diagnose_command::DiagnoseCommand;
pub use info_command::InfoCommand;
pub use merge_command::MergeCommand;
pub use tile_command::TileCommand;
pub use vectorize_command::VectorizeCommand;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command as ClapCommand};

use crate::config::FishnetConfig;
use crate::errors::{FishnetError, FishnetResult};
use crate::utils::logger::Logger;

/// A required string argument
pub(crate) fn required_string(args: &ArgMatches, name: &str) -> FishnetResult<String> {
    args.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| FishnetError::Generic(format!("Missing argument: {}", name)))
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input raster (GeoTIFF, TIFF, PNG, JPEG, ...)")
        .required(true)
        .index(1)
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .help(help)
        .value_name("PATH")
        .required(true)
}

/// The `fishnet` command line
pub fn cli() -> ClapCommand {
    ClapCommand::new("fishnet")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Split rasters into fishnet grids and export geo-referenced tiles")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write log records to this file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            ClapCommand::new("info")
                .about("Load a raster and describe it")
                .arg(input_arg()),
        )
        .subcommand(
            ClapCommand::new("tile")
                .about("Split a raster into a grid and export the tiles")
                .arg(input_arg())
                .arg(output_arg("Export directory"))
                .arg(
                    Arg::new("rows")
                        .long("rows")
                        .help("Grid rows")
                        .value_name("N")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("cols")
                        .long("cols")
                        .help("Grid columns")
                        .value_name("N")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("no-subfolders")
                        .long("no-subfolders")
                        .help("Write everything directly into the export directory")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("shp")
                        .long("shp")
                        .help("Also write the grid as a shapefile")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("as-image")
                        .long("as-image")
                        .help("Save geo-referenced tiles as PNG")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("vectorize")
                .about("Polygonize one band into a shapefile")
                .arg(input_arg())
                .arg(output_arg("Output shapefile"))
                .arg(
                    Arg::new("band")
                        .long("band")
                        .help("1-based band index")
                        .value_name("N")
                        .default_value("1")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .help("Only pixels above this value are vectorized")
                        .value_name("VALUE")
                        .default_value("0")
                        .value_parser(value_parser!(f64)),
                ),
        )
        .subcommand(
            ClapCommand::new("merge")
                .about("Merge shapefiles that share a schema")
                .arg(
                    Arg::new("inputs")
                        .help("Input shapefiles")
                        .required(true)
                        .num_args(1..)
                        .index(1),
                )
                .arg(output_arg("Merged shapefile")),
        )
        .subcommand(ClapCommand::new("diagnose").about("Print backend capabilities"))
}

/// Creates subcommands, filling unset options from the configuration
pub struct FishnetCommandFactory {
    config: FishnetConfig,
}

impl FishnetCommandFactory {
    pub fn new(config: FishnetConfig) -> Self {
        FishnetCommandFactory { config }
    }
}

impl<'a> CommandFactory<'a> for FishnetCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> FishnetResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("info", sub)) => Ok(Box::new(InfoCommand::new(sub, self.config.display, logger)?)),
            Some(("tile", sub)) => Ok(Box::new(TileCommand::new(sub, &self.config, logger)?)),
            Some(("vectorize", sub)) => Ok(Box::new(VectorizeCommand::new(sub, self.config.display, logger)?)),
            Some(("merge", sub)) => Ok(Box::new(MergeCommand::new(sub, logger)?)),
            Some(("diagnose", _)) => Ok(Box::new(DiagnoseCommand::new(logger))),
            Some((name, _)) => Err(FishnetError::Generic(format!("Unknown command: {}", name))),
            None => Err(FishnetError::Generic("No command given".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_tile_arguments_parse() {
        let matches = cli()
            .try_get_matches_from(["fishnet", "tile", "scene.tif", "-o", "out", "--rows", "3", "--cols", "4", "--shp"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        std::assert_eq!(name, "tile");
        std::assert_eq!(sub.get_one::<usize>("rows"), Some(&3));
        std::assert!(sub.get_flag("shp"));
        std::assert!(!sub.get_flag("as-image"));
    }

    #[test]
    fn test_factory_builds_each_command() {
        let logger = Logger::disabled();
        let factory = FishnetCommandFactory::new(FishnetConfig::default());
        for argv in [
            vec!["fishnet", "info", "a.tif"],
            vec!["fishnet", "tile", "a.tif", "-o", "out"],
            vec!["fishnet", "vectorize", "a.tif", "-o", "a.shp", "--threshold", "0.5"],
            vec!["fishnet", "merge", "a.shp", "b.shp", "-o", "c.shp"],
            vec!["fishnet", "--verbose", "diagnose"],
        ] {
            let matches = cli().try_get_matches_from(argv).unwrap();
            std::assert!(factory.create_command(&matches, &logger).is_ok());
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        std::assert!(cli().try_get_matches_from(["fishnet"]).is_err());
    }
}
