use std::process;

use log::{error, LevelFilter};

use fishnet_raster::commands::{cli, CommandFactory, FishnetCommandFactory};
use fishnet_raster::config::FishnetConfig;
use fishnet_raster::utils::logger::Logger;

fn main() {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    let config = match matches.get_one::<String>("config") {
        Some(path) => match FishnetConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading configuration {}: {}", path, e);
                process::exit(1);
            }
        },
        None => FishnetConfig::default(),
    };

    let log_file = matches
        .get_one::<String>("log-file")
        .cloned()
        .or_else(|| config.log_file.clone());

    let logger = match &log_file {
        Some(path) => {
            if let Err(e) = Logger::init_global_logger(path, verbose) {
                eprintln!("Error setting up global logger: {}", e);
                process::exit(1);
            }
            match Logger::append(path) {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error initializing logger: {}", e);
                    process::exit(1);
                }
            }
        }
        None => {
            let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
            if verbose {
                builder.filter_level(LevelFilter::Debug);
            }
            builder.format_timestamp(None).init();
            Logger::disabled()
        }
    };

    let factory = FishnetCommandFactory::new(config);

    let command_result = factory.create_command(&matches, &logger);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
