extern crate log;
pub mod config;
pub mod crs;
pub mod errors;
pub mod geofile;
pub mod perimeters;
pub mod publish;
use crate::config::{Config, DestinationConfig};
use crate::perimeters::download::fetch_perimeters;
use crate::perimeters::selection::{select_current_perimeters, SelectionParams};
use crate::publish::publisher::{FilePublisher, Publisher};
use crate::publish::s3_publisher::{create_runtime, create_s3_client, S3Publisher};
use chrono::NaiveDateTime;
use clap::Parser;
use std::path::PathBuf;

/// Publish the current wildfire perimeters of the US west coast as GeoJSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional config file. Built-in defaults are used for everything it does not set.
    #[arg(short, long)]
    config_filepath: Option<PathBuf>,
}

/// The storage client is built here, once per run, and handed to the publisher.
fn create_publisher(destination: &DestinationConfig) -> errors::Result<Box<dyn Publisher>> {
    Ok(match destination {
        DestinationConfig::S3 {
            bucket,
            key,
            region,
        } => {
            let runtime = create_runtime()?;
            let client = create_s3_client(&runtime, region.as_deref());
            Box::new(S3Publisher::new(runtime, client, bucket, key))
        }
        DestinationConfig::Geofile { filepath } => Box::new(FilePublisher {
            filepath: filepath.clone(),
        }),
    })
}

/// Fetch, select and publish. Nothing is published unless fetching and selecting both succeed.
fn run_pipeline(
    config: &Config,
    publisher: &dyn Publisher,
    as_of: NaiveDateTime,
) -> errors::Result<()> {
    let perimeters = fetch_perimeters(&config.source)?;

    let params = SelectionParams {
        as_of,
        n_days: config.n_days,
        bounding_box: config.bounding_box.clone(),
        deduplicate: config.deduplicate,
        output_fields: config.output_fields.clone(),
    };
    let current_perimeters = select_current_perimeters(perimeters, &params)?;

    publisher.publish(&current_perimeters)
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::try_parse()?;
    let config = match &args.config_filepath {
        Some(config_filepath) => Config::load(config_filepath)?,
        None => Config::default(),
    };
    log::debug!("{:?}", config);

    let publisher = create_publisher(&config.destination)?;
    let as_of = chrono::Local::now().naive_local();
    run_pipeline(&config, publisher.as_ref(), as_of)?;
    log::info!("Done");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
