use std::error::Error;
use std::path::PathBuf;

use dotenv::dotenv;
use log::{info, initialize_logger};
use structopt::StructOpt;

use podlib::config::get_variable;
use podlib::populate::populate;
use podlib::repository::SqliteRepository;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "populate-db",
    about = "Create the database schema and load the seed CSV files into it"
)]
struct Opt {
    /// The directory holding podcasts.csv and episodes.csv
    #[structopt(parse(from_os_str))]
    data_path: PathBuf,

    /// Delete existing rows before loading
    #[structopt(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let url = get_variable("PODLIB_DATABASE_URL");
    let repo = SqliteRepository::connect(&url).await?;

    info!(logger, "Running migrations..."; "url" => &url);
    repo.create_schema().await?;

    if opt.clear {
        info!(logger, "Clearing existing rows...");
        repo.clear().await?;
    }

    let summary = populate(&opt.data_path, &repo, &logger).await?;

    info!(
        logger,
        "Loaded {} podcasts and {} episodes", summary.podcasts, summary.episodes
    );

    Ok(())
}
