use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use tokio::sync::mpsc;
use warp::Filter;

use log::{info, initialize_logger, Logger};
use podlib::config::{get_variable, get_variable_or, RepositoryMode};
use podlib::environment::{Config, Environment};
use podlib::populate::populate;
use podlib::repository::{MemoryRepository, Repo, Repository, SqliteRepository};
use podlib::routes;
use podlib::sessions::SessionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("PODLIB_PORT").parse()?;
    let admin_port: u16 = get_variable("PODLIB_ADMIN_PORT").parse()?;
    let mode: RepositoryMode = get_variable_or("PODLIB_REPOSITORY", "memory").parse()?;
    let data_path = PathBuf::from(get_variable_or("PODLIB_DATA_PATH", "data"));
    let session_hours: u64 = get_variable_or("PODLIB_SESSION_HOURS", "24").parse()?;

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port, "repository" => %mode, "session_hours" => session_hours);

    let repo = open_repository(mode, &data_path, &logger).await?;
    let logger = Arc::new(logger);

    let environment = Environment::new(
        logger.clone(),
        repo,
        Arc::new(SessionStore::with_lifetime(Duration::from_secs(session_hours.saturating_mul(60 * 60)))),
        Config::default(),
    );

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            // the receiver is gone once shutdown has started
            let _ = termination_sender.send(()).await;
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let (_, main_server) = warp::serve(routes::make_routes(environment.clone()))
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            })?;

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone())
            .or(routes::admin::make_termination_route(environment.clone(), terminate));

        let (_, admin_server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            })?;

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}

/// Builds the configured repository and seeds it if it needs data.
///
/// The memory repository is always seeded. A database is seeded when it is
/// empty or when `PODLIB_REPOPULATE` is `1`, in which case it is cleared
/// first.
async fn open_repository(
    mode: RepositoryMode,
    data_path: &Path,
    logger: &Logger,
) -> Result<Arc<Repo>, Box<dyn Error>> {
    match mode {
        RepositoryMode::Memory => {
            let repo = MemoryRepository::new();
            populate(data_path, &repo, logger).await?;

            Ok(Arc::new(repo))
        }
        RepositoryMode::Database => {
            let url = get_variable("PODLIB_DATABASE_URL");
            let repo = SqliteRepository::connect(&url).await?;

            info!(logger, "Running migrations..."; "url" => &url);
            repo.create_schema().await?;

            let repopulate = get_variable_or("PODLIB_REPOPULATE", "0") == "1";

            if repopulate || repo.get_number_of_podcasts().await? == 0 {
                info!(logger, "Seeding database..."; "repopulate" => repopulate);
                repo.clear().await?;
                populate(data_path, &repo, logger).await?;
            }

            repo.close_session().await?;

            Ok(Arc::new(repo))
        }
    }
}
