use std::{process, sync::Arc};

use quaderno::{
    application::{
        error::AppError,
        reviews::ReviewLibrary,
        site::{SiteService, SiteSources},
    },
    cache::{
        CacheConfig, FixtureStore, FsStore, RedisStore, RevalidatingCache, Store, SystemClock,
    },
    config::{self, StoreSelection},
    infra::{
        assets::AssetDirectory,
        error::InfraError,
        http::{self, HttpState},
        notion::{NotionClient, NotionConfig},
        relocate::{ImageRelocator, RelocatorConfig},
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn open_store(selection: StoreSelection) -> Result<Arc<dyn Store>, InfraError> {
    let store: Arc<dyn Store> = match selection {
        StoreSelection::Redis { url } => Arc::new(RedisStore::connect(&url).await?),
        StoreSelection::Filesystem { directory } => Arc::new(FsStore::open(directory).await?),
        StoreSelection::Fixture { directory } => Arc::new(FixtureStore::load(&directory).await?),
    };
    Ok(store)
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let dev = settings.environment.dev;
    let store = open_store(settings.store_selection()).await?;
    info!(
        target = "quaderno::bootstrap",
        store = store.name(),
        dev,
        "Cache store ready"
    );

    let origin = NotionClient::new(NotionConfig::from(&settings.notion))?;
    let relocator = ImageRelocator::new(RelocatorConfig::from_settings(&settings.assets, dev))?;
    let cache = RevalidatingCache::new(
        store,
        Arc::new(origin),
        Arc::new(relocator),
        Arc::new(SystemClock),
        CacheConfig::from(&settings.cache),
    );

    let state = HttpState {
        site: SiteService::new(cache, SiteSources::from(&settings.notion)),
        reviews: ReviewLibrary::new(settings.reviews.directory.clone()),
        assets: dev.then(|| AssetDirectory::new(settings.assets.directory.clone())),
    };

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "quaderno::bootstrap",
        addr = %settings.server.addr,
        "Listening"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_result(joined),
        () = shutdown_signal() => {}
    }

    info!(target = "quaderno::bootstrap", "Shutdown requested; draining connections");
    let _ = stop_tx.send(());
    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(joined) => server_result(joined),
        Err(_) => {
            warn!(
                target = "quaderno::bootstrap",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

fn server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "quaderno::bootstrap",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
