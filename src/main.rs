use std::{process, sync::Arc};

use tempora::{
    application::{
        error::AppError,
        quotes::QuoteService,
        store::{InvalidationSource, QuoteStore},
    },
    cache::{BucketStore, IndexBuilder, InvalidationSubscriber, RebuildCoordinator},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        redis::{RedisInvalidationSource, RedisQuoteStore},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    run_serve(settings).await
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = Arc::new(
        RedisQuoteStore::connect(&settings.store.url)
            .await
            .map_err(AppError::from)?,
    );
    let source: Arc<dyn InvalidationSource> = Arc::new(
        RedisInvalidationSource::new(&settings.store.url).map_err(AppError::from)?,
    );

    let cache = Arc::new(BucketStore::new());
    let builder = IndexBuilder::new(store.clone() as Arc<dyn QuoteStore>);
    let (coordinator, worker) = RebuildCoordinator::new(builder, cache.clone());

    // The cache is primed before the listener and server come up; a store
    // failure this early means the cache could never become populated.
    worker.prime().await.map_err(AppError::from)?;

    let worker_handle = tokio::spawn(worker.run());
    let subscriber = InvalidationSubscriber::start(source, coordinator.clone())
        .await
        .map_err(AppError::from)?;

    let quotes = Arc::new(QuoteService::new(
        cache,
        store.clone() as Arc<dyn QuoteStore>,
    ));
    let http_state = HttpState {
        quotes,
        store: store as Arc<dyn QuoteStore>,
    };

    let result = serve_http(&settings, http_state).await;

    subscriber.shutdown().await;
    drop(coordinator);
    worker_handle.abort();
    let _ = worker_handle.await;

    result
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(addr = %settings.server.addr, "Serving quote API");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
    }
}
