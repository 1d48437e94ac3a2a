use std::{process, sync::Arc};

use kvedge::{
    application::{
        articles::ArticleService, error::AppError, repos::ArticlesRepo,
        revalidate::RevalidationService,
    },
    cache::{CacheAside, KvStore, MemoryKvStore},
    config::{self, CacheBackend, OriginBackend, Settings},
    infra::{
        cloudflare_kv::CloudflareKvStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        rest::RestOrigin,
        telemetry,
    },
};
use secrecy::ExposeSecret;
use tokio::{signal, sync::Notify, time::timeout};
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Warm(_) => run_warm(settings).await,
    }
}

struct ApplicationContext {
    articles: Arc<ArticleService>,
    revalidation: Arc<RevalidationService>,
    cache: CacheAside,
}

async fn build_application_context(settings: &Settings) -> Result<ApplicationContext, AppError> {
    let origin = init_origin(settings).await?;
    let cache = CacheAside::new(init_cache_store(settings)?);

    Ok(ApplicationContext {
        articles: Arc::new(ArticleService::new(origin.clone(), cache.clone())),
        revalidation: Arc::new(RevalidationService::new(
            origin,
            cache.clone(),
            settings.origin.table.clone(),
        )),
        cache,
    })
}

async fn init_origin(settings: &Settings) -> Result<Arc<dyn ArticlesRepo>, AppError> {
    match &settings.origin.backend {
        OriginBackend::Rest(rest) => {
            let origin = RestOrigin::new(
                &rest.url,
                &rest.rest_path,
                &settings.origin.table,
                rest.api_key.expose_secret(),
            )?;
            info!(url = %origin.table_url(), "using rest origin");
            Ok(Arc::new(origin))
        }
        OriginBackend::Postgres(pg) => {
            let pool = PostgresRepositories::connect(
                pg.database_url.expose_secret(),
                pg.max_connections.get(),
            )
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

            if PostgresRepositories::migrations_manage(&settings.origin.table) {
                PostgresRepositories::run_migrations(&pool)
                    .await
                    .map_err(|err| InfraError::database(err.to_string()))?;
            } else {
                info!(
                    table = %settings.origin.table,
                    "skipping migrations; table schema is managed outside kvedge"
                );
            }

            let repositories = PostgresRepositories::new(pool, &settings.origin.table)?;
            info!(table = repositories.table(), "using postgres origin");
            Ok(Arc::new(repositories))
        }
    }
}

fn init_cache_store(settings: &Settings) -> Result<Arc<dyn KvStore>, AppError> {
    match &settings.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryKvStore::new())),
        CacheBackend::Cloudflare(kv) => {
            let store = CloudflareKvStore::new(
                &kv.api_base,
                &kv.account_id,
                &kv.namespace_id,
                kv.api_token.expose_secret(),
            )?;
            info!(namespace = %kv.namespace_id, "using cloudflare kv cache");
            Ok(Arc::new(store))
        }
    }
}

async fn run_warm(settings: Settings) -> Result<(), AppError> {
    if matches!(settings.cache.backend, CacheBackend::Memory) {
        warn!("warming the in-process memory cache has no effect once this command exits");
    }

    let app = build_application_context(&settings).await?;
    let count = app.revalidation.refresh_collection().await?;
    info!(count, "article collection written to cache");
    Ok(())
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings).await?;

    if settings.cache.warm_on_startup {
        match app.revalidation.refresh_collection().await {
            Ok(count) => info!(count, "cache warmed on startup"),
            Err(err) => warn!(error = %err, "startup cache warm-up failed; serving cold"),
        }
    }

    let state = HttpState {
        articles: app.articles,
        revalidation: app.revalidation,
        cache: app.cache,
    };
    serve_http(&settings, state).await
}

async fn serve_http(settings: &Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state, settings.server.debug_routes);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(addr = %settings.server.addr, "listening");

    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown({
            let stop = stop.clone();
            async move { stop.notified().await }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.map_err(|err| InfraError::from(err).into()),
        () = shutdown_signal() => stop.notify_one(),
    }

    let grace = settings.server.graceful_shutdown;
    match timeout(grace, server).await {
        Ok(result) => result.map_err(|err| InfraError::from(err).into()),
        Err(_) => {
            warn!(
                grace_seconds = grace.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c, shutting down"),
        () = terminate => info!("received terminate signal, shutting down"),
    }
}
