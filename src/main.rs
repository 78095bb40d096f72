use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use matchday::{
    application::{
        admin::MatchAdminService,
        catalog::CatalogService,
        error::AppError,
        ledger::LocalLedger,
        mirror::AggregateMirror,
        remote::RemoteService,
        repos::{MirrorRepo, VotesRepo},
        votes::VoteService,
    },
    cache::{CacheConfig, ResponseCache},
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, ApiState},
        remote::HttpRemoteClient,
        telemetry,
    },
};
use tokio::sync::Notify;
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
        config::Command::SyncMirror(_) => run_sync_mirror(settings).await,
        config::Command::PurgeVotes(args) => run_purge_votes(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let remote = init_remote(&settings)?;
    let app = build_application_context(repositories, remote, &settings);

    serve_http(&settings, app).await
}

async fn run_sync_mirror(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let remote = init_remote(&settings)?;
    let mirror_repo: Arc<dyn MirrorRepo> = repositories.clone();
    let mirror = AggregateMirror::new(mirror_repo, remote);

    info!(
        target = "matchday::sync_mirror",
        base_url = %settings.remote.base_url,
        "Refreshing catalog mirror"
    );

    if !mirror.refresh().await {
        return Err(AppError::unexpected(
            "catalog mirror refresh incomplete, see previous warnings",
        ));
    }

    let rows = mirror
        .row_count()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "matchday::sync_mirror", rows, "Catalog mirror refreshed");
    Ok(())
}

async fn run_purge_votes(
    settings: config::Settings,
    args: config::PurgeVotesArgs,
) -> Result<(), AppError> {
    if args.actor.is_none() && !args.all {
        return Err(AppError::validation(
            "purge-votes requires either --actor <ID> or --all",
        ));
    }
    if matches!(args.actor, Some(actor) if actor <= 0) {
        return Err(AppError::validation("--actor must be a positive id"));
    }

    let repositories = init_repositories(&settings).await?;
    let votes_repo: Arc<dyn VotesRepo> = repositories;
    let ledger = LocalLedger::new(votes_repo);

    let removed = ledger.purge(args.actor).await?;
    info!(
        target = "matchday::purge_votes",
        actor_id = ?args.actor,
        removed,
        "Local votes purged"
    );
    Ok(())
}

struct ApplicationContext {
    api_state: ApiState,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

fn init_remote(settings: &config::Settings) -> Result<Arc<dyn RemoteService>, AppError> {
    let client = HttpRemoteClient::new(&settings.remote).map_err(AppError::from)?;
    Ok(Arc::new(client))
}

fn build_application_context(
    repositories: Arc<SqliteRepositories>,
    remote: Arc<dyn RemoteService>,
    settings: &config::Settings,
) -> ApplicationContext {
    let votes_repo: Arc<dyn VotesRepo> = repositories.clone();
    let mirror_repo: Arc<dyn MirrorRepo> = repositories.clone();

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ResponseCache::new(&cache_config));
    let ledger = Arc::new(LocalLedger::new(votes_repo));
    let mirror = Arc::new(AggregateMirror::new(mirror_repo, remote.clone()));

    let votes = Arc::new(VoteService::new(
        remote.clone(),
        ledger.clone(),
        cache.clone(),
        settings.remote.check_eligibility,
        cache_config.ttl,
    ));
    let catalog = Arc::new(CatalogService::new(
        remote.clone(),
        cache.clone(),
        mirror,
        ledger,
        cache_config,
    ));
    let admin = Arc::new(MatchAdminService::new(remote.clone(), cache));

    ApplicationContext {
        api_state: ApiState {
            votes,
            catalog,
            admin,
            db: repositories,
            remote,
        },
    }
}

async fn serve_http(settings: &config::Settings, app: ApplicationContext) -> Result<(), AppError> {
    let router = http::build_router(app.api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "matchday::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = {
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.notify_one();
        }
    };
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(signal)
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(shutdown, settings.server.graceful_shutdown) => {
            warn!(
                target = "matchday::serve",
                "Graceful shutdown deadline elapsed, dropping open connections"
            );
        }
    }

    Ok(())
}

async fn drain_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "matchday::serve",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "matchday::serve", "Shutdown signal received");
}
