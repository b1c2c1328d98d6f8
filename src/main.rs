use std::{process, sync::Arc};

use plaqueboard::{
    application::{
        collaborators::Notifier,
        diagnostics::DiagnosticsService,
        error::AppError,
        export::ExportService,
        moderation::{ModerationDeps, ModerationOptions, ModerationService},
        selection::{SelectionOptions, SelectionService},
        syndication::{FeedOptions, SyndicationService},
    },
    cache::{CacheConfig, DerivedCache},
    config,
    domain::types::ExportDetail,
    infra::{
        blobs::FilesystemBlobStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        notifier::{LogNotifier, WebhookNotifier},
        telemetry,
    },
};
use tokio::try_join;
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Reindex(_) => run_reindex(settings).await,
        config::Command::Backfill(_) => run_backfill(settings).await,
        config::Command::Export(args) => run_export(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    info!(
        target: "plaqueboard::serve",
        plaqueset = %settings.site.plaqueset,
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        cache_enabled = settings.cache.enabled,
        "Starting listeners"
    );

    serve_http(&settings, app.http_state).await
}

async fn run_reindex(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let report = app.moderation.reindex_all().await?;
    info!(
        target: "plaqueboard::reindex",
        good = report.good,
        failed = report.failed,
        put = report.put,
        "Reindex completed"
    );
    Ok(())
}

async fn run_backfill(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let report = app.moderation.backfill().await?;
    info!(
        target: "plaqueboard::backfill",
        updated_on = report.updated_on,
        title_urls = report.title_urls,
        "Backfill completed"
    );
    Ok(())
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;
    let path = args.file;
    let detail = match args.detail {
        config::ExportFormat::Summary => ExportDetail::Summary,
        config::ExportFormat::Full => ExportDetail::Full,
    };

    info!(
        target: "plaqueboard::export",
        path = %path.display(),
        detail = detail.as_str(),
        "Starting export"
    );

    let plaques = app.export.all(detail).await?;
    let json = serde_json::to_vec_pretty(&plaques)
        .map_err(|err| AppError::unexpected(format!("failed to encode export: {err}")))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "plaqueboard::export",
        exported = plaques.len(),
        "Export completed"
    );
    Ok(())
}

struct ApplicationContext {
    http_state: HttpState,
    moderation: Arc<ModerationService>,
    export: Arc<ExportService>,
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let cache = DerivedCache::new(CacheConfig::from(&settings.cache));

    let blobs = Arc::new(
        FilesystemBlobStore::new(
            settings.blobs.directory.clone(),
            settings.blobs.public_base_url.clone(),
        )
        .map_err(|err| AppError::from(InfraError::from(err)))?,
    );

    let notifier: Arc<dyn Notifier> = match &settings.notifier.webhook_url {
        Some(endpoint) => Arc::new(
            WebhookNotifier::new(endpoint.clone())
                .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?,
        ),
        None => Arc::new(LogNotifier),
    };

    let selection = Arc::new(SelectionService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        cache.clone(),
        SelectionOptions::from(&settings.site),
    ));

    let moderation = Arc::new(ModerationService::new(
        ModerationDeps {
            reader: repositories.clone(),
            writer: repositories.clone(),
            comments: repositories.clone(),
            featured: repositories.clone(),
            search: repositories.clone(),
            blobs: blobs.clone(),
            notifier,
            cache: cache.trigger(),
        },
        ModerationOptions::from((&settings.notifier, &settings.site)),
    ));

    let export = Arc::new(ExportService::new(repositories.clone(), cache.clone()));
    let syndication = Arc::new(SyndicationService::new(
        repositories.clone(),
        cache,
        FeedOptions::from(&settings.site),
    ));
    let diagnostics = Arc::new(DiagnosticsService::new(
        repositories.clone(),
        repositories.clone(),
        blobs.clone(),
    ));

    let upload_limit = usize::try_from(settings.blobs.max_upload_bytes.get()).unwrap_or(usize::MAX);
    let http_state = HttpState::new(
        selection,
        moderation.clone(),
        export.clone(),
        syndication,
        diagnostics,
        blobs,
        repositories,
        upload_limit,
    );

    Ok(ApplicationContext {
        http_state,
        moderation,
        export,
    })
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(
        pool,
        settings.site.plaqueset.as_str(),
    )))
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let public_router = http::build_router(http_state.clone());
    let admin_router = http::build_admin_router(http_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let public_server = axum::serve(public_listener, public_router.into_make_service());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
