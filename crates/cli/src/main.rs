use crate::{
    conn::ConnectionKind,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator, pull},
};
use clap::Parser;
use commands::Commands;
use connectors::{
    file::csv::reader::read_users_file,
    sql::{
        base::{query::Query, source::RowSource},
        postgres::{
            adapter::PgRowSource,
            seed::{create_users_table, insert_users},
        },
    },
};
use engine_config::{
    env::EnvManager,
    settings::validated::{ValidatedSettings, ValidatedSettingsBuilder},
};
use engine_processing::{
    aggregate,
    stream::{BatchStream, FilteredBatchStream, PaginatedStream, PullStream, RowStream, into_stream},
    transform::{
        filter::{ColumnFilter, CompareOp, Filter},
        pipeline::{FilterPipeline, FilterPipelineExt},
    },
};
use futures_util::TryStreamExt;
use model::{core::value::Value, pagination::cursor::PageCursor, records::batch::Batch};
use serde_json::json;
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod error;
mod output;
mod shutdown;

const AGE_COLUMN: &str = "age";

#[derive(Parser)]
#[command(
    name = "rowstream",
    version = "0.1.0",
    about = "Lazy row streaming and pagination over SQL tables"
)]
struct Cli {
    #[arg(long, global = true, help = "postgres://... or memory:<csv path>")]
    url: Option<String>,

    #[arg(long, global = true, help = "Table to scan")]
    table: Option<String>,

    #[arg(long, global = true, help = "Unique column ordering paginated scans")]
    key_column: Option<String>,

    #[arg(long, global = true, help = "Env file to load (defaults to ./.env if present)")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the JSON lines
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, shutdown.cancel_token()).await {
        Ok(()) => ExitCode::Success,
        Err(CliError::ShutdownRequested) => {
            info!("Stopped before completion");
            ExitCode::ShutdownRequested
        }
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), CliError> {
    let settings = load_settings(&cli)?;
    let kind: ConnectionKind = settings.database_url.parse()?;

    if let Commands::Seed { csv } = &cli.command {
        return seed(&kind, &settings.table, csv).await;
    }

    let source = kind.open_source(&settings.table)?;

    match cli.command {
        Commands::Stream => stream_rows(source.as_ref(), &settings, &cancel).await,
        Commands::Batches {
            min_age, max_age, ..
        } => stream_batches(source.as_ref(), &settings, min_age, max_age, &cancel).await,
        Commands::Paginate { offset, .. } => paginate(source, &settings, offset, &cancel).await,
        Commands::AverageAge => average_age(source.as_ref(), &settings, &cancel).await,
        Commands::Concurrent { min_age } => {
            concurrent(source.as_ref(), &settings, min_age, &cancel).await
        }
        Commands::TestConn => {
            conn::ping(source.as_ref()).await?;
            output::print_json(json!({ "status": "ok", "source": source.describe() }))
        }
        Commands::Seed { .. } => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> Result<ValidatedSettings, CliError> {
    let mut env = EnvManager::from_process();
    match &cli.env_file {
        Some(path) => env.load_from_file(path)?,
        None if Path::new(".env").exists() => env.load_from_file(".env")?,
        None => {}
    }

    let (batch_size, page_size) = match &cli.command {
        Commands::Batches { size, .. } => (*size, None),
        Commands::Paginate { page_size, .. } => (None, *page_size),
        _ => (None, None),
    };

    let settings = ValidatedSettingsBuilder::new()
        .database_url(cli.url.clone())
        .table(cli.table.clone())
        .key_column(cli.key_column.clone())
        .batch_size(batch_size)
        .page_size(page_size)
        .build(&env)?;
    Ok(settings)
}

async fn stream_rows(
    source: &dyn RowSource,
    settings: &ValidatedSettings,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let mut rows = RowStream::open(source, &Query::table(&settings.table, None)).await?;
    while let Some(row) = pull(&mut rows, cancel).await? {
        output::print_row(&row)?;
    }

    info!(rows = rows.rows_read(), "Stream complete");
    Ok(())
}

async fn stream_batches(
    source: &dyn RowSource,
    settings: &ValidatedSettings,
    min_age: Option<i64>,
    max_age: Option<i64>,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let pipeline = FilterPipeline::new()
        .add_if(min_age.is_some(), || {
            ColumnFilter::greater_than(AGE_COLUMN, Value::Int(min_age.unwrap_or_default()))
        })
        .add_if(max_age.is_some(), || {
            ColumnFilter::new(AGE_COLUMN, CompareOp::Lt, Value::Int(max_age.unwrap_or_default()))
        });

    let query = Query::table(&settings.table, None);
    let batches = BatchStream::open(source, &query, settings.batch_size).await?;

    let emitted = if pipeline.is_empty() {
        drain_batches(batches, cancel).await?
    } else {
        drain_batches(FilteredBatchStream::new(batches, pipeline), cancel).await?
    };

    info!(batches = emitted, batch_size = settings.batch_size, "Batch stream complete");
    Ok(())
}

async fn drain_batches<S>(mut batches: S, cancel: &CancellationToken) -> Result<usize, CliError>
where
    S: PullStream<Item = Batch>,
{
    let mut emitted = 0;
    while let Some(batch) = pull(&mut batches, cancel).await? {
        output::print_batch(&batch)?;
        emitted += 1;
    }
    Ok(emitted)
}

async fn paginate(
    source: Arc<dyn RowSource>,
    settings: &ValidatedSettings,
    offset: usize,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let query = Query::table(&settings.table, Some(&settings.key_column));
    let start = PageCursor::at(offset, settings.page_size);
    let mut pages = PaginatedStream::resume(source, query, start)?;

    while let Some(page) = pull(&mut pages, cancel).await? {
        output::print_page(&page)?;
    }

    info!(pages = pages.pages(), next_offset = pages.cursor().offset, "Pagination complete");
    Ok(())
}

async fn average_age(
    source: &dyn RowSource,
    settings: &ValidatedSettings,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let mut rows = RowStream::open(source, &Query::table(&settings.table, None)).await?;

    let avg = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CliError::ShutdownRequested),
        avg = aggregate::average(&mut rows, AGE_COLUMN) => avg?,
    };

    output::print_json(json!({
        "average_age": avg.value(),
        "rows": avg.count,
        "skipped": avg.skipped,
    }))
}

/// Two independent scans of the same table, each with its own cursor. Rows
/// kept by the filtered scan are printed as they are pulled.
async fn concurrent(
    source: &dyn RowSource,
    settings: &ValidatedSettings,
    min_age: i64,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let query = Query::table(&settings.table, None);
    let older = ColumnFilter::greater_than(AGE_COLUMN, Value::Int(min_age));

    let all_users = async {
        let rows = RowStream::open(source, &query).await?;
        let total = into_stream(rows)
            .try_fold(0usize, |n, _| async move { Ok(n + 1) })
            .await?;
        Ok::<_, CliError>(total)
    };

    let older_users = async {
        let mut rows = RowStream::open(source, &query).await?;
        let mut kept = 0usize;
        while let Some(row) = rows.next().await? {
            if older.should_keep(&row) {
                output::print_row(&row)?;
                kept += 1;
            }
        }
        Ok::<_, CliError>(kept)
    };

    let (total, kept) = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CliError::ShutdownRequested),
        res = async { tokio::try_join!(all_users, older_users) } => res?,
    };
    info!(total, kept, min_age, "Concurrent scans complete");

    output::print_json(json!({ "scan": "all_users", "count": total }))?;
    output::print_json(json!({
        "scan": "older_users",
        "min_age": min_age,
        "count": kept,
    }))
}

async fn seed(kind: &ConnectionKind, table: &str, csv: &str) -> Result<(), CliError> {
    let ConnectionKind::Postgres(url) = kind else {
        return Err(CliError::PostgresRequired("seed"));
    };

    let users = read_users_file(csv)?;
    let source = PgRowSource::new(url)?;
    let mut conn = source.connect().await?;

    create_users_table(&conn, table).await?;
    let inserted = insert_users(&mut conn, table, users).await?;

    info!(table, inserted, "Seeding complete");
    output::print_json(json!({ "table": table, "inserted": inserted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{
        error::StreamError,
        memory::{Faults, MemoryRowSource},
    };
    use engine_config::settings::ENV_DATABASE_URL;
    use model::{core::value::FieldValue, records::row::RowData};
    use tracing_test::traced_test;

    fn users(ages: &[i64]) -> Vec<RowData> {
        ages.iter()
            .map(|age| RowData::new("user_data", vec![FieldValue::new(AGE_COLUMN, Value::Int(*age))]))
            .collect()
    }

    fn settings() -> ValidatedSettings {
        let env = EnvManager::from_pairs([(ENV_DATABASE_URL, "memory:users.csv")]);
        ValidatedSettingsBuilder::new().build(&env).unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_concurrent_scans_release_both_cursors() {
        let source = MemoryRowSource::new("users", users(&[20, 41, 60, 35]));
        let stats = source.stats();

        concurrent(&source, &settings(), 40, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.opened(), 2);
        assert_eq!(stats.open_cursors(), 0);
        assert!(logs_contain("total=4"));
        assert!(logs_contain("kept=2"));
    }

    #[tokio::test]
    async fn test_concurrent_fetch_error_surfaces() {
        let source = MemoryRowSource::new("users", users(&[50, 60, 70])).with_faults(Faults {
            fail_after: Some(2),
            ..Faults::default()
        });
        let stats = source.stats();

        let result = concurrent(&source, &settings(), 40, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(CliError::Stream(StreamError::Fetch { rows_read: 2, .. }))
        ));
        assert_eq!(stats.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_honours_cancellation() {
        let source = MemoryRowSource::new("users", users(&[50]));
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(
            concurrent(&source, &settings(), 40, &token).await,
            Err(CliError::ShutdownRequested)
        ));
        assert_eq!(source.stats().open_cursors(), 0);
    }
}
