use crate::args::Command;
use anyhow::Context as _;
use depot_storage::{
    Attributes, Context, DynStorage, ReaderOptions, SignedUrlOptions, StorageError, WriterOptions, list, read,
    remove_all, visitor, walk_n, write,
};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Runs `command` against `storage`, writing its output to `out`.
///
/// `concurrency` bounds the parallel stat calls of `ls --long` unless the
/// command overrides it.
///
/// # Errors
/// Storage failures, unreadable input files, or a failed write to `out`.
pub async fn execute<W: Write>(
    storage: &DynStorage,
    command: Command,
    concurrency: usize,
    out: &mut W,
) -> anyhow::Result<()> {
    let ctx = Context::background();
    debug!(?command, "Executing");

    match command {
        Command::Ls { prefix, long: false, .. } => {
            for path in list(&ctx, storage.as_ref(), &prefix).await? {
                writeln!(out, "{path}")?;
            }
        },
        Command::Ls { prefix, long: true, concurrency: width } => {
            for (path, size) in sizes(&ctx, storage, &prefix, width.unwrap_or(concurrency)).await? {
                writeln!(out, "{size:>12}  {path}")?;
            }
        },
        Command::Cat { path } => {
            out.write_all(&read(&ctx, storage.as_ref(), &path).await?)?;
        },
        Command::Put { path, file, content_type, metadata } => {
            let data = match &file {
                Some(file) => std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?,
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin().read_to_end(&mut buf).context("Failed to read stdin")?;
                    buf
                },
            };
            let mut attributes = Attributes::new();
            attributes.content_type = content_type;
            for (key, value) in metadata {
                attributes.insert_metadata(key, value);
            }
            write(&ctx, storage.as_ref(), &path, &data, &WriterOptions::with_attributes(attributes)).await?;
            writeln!(out, "{} bytes -> {path}", data.len())?;
        },
        Command::Rm { path, recursive: false } => {
            // Delete is idempotent, so stat first to report a typo.
            storage.attributes(&ctx, &path, &ReaderOptions::default()).await?;
            storage.delete(&ctx, &path).await?;
        },
        Command::Rm { path, recursive: true } => {
            remove_all(&ctx, Arc::clone(storage), &path).await?;
        },
        Command::Stat { path } => {
            let attrs = storage.attributes(&ctx, &path, &ReaderOptions::default()).await?;
            print_attributes(out, &attrs)?;
        },
        Command::Url { path, method, expires } => {
            let options = SignedUrlOptions { method, expiry: Duration::from_secs(expires) };
            writeln!(out, "{}", storage.url(&ctx, &path, &options).await?)?;
        },
    }

    Ok(())
}

async fn sizes(
    ctx: &Context,
    storage: &DynStorage,
    prefix: &str,
    concurrency: usize,
) -> Result<Vec<(String, u64)>, StorageError> {
    let rows = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&rows);
    let target = Arc::clone(storage);
    let scope = ctx.clone();

    walk_n(
        ctx,
        storage.as_ref(),
        prefix,
        concurrency,
        visitor(move |path| {
            let sink = Arc::clone(&sink);
            let target = Arc::clone(&target);
            let ctx = scope.clone();
            async move {
                let attrs = target.attributes(&ctx, &path, &ReaderOptions::default()).await?;
                sink.lock().push((path, attrs.size));
                Ok(())
            }
        }),
    )
    .await?;

    let mut rows = std::mem::take(&mut *rows.lock());
    rows.sort_unstable();
    Ok(rows)
}

fn print_attributes<W: Write>(out: &mut W, attrs: &Attributes) -> std::io::Result<()> {
    writeln!(out, "size: {}", attrs.size)?;
    if let Some(content_type) = &attrs.content_type {
        writeln!(out, "content-type: {content_type}")?;
    }
    if let Some(encoding) = &attrs.content_encoding {
        writeln!(out, "content-encoding: {encoding}")?;
    }
    if let Some(modified) = attrs.modified {
        writeln!(out, "modified: {}", unix_seconds(modified))?;
    }
    if let Some(created) = attrs.created {
        writeln!(out, "created: {}", unix_seconds(created))?;
    }
    for (key, value) in attrs.metadata_map() {
        writeln!(out, "meta.{key}: {value}")?;
    }
    Ok(())
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}
