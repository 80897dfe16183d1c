//! Per-operation call and error counters.

use crate::attributes::{Attributes, ReaderOptions, SignedUrlOptions, WriterOptions};
use crate::context::Context;
use crate::error::Result;
use crate::file::{File, Writer};
use crate::storage::{DynStorage, Storage, Visitor};
use async_trait::async_trait;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    Open,
    Attributes,
    Create,
    Delete,
    Walk,
    Url,
}

impl Op {
    pub const ALL: [Self; 6] = [Self::Open, Self::Attributes, Self::Create, Self::Delete, Self::Walk, Self::Url];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Attributes => "attributes",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Walk => "walk",
            Self::Url => "url",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter values for one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    pub total: u64,
    pub errors: u64,
}

/// One completed call, as handed to a [`MetricSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub op: Op,
    pub path: String,
    pub ok: bool,
    pub latency: Duration,
}

/// Receives an [`Observation`] after every call through a [`StatsWrapper`].
pub trait MetricSink: Send + Sync + fmt::Debug {
    fn observe(&self, observation: &Observation);
}

#[derive(Debug, Default)]
struct Counter {
    total: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug)]
pub struct StatsInner {
    target: DynStorage,
    counters: [Counter; 6],
    sink: Option<Arc<dyn MetricSink>>,
}

impl StatsInner {
    #[must_use]
    pub fn stats(&self, op: Op) -> OpStats {
        let counter = &self.counters[op.index()];
        OpStats {
            total: counter.total.load(Ordering::Relaxed),
            errors: counter.errors.load(Ordering::Relaxed),
        }
    }

    /// Current values of every counter, in [`Op::ALL`] order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(Op, OpStats)> {
        Op::ALL.iter().map(|&op| (op, self.stats(op))).collect()
    }
}

/// Counts calls and failures per operation.
///
/// Counters only ever increase. Clones share them, so keep a clone to read
/// the numbers after handing the wrapper off as a [`DynStorage`].
#[derive(Debug, Clone)]
pub struct StatsWrapper {
    inner: Arc<StatsInner>,
}

impl Deref for StatsWrapper {
    type Target = StatsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl StatsWrapper {
    pub fn new(inner: DynStorage) -> Self {
        Self::build(inner, None)
    }

    pub fn with_sink(inner: DynStorage, sink: Arc<dyn MetricSink>) -> Self {
        Self::build(inner, Some(sink))
    }

    fn build(inner: DynStorage, sink: Option<Arc<dyn MetricSink>>) -> Self {
        Self { inner: Arc::new(StatsInner { target: inner, counters: Default::default(), sink }) }
    }

    fn observe<T>(&self, op: Op, path: &str, started: Instant, res: Result<T>) -> Result<T> {
        let counter = &self.counters[op.index()];
        counter.total.fetch_add(1, Ordering::Relaxed);
        if res.is_err() {
            counter.errors.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(sink) = &self.sink {
            sink.observe(&Observation {
                op,
                path: path.to_owned(),
                ok: res.is_ok(),
                latency: started.elapsed(),
            });
        }
        res
    }
}

#[async_trait]
impl Storage for StatsWrapper {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        let started = Instant::now();
        let res = self.target.open(ctx, path, options).await;
        self.observe(Op::Open, path, started, res)
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes> {
        let started = Instant::now();
        let res = self.target.attributes(ctx, path, options).await;
        self.observe(Op::Attributes, path, started, res)
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        let started = Instant::now();
        let res = self.target.create(ctx, path, options).await;
        self.observe(Op::Create, path, started, res)
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        let started = Instant::now();
        let res = self.target.delete(ctx, path).await;
        self.observe(Op::Delete, path, started, res)
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        let started = Instant::now();
        let res = self.target.walk(ctx, path, visit).await;
        self.observe(Op::Walk, path, started, res)
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        let started = Instant::now();
        let res = self.target.url(ctx, path, options).await;
        self.observe(Op::Url, path, started, res)
    }
}
