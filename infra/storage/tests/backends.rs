mod common;

use common::{create, delete, open_exists, open_not_exists, remove_all};
use depot_storage::backend::{Credentials, EmulatedConnector, StaticCredentials};
use depot_storage::{
    Attributes, CloudStorageTiers, Context, DynStorage, FlatTiers, LogWrapper, MemoryStorage, PrefixWrapper,
    ReaderOptions, RemoteStorage, Scope, SignedUrlOptions, StatsWrapper, Storage, StorageError, TraceWrapper,
    WriterOptions, list, walk_n, visitor,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

fn signing_credentials() -> StaticCredentials {
    StaticCredentials(Credentials {
        principal: Some("svc@example".into()),
        token: Some("token".into()),
        signing_key: Some(b"key".to_vec()),
    })
}

fn remote(tiers: bool) -> RemoteStorage {
    let mapping: Arc<dyn depot_storage::ScopeMapping> =
        if tiers { Arc::new(CloudStorageTiers) } else { Arc::new(FlatTiers) };
    RemoteStorage::new("bucket", Arc::new(EmulatedConnector::with_page_size(2)), Arc::new(signing_credentials()), mapping)
}

/// Every backend and decorator must satisfy the same basic contract.
async fn conformance(fs: &dyn Storage) {
    open_not_exists(fs, "foo").await;

    create(fs, "foo", "").await;
    create(fs, "foo", "bar").await;
    open_exists(fs, "foo", "bar").await;

    create(fs, "dir/a", "1").await;
    create(fs, "dir/b", "2").await;
    create(fs, "dir/sub/c", "3").await;
    assert_eq!(
        list(&Context::background(), fs, "dir/").await.unwrap(),
        vec!["dir/a", "dir/b", "dir/sub/c"]
    );

    delete(fs, "gone").await;
    fs.delete(&Context::background(), "never-existed").await.unwrap();

    remove_all(fs).await;
    assert!(list(&Context::background(), fs, "").await.unwrap().is_empty());
}

#[tokio::test]
async fn memory_conforms() {
    conformance(&MemoryStorage::new()).await;
}

#[tokio::test]
async fn local_conforms() {
    let tmp = TempDir::new().unwrap();
    conformance(&common::local(&tmp).await).await;
}

#[tokio::test]
async fn remote_tiered_conforms() {
    conformance(&remote(true)).await;
}

#[tokio::test]
async fn remote_flat_conforms() {
    conformance(&remote(false)).await;
}

#[tokio::test]
async fn decorated_chain_conforms() {
    let inner: DynStorage = Arc::new(MemoryStorage::new());
    let chain = LogWrapper::new(
        Arc::new(TraceWrapper::new(Arc::new(StatsWrapper::new(Arc::new(PrefixWrapper::new(inner, "p/")))), "t")),
        "l",
    );
    conformance(&chain).await;
}

#[tokio::test]
async fn prefix_walk_is_symmetric() {
    let memory = MemoryStorage::new();
    let prefixed = PrefixWrapper::new(Arc::new(memory.clone()), "tenant/");
    let ctx = Context::background();

    let written = ["x", "y/z", "y/zz"];
    for p in written {
        create(&prefixed, p, p).await;
        open_exists(&memory, &format!("tenant/{p}"), p).await;
    }
    create(&memory, "elsewhere", "").await;

    assert_eq!(list(&ctx, &prefixed, "").await.unwrap(), written);
}

#[tokio::test]
async fn metadata_survives_round_trip() {
    let fs = MemoryStorage::new();
    let ctx = Context::background();
    let attrs = Attributes::new()
        .with_content_type("application/json")
        .with_content_encoding("gzip")
        .with_metadata("X-Owner", "ops")
        .with_metadata("x-owner", "platform");

    let mut sink = fs.create(&ctx, "doc.json", &WriterOptions::with_attributes(attrs)).await.unwrap();
    sink.write_all(b"{}").await.unwrap();
    sink.commit().await.unwrap();

    let got = fs.attributes(&ctx, "doc.json", &ReaderOptions::default()).await.unwrap();
    assert_eq!(got.content_type.as_deref(), Some("application/json"));
    assert_eq!(got.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(got.metadata("x-owner"), Some("platform"));
    assert_eq!(got.metadata_map().len(), 1);
    assert_eq!(got.size, 2);
}

#[tokio::test]
async fn remote_handle_scope_grows_with_use() {
    let fs = remote(true);
    let ctx = Context::background();
    assert_eq!(fs.scope(), None);

    open_not_exists(&fs, "a").await;
    assert_eq!(fs.scope(), Some(Scope::READ));

    create(&fs, "a", "1").await;
    assert_eq!(fs.scope(), Some(Scope::RW));

    fs.delete(&ctx, "a").await.unwrap();
    assert_eq!(fs.scope(), Some(Scope::RWD));

    create(&fs, "a", "1").await;
    let url = fs.url(&ctx, "a", &SignedUrlOptions::default()).await.unwrap();
    assert!(url.contains("method=GET"), "{url}");
    assert!(url.contains("expires=60"), "{url}");
    assert!(fs.scope().unwrap().has(Scope::RWD | Scope::SIGN_URL));
}

#[tokio::test]
async fn remote_signing_needs_a_key() {
    let creds = StaticCredentials(Credentials { token: Some("t".into()), ..Credentials::default() });
    let fs = RemoteStorage::new(
        "bucket",
        Arc::new(EmulatedConnector::new()),
        Arc::new(creds),
        Arc::new(CloudStorageTiers),
    );
    create(&fs, "a", "1").await;

    let err = fs.url(&Context::background(), "a", &SignedUrlOptions::default()).await.unwrap_err();
    assert!(matches!(err, StorageError::CredentialsMissing { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_walk_over_local_tree() {
    let tmp = TempDir::new().unwrap();
    let fs = common::local(&tmp).await;
    let ctx = Context::background();
    for i in 0..40 {
        depot_storage::write(&ctx, &fs, &format!("t/{}/{i}", i % 4), b"", &WriterOptions::default()).await.unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    walk_n(
        &ctx,
        &fs,
        "t",
        3,
        visitor(move |p| {
            sink.lock().push(p);
            futures::future::ready(Ok(()))
        }),
    )
    .await
    .unwrap();

    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, list(&ctx, &fs, "t").await.unwrap());
    assert_eq!(seen.len(), 40);
}
