#![allow(dead_code)]

use async_trait::async_trait;
use depot_storage::{
    Attributes, Context, DynStorage, File, LocalStorage, ReaderOptions, Result, SignedUrlOptions, Storage,
    StorageError, Visitor, Writer, WriterOptions, list, read,
};
use tempfile::TempDir;

pub async fn local(tmp: &TempDir) -> LocalStorage {
    LocalStorage::builder().root(tmp.path().join("root")).connect().await.unwrap()
}

/// Asserts `path` reads back as `content` and that `open` and `attributes` agree.
pub async fn open_exists(fs: &dyn Storage, path: &str, content: &str) {
    let ctx = Context::background();

    let file = fs.open(&ctx, path, &ReaderOptions::default()).await.unwrap();
    let opened = file.attributes().clone();
    let body = file.read_to_end().await.unwrap();
    assert_eq!(String::from_utf8(body).unwrap(), content, "content of {path}");

    let attrs = fs.attributes(&ctx, path, &ReaderOptions::default()).await.unwrap();
    assert_eq!(opened.metadata_map(), attrs.metadata_map());
    assert_eq!(opened.size, attrs.size);
    assert_eq!(opened.content_type, attrs.content_type);
    assert_eq!(opened.content_encoding, attrs.content_encoding);
}

pub async fn open_not_exists(fs: &dyn Storage, path: &str) {
    let ctx = Context::background();

    let err = fs.open(&ctx, path, &ReaderOptions::default()).await.unwrap_err();
    assert_eq!(err.to_string(), format!("storage {path}: path does not exist"));

    let err = fs.attributes(&ctx, path, &ReaderOptions::default()).await.unwrap_err();
    assert_eq!(err.to_string(), format!("storage {path}: path does not exist"));
}

/// Writes `content` to `path`, then reads it back through the same storage.
pub async fn create(fs: &dyn Storage, path: &str, content: &str) {
    let ctx = Context::background();
    let mut sink = fs.create(&ctx, path, &WriterOptions::default()).await.unwrap();
    sink.write_all(content.as_bytes()).await.unwrap();
    sink.commit().await.unwrap();

    open_exists(fs, path, content).await;
}

pub async fn delete(fs: &dyn Storage, path: &str) {
    create(fs, path, "foo").await;
    fs.delete(&Context::background(), path).await.unwrap();
    open_not_exists(fs, path).await;
}

pub async fn remove_all(fs: &dyn Storage) {
    let ctx = Context::background();
    for path in list(&ctx, fs, "").await.unwrap() {
        fs.delete(&ctx, &path).await.unwrap();
    }
}

pub async fn read_string(fs: &dyn Storage, path: &str) -> String {
    String::from_utf8(read(&Context::background(), fs, path).await.unwrap()).unwrap()
}

/// Hides timestamps, so every object has an unknown age.
#[derive(Debug)]
pub struct Ageless(pub DynStorage);

fn strip(mut attrs: Attributes) -> Attributes {
    attrs.modified = None;
    attrs.created = None;
    attrs
}

#[async_trait]
impl Storage for Ageless {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File> {
        let (reader, attrs) = self.0.open(ctx, path, options).await?.into_parts();
        Ok(File::new(reader, strip(attrs)))
    }

    async fn attributes(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<Attributes> {
        self.0.attributes(ctx, path, options).await.map(strip)
    }

    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer> {
        self.0.create(ctx, path, options).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<()> {
        self.0.delete(ctx, path).await
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: Visitor) -> Result<()> {
        self.0.walk(ctx, path, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String> {
        self.0.url(ctx, path, options).await
    }
}

pub fn is_expired(err: &StorageError) -> bool {
    matches!(err, StorageError::Expired { .. })
}
