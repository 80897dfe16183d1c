//! Concrete storage media.

pub mod local;
pub mod memory;
pub mod remote;

pub use local::{LocalInner, LocalStorage, LocalStorageBuilder};
pub use memory::{MemoryInner, MemoryStorage};
pub use remote::{
    Bucket, Connector, CredentialProvider, Credentials, EmulatedConnector, ListPage, RemoteInner,
    RemoteStorage, StaticCredentials,
};
