//! Storage pool and storage volume documents.

mod common;
pub mod encryption;
pub mod pool;
pub mod volume;

pub use common::{Permissions, Size};
pub use encryption::{Cipher, Encryption, EncryptionSecret, IvGen};
pub use pool::{
    AdapterParent, AdapterPciAddress, FcHostAdapter, PoolAdapter, PoolAdapterKind, PoolSource,
    PoolTarget, ScsiHostAdapter, SourceAuth, SourceHost, StoragePool,
};
pub use volume::{StorageVolume, Timestamps, VolumeBackingStore, VolumeTarget};
