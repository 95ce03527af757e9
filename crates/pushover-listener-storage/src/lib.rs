//! Device identity storage for the Pushover open-client listener.
//!
//! Provides:
//! - `MemoryIdentityStore` - Process-local store (feature: memory)
//! - `FileIdentityStore` - Durable JSON records on disk (feature: file)

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "memory")]
pub use memory::MemoryIdentityStore;

#[cfg(feature = "file")]
pub use file::FileIdentityStore;
