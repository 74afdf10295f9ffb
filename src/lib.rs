//! multibuf-table: a single-threaded chained hash table whose buckets are
//! growable sub-buffers packed into one contiguous multi-buffer.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every bucket of a hash table in one contiguous allocation
//!   while still letting each bucket grow on its own, without a global
//!   rehash.
//! - Layers:
//!   - IdGenerator: hands out small integer ids and recycles returned ones
//!     last-in first-out.
//!   - MultiBuffer<T>: many sub-buffers tiled over one backing `Vec<T>`;
//!     sub-buffers are addressed by recyclable `SubBufferHandle`s issued by
//!     an IdGenerator.
//!   - HashTable<K, V, S>: one sub-buffer per bucket; buckets chain arena
//!     keys of the key/value pairs.
//!
//! Constraints
//! - Single-threaded, synchronous; no internal locking.
//! - Bucket count is fixed at construction (at least 1). Bucket index is
//!   `hash % bucket_count`, so the count need not be a power of two.
//! - Duplicate adds are refused with a logged warning; the existing value
//!   is never overwritten.
//! - Descriptor regions always tile the backing buffer exactly: the sum of
//!   all descriptor capacities, live or free, equals the backing length.
//!
//! Cost model
//! - Growing a sub-buffer inserts into the shared backing buffer and moves
//!   every later region. A bucket near the front pays for all the buckets
//!   behind it on each growth.
//! - Destroying a sub-buffer or clearing the table never shrinks the
//!   backing buffer. Freed regions come back only when their id is
//!   reissued.
//!
//! Failure model
//! - Handle misuse (destroyed or out-of-range handles, indices past a
//!   sub-buffer's length, zero buckets) panics.
//! - Absent keys are `None`/`false`; duplicate keys are
//!   `Err(InsertError::DuplicateKey)`.
//!
//! Notes and non-goals
//! - No persistence format, no thread-safety, no automatic rehashing.
//! - Pairs are owned by a generational arena inside the table, so a stale
//!   arena key can never alias a newer pair.

mod config;
pub mod hash_table;
mod hash_table_proptest;
pub mod id_generator;
pub mod multi_buffer;
mod multi_buffer_proptest;

// Public surface
pub use config::TableConfig;
pub use hash_table::{HashTable, InsertError, PairKey};
pub use id_generator::{Id, IdGenerator};
pub use multi_buffer::{MultiBuffer, SubBufferHandle};
