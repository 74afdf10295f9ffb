//! Construction parameters for [`HashTable`](crate::HashTable).

/// Sizing for a hash table. Fixed once the table is built: the bucket count
/// never changes afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableConfig {
    /// Elements of raw storage reserved up front, shared by all buckets.
    ///
    /// Default: 0.
    pub capacity: usize,

    /// Number of buckets. Must be at least 1.
    ///
    /// Default: [`TableConfig::DEFAULT_BUCKET_COUNT`].
    pub bucket_count: usize,
}

impl TableConfig {
    pub const DEFAULT_BUCKET_COUNT: usize = 16;

    /// Config with `bucket_count` buckets and no reserved capacity.
    pub fn new(bucket_count: usize) -> Self {
        Self {
            capacity: 0,
            bucket_count,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUCKET_COUNT)
    }
}
