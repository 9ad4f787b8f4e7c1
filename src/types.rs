/// Reference sequence index as stored in the BAM header; negative when unset.
pub type RefId = i32;
/// 1-based genomic coordinate.
pub type Coord = u64;

// AHash-backed maps for the per-gene and per-read aggregates.
// `HashMapExt` / `HashSetExt` provide `::new()` and `::with_capacity()`.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub type HashSet<K> = ahash::HashSet<K>;
pub use ahash::HashMapExt;
pub use ahash::HashSetExt;
