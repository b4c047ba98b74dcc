pub mod index;

pub use index::{CDR_PARTITIONS, IndexName, LegSelector, RecordCategory, ResolveError, resolve};
