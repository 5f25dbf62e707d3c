pub mod enums;
pub mod structs;

pub use enums::{IncrementalKind, SourceKind, SplitScheme, WatermarkBoundary};
pub use structs::{ColumnSpec, ConnectionParams, ReadRequest, ReadRequestBuilder};
