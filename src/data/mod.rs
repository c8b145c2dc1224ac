/// Data layer: table model, loading, cleaning and splitting.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  select columns, drop rows with missing cells
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  split    │  seeded shuffle → (train, test)
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod split;

pub use model::{Dataset, Row, Value};
