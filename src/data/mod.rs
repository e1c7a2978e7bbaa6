//! Tabular data layer: loading, filtering and grouped summarisation.
//!
//! ```text
//!  .csv / .tsv / .json / .parquet / archive bytes
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  value predicates + date span → visible indices
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ summary  │  group_by + n/mean/sd/se/CI → Vec<GroupSummary>
//!   └──────────┘
//! ```
//!
//! The [`model::Table`] is row-major and dynamically typed; everything
//! downstream works on row indices into it rather than copies of it.

pub mod filter;
pub mod loader;
pub mod model;
pub mod summary;
