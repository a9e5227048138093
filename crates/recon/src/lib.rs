//! `sheetdesk-recon`: reconciles field edits and bulk imports into a
//! header-addressed spreadsheet.
//!
//! Pure engine crate: talks to the sheet only through [`TabularStore`] and
//! [`SettingsProvider`]. No CLI or HTTP dependencies.

pub mod address;
pub mod config;
pub mod dates;
pub mod diff;
pub mod engine;
pub mod error;
pub mod locator;
pub mod matcher;
pub mod model;
pub mod protection;
pub mod schema;
pub mod settings;
pub mod store;

pub use config::{ConcurrencyMode, EngineConfig};
pub use engine::{bulk_import, describe_sheet, single_cell_edit, SheetDescription};
pub use error::{ReconError, StoreError};
pub use model::{
    BulkImport, CellValue, ColumnType, ImportRecord, ReconciliationOutcome, SingleCellEdit,
    SingleCellOutcome, SkipReason, SkipReasons,
};
pub use settings::SheetSettingsProvider;
pub use store::{MemoryStore, NoSettings, SettingsProvider, StaticSettings, TabularStore};
