pub mod job;
pub mod layer;
pub mod loaders;
pub mod row;

pub use job::{BatchJob, ColumnMapping, FilenameFields, LayerMapping};
pub use layer::{LayerId, LayerKind, LayerNode};
pub use loaders::{load_job, load_table, read_columns};
pub use row::{CellValue, DataRow, DataTable};
