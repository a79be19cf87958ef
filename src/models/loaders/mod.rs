pub mod job_loader;
pub mod tabular_loader;

pub use job_loader::load_job;
pub use tabular_loader::{load_table, read_columns};
