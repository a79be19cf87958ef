pub mod export_service;
pub mod layer_resolver;
pub mod naming;
pub mod report_writer;

pub use naming::derive_filename;
pub use report_writer::ReportWriter;
