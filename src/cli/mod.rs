pub mod list;
pub mod scan;
pub mod stats;
