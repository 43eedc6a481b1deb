pub mod db;
pub mod dedup;
pub mod devices;
