// Device catalogue backend: duplicate detection, merge preview and the
// transactional merge executor, plus the thin HTTP/CLI surfaces over them.

pub mod api;
pub mod cli;
pub mod database_ops;
pub mod normalization;

pub mod util {
    pub mod env;
}
