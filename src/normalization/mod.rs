pub mod name;

pub use name::{DefaultNormalizer, NameNormalizer};
