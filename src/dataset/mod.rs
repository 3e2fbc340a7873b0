//! Dataset stages run before versioning: download, cleanse and split.

pub mod cleanse;
pub mod gather;
pub mod split;
pub mod table;

pub use cleanse::{cleanse, cleanse_file, CleanseReport};
pub use gather::download;
pub use split::{split, split_file, Partitions};
pub use table::{is_missing, Table};
