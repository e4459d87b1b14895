pub mod document;

pub use document::{copy_file, ensure_directory, load_yaml, save_yaml, write_atomic};
