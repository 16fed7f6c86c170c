// Backup files and spreadsheet exports.

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;
