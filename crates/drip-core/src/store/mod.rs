// # Config Store Implementations
//
// This module provides implementations of the ConfigStore trait for
// different persistence strategies.

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvConfigStore;
pub use memory::MemoryConfigStore;
