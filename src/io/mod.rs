//! Reading and writing the versioned binary model container

pub mod constants;
pub mod reader;
pub mod strategy;
pub mod writer;

mod builder;
mod stream;

pub use constants::WRITER_VERSION;
pub use reader::{ModelReader, ReaderConfiguration};
pub use strategy::{VersionStrategy, STRATEGY_TABLE};
pub use writer::{ModelWriter, WriterConfiguration};
