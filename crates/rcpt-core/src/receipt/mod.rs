//! Receipt field extraction and record assembly.

mod assembler;
mod parser;
pub mod rules;

pub use assembler::RecordAssembler;
pub use parser::{ExtractionResult, ReceiptParser};
