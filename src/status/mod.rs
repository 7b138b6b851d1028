//! Engine status stream handling
//!
//! [`LineProtocolParser`] turns the engine's diagnostic stream into raw
//! lines, [`parse_line`] classifies each one, and [`StatusAggregator`] folds
//! the forwarded events into a [`ProgressSnapshot`].

mod aggregator;
mod parser;

pub use aggregator::{ProgressSnapshot, StatusAggregator};
pub use parser::{
    EngineStats, LineProtocolParser, ParsedLine, Severity, StatusEvent, TransferringItem,
    parse_line,
};

#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod tests;
