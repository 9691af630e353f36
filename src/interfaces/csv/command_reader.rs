use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Pay,
    Topup,
}

/// One row of the batch input: a payment for an order, or a wallet top-up.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentCommand {
    pub op: CommandKind,
    pub order: Option<String>,
    pub payer: String,
    pub amount: Decimal,
    pub method: String,
}

/// Reads payment commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<PaymentCommand>`. It handles whitespace trimming and flexible
/// record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands,
    /// allowing large files to stream without loading everything into memory.
    pub fn commands(self) -> impl Iterator<Item = Result<PaymentCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "op, order, payer, amount, method\n\
                    topup, , alice, 100, subsidy\n\
                    pay, order-1, alice, 40, wallet";
        let reader = CommandReader::new(data.as_bytes());
        let results: Vec<Result<PaymentCommand>> = reader.commands().collect();

        assert_eq!(results.len(), 2);
        let topup = results[0].as_ref().unwrap();
        assert_eq!(topup.op, CommandKind::Topup);
        assert_eq!(topup.amount, dec!(100));
        assert!(topup.order.as_deref().unwrap_or("").is_empty());

        let pay = results[1].as_ref().unwrap();
        assert_eq!(pay.op, CommandKind::Pay);
        assert_eq!(pay.order.as_deref(), Some("order-1"));
        assert_eq!(pay.method, "wallet");
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "op, order, payer, amount, method\nrefund, order-1, alice, 40, wallet";
        let reader = CommandReader::new(data.as_bytes());
        let results: Vec<Result<PaymentCommand>> = reader.commands().collect();

        assert!(results[0].is_err());
    }
}
