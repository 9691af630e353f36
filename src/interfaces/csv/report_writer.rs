use crate::domain::payment::PaymentRecord;
use crate::domain::wallet::Wallet;
use crate::error::Result;
use std::io::Write;

/// Writes the final state of payments and wallets as CSV.
///
/// Each table gets its own `csv::Writer`: the crate enforces a uniform field
/// count per writer, and the two tables have different widths.
pub struct ReportWriter<W: Write> {
    destination: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(destination: W) -> Self {
        Self { destination }
    }

    /// Writes one row per payment record, ordered by creation time so output
    /// is stable across runs.
    pub fn write_payments(&mut self, mut records: Vec<PaymentRecord>) -> Result<()> {
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.payment_id.cmp(&b.payment_id))
        });

        let mut writer = csv::Writer::from_writer(&mut self.destination);
        writer.write_record(["order", "payer", "amount", "method", "status", "reason"])?;
        for record in records {
            writer.write_record([
                record.order_id.as_str(),
                record.payer_id.as_str(),
                &record.amount.to_string(),
                record.method.as_str(),
                record.status.as_str(),
                record.failure_reason().unwrap_or(""),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes one row per wallet.
    pub fn write_wallets(&mut self, mut wallets: Vec<Wallet>) -> Result<()> {
        wallets.sort_by(|a, b| a.payer_id.cmp(&b.payer_id));

        let mut writer = csv::Writer::from_writer(&mut self.destination);
        writer.write_record(["payer", "balance", "transactions"])?;
        for wallet in wallets {
            writer.write_record([
                wallet.payer_id.as_str(),
                &wallet.balance.to_string(),
                &wallet.transactions.len().to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
