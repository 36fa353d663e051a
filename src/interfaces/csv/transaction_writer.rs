use crate::domain::transaction::Transaction;
use crate::error::InputError;
use std::io::Write;

const HEADER: [&str; 9] = [
    "record_id",
    "correlation_id",
    "kind",
    "amount",
    "timestamp",
    "status",
    "source_account",
    "destination_account",
    "failure_reason",
];

/// Writes transaction records as CSV, one row per record.
///
/// The header is written up front so an empty history still produces it.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Result<Self, InputError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, record: &Transaction) -> Result<(), InputError> {
        self.writer.serialize(record)?;
        Ok(())
    }

    pub fn write_all<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<(), InputError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), InputError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use crate::domain::transaction::{CorrelationId, TransactionKind};
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_header_and_rows() {
        let mut record = Transaction::succeeded(
            CorrelationId::generate(),
            TransactionKind::Transfer,
            Amount::new(dec!(1000)).unwrap(),
        )
        .between("ACC001", "ACC002");
        record.record_id = Some(7);

        let mut buffer = Vec::new();
        {
            let mut writer = TransactionWriter::new(&mut buffer).unwrap();
            writer.write(&record).unwrap();
            writer.flush().unwrap();
        }
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].starts_with(&format!("7,{},TRANSFER,1000,", record.correlation_id)));
        assert!(lines[1].ends_with(",SUCCESS,ACC001,ACC002,"));
    }

    #[test]
    fn test_empty_output_has_header_only() {
        let mut buffer = Vec::new();
        {
            let mut writer = TransactionWriter::new(&mut buffer).unwrap();
            writer.write_all(Vec::<Transaction>::new().iter()).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 1);
    }
}
