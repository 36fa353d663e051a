use crate::domain::account::AccountSnapshot;
use crate::error::InputError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct AccountRow {
    account: String,
    holder: String,
    balance: Decimal,
}

/// Reads `account, holder, balance` rows used to seed the in-memory ledger.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<AccountSnapshot, InputError>> {
        self.reader.into_deserialize::<AccountRow>().map(|row| {
            let row = row?;
            Ok(AccountSnapshot::new(row.account, row.holder, row.balance))
        })
    }
}
