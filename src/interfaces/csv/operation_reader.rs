use crate::application::orchestrator::Operation;
use crate::error::InputError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum OperationType {
    Deposit,
    Withdraw,
    Transfer,
}

#[derive(Debug, Deserialize)]
struct OperationRow {
    op: OperationType,
    account: String,
    to_account: Option<String>,
    amount: Decimal,
}

impl TryFrom<OperationRow> for Operation {
    type Error = InputError;

    fn try_from(row: OperationRow) -> Result<Self, Self::Error> {
        let OperationRow {
            op,
            account,
            to_account,
            amount,
        } = row;

        match op {
            OperationType::Deposit => Ok(Operation::Deposit { account, amount }),
            OperationType::Withdraw => Ok(Operation::Withdraw { account, amount }),
            OperationType::Transfer => match to_account {
                Some(to) => Ok(Operation::Transfer {
                    from: account,
                    to,
                    amount,
                }),
                None => Err(InputError::MalformedOperation(format!(
                    "transfer from {account} has no to_account"
                ))),
            },
        }
    }
}

/// Reads money-movement operations from a CSV source.
///
/// Expected columns: `op, account, to_account, amount`, where `to_account` is
/// only filled in for transfers. Whitespace is trimmed and short rows are allowed.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads operations; a bad row yields an error without ending the stream.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation, InputError>> {
        self.reader.into_deserialize::<OperationRow>().map(|row| {
            row.map_err(InputError::from)
                .and_then(Operation::try_from)
        })
    }
}
