// Query results: rows of decoded driver values plus the outcome metadata
// DML statements report.

mod outcome;
mod result_set;
mod row;

pub use outcome::DmlOutcome;
pub use result_set::ResultSet;
pub use row::DbRow;
