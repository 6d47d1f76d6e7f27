/// What a DML statement reports back: the number of rows it touched and the
/// last rowid the connection generated. `last_insert_id` is only meaningful
/// directly after an INSERT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DmlOutcome {
    pub rows_affected: usize,
    pub last_insert_id: i64,
}
