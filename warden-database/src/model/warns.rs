#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warn {
    pub warn_id: String,
    pub user_id: u64,
    pub issuer_id: u64,
    pub reason: String,
    pub timestamp_ms: i64,
}
