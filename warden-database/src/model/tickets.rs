#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub ticket_id: String,
    pub user_id: u64,
    /// Parent channel (forum for modmail, text channel for verification).
    pub channel_id: u64,
    pub thread_id: u64,
    pub closed_reason: Option<String>,
    pub closed: bool,
}
