/// Named embed stored by `/embed create`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomMessage {
    pub name: String,
    pub json: String,
}
