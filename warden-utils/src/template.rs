use serde_json::Value;

/// Values substituted into welcome, goodbye and verification messages.
#[derive(Debug, Clone)]
pub struct TemplateVars<'a> {
    pub server_name: &'a str,
    pub username: &'a str,
    pub user_id: u64,
    pub member_count: u64,
}

impl TemplateVars<'_> {
    fn pairs(&self) -> [(&'static str, String); 4] {
        [
            ("${servername}", self.server_name.to_owned()),
            ("${user}", self.username.to_owned()),
            ("${usermention}", format!("<@{}>", self.user_id)),
            ("${membercount}", self.member_count.to_string()),
        ]
    }
}

/// Replace placeholders in every string of `value`, descending into arrays
/// and objects. Keys are left alone.
pub fn render_template(value: &Value, vars: &TemplateVars<'_>) -> Value {
    let pairs = vars.pairs();
    render_with(value, &pairs)
}

fn render_with(value: &Value, pairs: &[(&'static str, String)]) -> Value {
    match value {
        Value::String(text) => Value::String(substitute(text, pairs)),
        Value::Array(items) => Value::Array(items.iter().map(|item| render_with(item, pairs)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), render_with(item, pairs)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute(text: &str, pairs: &[(&'static str, String)]) -> String {
    pairs
        .iter()
        .fold(text.to_owned(), |acc, (placeholder, replacement)| {
            acc.replace(placeholder, replacement)
        })
}
