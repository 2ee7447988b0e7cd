//! Column name formatting for API aliases: snake_case, camelCase, kebab-case or unchanged.

use serde::{Deserialize, Serialize};

/// How column names are turned into API field names when a column has no explicit alias.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnFormatter {
    Snake,
    #[default]
    Camel,
    Kebab,
    None,
}

impl ColumnFormatter {
    pub fn format(&self, s: &str) -> String {
        match self {
            ColumnFormatter::Snake => to_snake_case(s),
            ColumnFormatter::Camel => to_camel_case(s),
            ColumnFormatter::Kebab => to_kebab_case(s),
            ColumnFormatter::None => s.to_string(),
        }
    }
}

/// Split an identifier into lowercase words on `_`, `-`, spaces and case changes.
/// e.g. "user_id" -> ["user", "id"], "createdAt" -> ["created", "at"], "HTTPServer" -> ["http", "server"]
fn split_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut cur = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !cur.is_empty() {
                words.push(std::mem::take(&mut cur));
            }
            continue;
        }
        if c.is_uppercase() && !cur.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut cur));
            }
        }
        cur.extend(c.to_lowercase());
    }
    if !cur.is_empty() {
        words.push(cur);
    }
    words
}

/// e.g. "user_id" -> "userId", "created-at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, w) in split_words(s).iter().enumerate() {
        if i == 0 {
            out.push_str(w);
            continue;
        }
        let mut cs = w.chars();
        if let Some(first) = cs.next() {
            out.extend(first.to_uppercase());
            out.push_str(cs.as_str());
        }
    }
    out
}

/// e.g. "userId" -> "user_id", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

/// e.g. "userId" -> "user-id"
pub fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}
