//! Splits the raw `add` argument into list name, directives and free text.

use crate::error::AppError;
use crate::model::{DEFAULT_LIST, Priority, Repeat};

const REPEAT_KEY: &str = "repeat=";
const PRIORITY_KEY: &str = "priority=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub list_name: String,
    pub repeat: Option<Repeat>,
    pub priority: Priority,
    pub remaining_text: String,
}

pub fn normalize(raw: &str) -> Result<NormalizedInput, AppError> {
    let (list_name, rest) = split_list_name(raw.trim());

    let mut repeat = None;
    let mut priority = Priority::default();
    let mut words = Vec::new();

    for token in rest.split_whitespace() {
        if let Some(value) = strip_key(token, REPEAT_KEY) {
            repeat = (!value.is_empty()).then(|| Repeat::parse(value));
        } else if let Some(value) = strip_key(token, PRIORITY_KEY) {
            priority = value.parse()?;
        } else {
            words.push(token);
        }
    }

    let remaining_text = words.join(" ");
    if remaining_text.is_empty() {
        return Err(AppError::invalid_input("please provide a task description"));
    }

    Ok(NormalizedInput {
        list_name,
        repeat,
        priority,
        remaining_text,
    })
}

fn split_list_name(raw: &str) -> (String, &str) {
    if let Some(inner) = raw.strip_prefix('[')
        && let Some(end) = inner.find(']')
    {
        let name = inner[..end].trim();
        let name = if name.is_empty() { DEFAULT_LIST } else { name };
        return (name.to_string(), &inner[end + 1..]);
    }

    (DEFAULT_LIST.to_string(), raw)
}

fn strip_key<'a>(token: &'a str, key: &str) -> Option<&'a str> {
    let head = token.get(..key.len())?;
    head.eq_ignore_ascii_case(key).then(|| &token[key.len()..])
}
