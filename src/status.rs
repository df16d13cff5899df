//! Response shape checks and verdict formatting.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{Error, Result};

/// Display text for every review status the API documents.
static HOMEWORK_VERDICTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("approved", "Работа проверена: ревьюеру всё понравилось. Ура!"),
        ("reviewing", "Работа взята на проверку ревьюером."),
        ("rejected", "Работа проверена: у ревьюера есть замечания."),
    ])
});

/// Check that the payload is an object whose `homeworks` key holds a list,
/// and return that list.
pub fn check_response(response: &Value) -> Result<&Vec<Value>> {
    let object = response.as_object().ok_or(Error::NotAnObject)?;
    let homeworks = object
        .get("homeworks")
        .ok_or(Error::MissingKey("homeworks"))?;
    homeworks.as_array().ok_or(Error::WrongType {
        key: "homeworks",
        expected: "a list",
    })
}

/// Server-reported time bound for the next fetch, when present.
pub fn current_date(response: &Value) -> Option<i64> {
    response.get("current_date").and_then(Value::as_i64)
}

/// Build the chat message for one homework record.
pub fn parse_status(homework: &Value) -> Result<String> {
    let name = homework
        .get("homework_name")
        .and_then(Value::as_str)
        .ok_or(Error::MissingField("homework_name"))?;
    let status = homework
        .get("status")
        .and_then(Value::as_str)
        .ok_or(Error::MissingField("status"))?;
    let verdict = HOMEWORK_VERDICTS
        .get(status)
        .ok_or_else(|| Error::UnknownStatus(status.to_string()))?;

    Ok(format!(
        "Изменился статус проверки работы \"{name}\". {verdict}"
    ))
}
