//! Optional-path lookup into flow response bodies

use serde_json::Value;

/// Text used when a response carries no message text
pub const NO_ANALYSIS_TEXT: &str = "No analysis available.";

/// One hop in a JSON path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    Key(&'static str),
    Index(usize),
}

/// `outputs[0].outputs[0].results.message.text`
pub const MESSAGE_TEXT_PATH: [PathStep; 7] = [
    PathStep::Key("outputs"),
    PathStep::Index(0),
    PathStep::Key("outputs"),
    PathStep::Index(0),
    PathStep::Key("results"),
    PathStep::Key("message"),
    PathStep::Key("text"),
];

/// Follow `path` from `value`, stopping at the first missing link.
///
/// A key applied to a non-object, or an index applied to a non-array, is a
/// missing link like any other.
pub fn lookup<'a>(value: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, step| match *step {
        PathStep::Key(key) => current.get(key),
        PathStep::Index(index) => current.get(index),
    })
}

/// The message text of a flow response, if the full path is present and is a string
pub fn message_text(body: &Value) -> Option<&str> {
    lookup(body, &MESSAGE_TEXT_PATH)?.as_str()
}

/// The message text of a flow response, or [`NO_ANALYSIS_TEXT`]
pub fn extract_text(body: &Value) -> String {
    message_text(body).unwrap_or(NO_ANALYSIS_TEXT).to_string()
}
