//! Turning free-text completions into typed answers.
//!
//! Completions are untrusted: nothing is read from them until a complete JSON
//! object has been located in the text.

use crate::error::Error;
use crate::model::{Solution, Tool};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Returns the first brace-delimited JSON object embedded in `text`, verbatim.
pub fn extract_json(text: &str) -> Result<&str, Error> {
    for (start, _) in text.match_indices('{') {
        let candidate = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<JsonValue>();
        if let Some(Ok(JsonValue::Object(_))) = stream.next() {
            return Ok(&candidate[..stream.byte_offset()]);
        }
    }
    Err(Error::AnswerExtraction)
}

#[derive(Debug, Deserialize)]
struct TasksAnswer {
    #[serde(default)]
    tasks: Vec<String>,
}

/// The `tasks` list of a planning answer. A missing list counts as empty.
pub fn parse_tasks(answer: &str) -> Result<Vec<String>, Error> {
    let json = extract_json(answer)?;
    let parsed: TasksAnswer = serde_json::from_str(json)?;
    Ok(parsed.tasks)
}

#[derive(Debug, Deserialize)]
struct SolutionAnswer {
    tool: String,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    limitations: String,
    #[serde(default)]
    outcome: String,
}

/// A solution answer, with the tool resolved to one the supervisor can dispatch.
pub fn parse_solution(answer: &str) -> Result<Solution, Error> {
    let json = extract_json(answer)?;
    let raw: SolutionAnswer = serde_json::from_str(json)?;
    let tool: Tool = raw.tool.parse()?;
    if raw.inputs.is_empty() {
        return Err(Error::AnswerParse(format!("no inputs given for tool {tool}")));
    }
    Ok(Solution {
        tool,
        inputs: raw.inputs,
        reasoning: raw.reasoning,
        limitations: raw.limitations,
        outcome: raw.outcome,
    })
}

/// The next command proposed after a failed one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Diagnosis {
    pub command: String,
    #[serde(default)]
    pub reason: String,
}

pub fn parse_diagnosis(answer: &str) -> Result<Diagnosis, Error> {
    let json = extract_json(answer)?;
    let diagnosis: Diagnosis = serde_json::from_str(json)?;
    if diagnosis.command.trim().is_empty() {
        return Err(Error::AnswerParse("empty command in diagnosis".to_string()));
    }
    Ok(diagnosis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_flat_block_verbatim() {
        let text = "Sure! Here is the plan:\n{\"tasks\": [\"list files\"]}\nGood luck.";
        assert_eq!(extract_json(text).unwrap(), "{\"tasks\": [\"list files\"]}");
    }

    #[test]
    fn extracts_first_of_several_blocks() {
        let text = r#"{"a": 1} and then {"b": 2}"#;
        assert_eq!(extract_json(text).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn skips_braces_that_are_not_json() {
        let text = r#"use {curly} braces, then {"command": "ls", "reason": "look"}"#;
        assert_eq!(
            extract_json(text).unwrap(),
            r#"{"command": "ls", "reason": "look"}"#
        );
    }

    #[test]
    fn keeps_nested_objects_whole() {
        let text = r#"x {"outer": {"inner": true}} y"#;
        assert_eq!(extract_json(text).unwrap(), r#"{"outer": {"inner": true}}"#);
    }

    #[test]
    fn fails_without_any_object() {
        assert_eq!(extract_json("no json here"), Err(Error::AnswerExtraction));
        assert_eq!(extract_json("[1, 2, 3]"), Err(Error::AnswerExtraction));
        assert_eq!(extract_json("{unterminated"), Err(Error::AnswerExtraction));
    }

    #[test]
    fn parses_task_lists() {
        let tasks = parse_tasks(r#"{"tasks": ["download", "unpack"]}"#).unwrap();
        assert_eq!(tasks, vec!["download", "unpack"]);
        assert!(parse_tasks(r#"{"tasks": []}"#).unwrap().is_empty());
        assert!(matches!(
            parse_tasks(r#"{"tasks": "nope"}"#),
            Err(Error::AnswerParse(..))
        ));
    }

    #[test]
    fn parses_solutions() {
        let answer = r#"I will use the terminal.
        {"tool": "TERMINAL", "inputs": ["ls -la"], "reasoning": "list", "limitations": "none", "outcome": "files"}"#;
        let solution = parse_solution(answer).unwrap();
        assert_eq!(solution.tool, Tool::Terminal);
        assert_eq!(solution.primary_input(), "ls -la");
        assert_eq!(solution.outcome, "files");
    }

    #[test]
    fn rejects_unknown_tools_at_parse_time() {
        let answer = r#"{"tool": "ROCKET_SHIP", "inputs": ["launch"]}"#;
        assert_eq!(
            parse_solution(answer),
            Err(Error::ToolResolution("ROCKET_SHIP".to_string()))
        );
    }

    #[test]
    fn rejects_solutions_without_inputs() {
        let answer = r#"{"tool": "search", "inputs": []}"#;
        assert!(matches!(parse_solution(answer), Err(Error::AnswerParse(..))));
    }

    #[test]
    fn parses_diagnoses() {
        let answer = r#"{"command": "apt-get install foo -y && foo", "reason": "foo is missing"}"#;
        let diagnosis = parse_diagnosis(answer).unwrap();
        assert_eq!(diagnosis.command, "apt-get install foo -y && foo");
        assert!(matches!(
            parse_diagnosis(r#"{"command": " "}"#),
            Err(Error::AnswerParse(..))
        ));
    }
}
