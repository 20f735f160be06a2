use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

pub const ASK_USER_QUESTION: &str = "AskUserQuestion";

/// The one tool the model may call, in OpenAI function-calling format.
/// Kept as data rather than behavior: the form itself lives in the TUI.
pub fn ask_user_question_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": ASK_USER_QUESTION,
            "description": "Use this tool when you need to ask the user questions during execution. This allows you to:\n1. Gather user preferences or requirements\n2. Clarify ambiguous instructions\n3. Get decisions on implementation choices as you work\n4. Offer choices to the user about what direction to take.\n\nUsage notes:\n- Users will always be able to select \"Other\" to provide custom text input\n- Use multiSelect: true to allow multiple answers to be selected for a question",
            "parameters": {
                "type": "object",
                "properties": {
                    "questions": {
                        "type": "array",
                        "description": "Questions to ask the user (1-4 questions)",
                        "minItems": 1,
                        "maxItems": 4,
                        "items": {
                            "type": "object",
                            "properties": {
                                "question": {
                                    "type": "string",
                                    "description": "The complete question to ask the user. Should be clear, specific, and end with a question mark."
                                },
                                "header": {
                                    "type": "string",
                                    "description": "Very short label displayed as a tab (max 12 chars). Examples: \"Auth method\", \"Library\", \"Approach\"."
                                },
                                "options": {
                                    "type": "array",
                                    "description": "The available choices for this question. Must have 2-4 options.",
                                    "minItems": 2,
                                    "maxItems": 4,
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "label": {
                                                "type": "string",
                                                "description": "The display text for this option (1-5 words)."
                                            },
                                            "description": {
                                                "type": "string",
                                                "description": "Explanation of what this option means or what will happen if chosen."
                                            }
                                        },
                                        "required": ["label", "description"]
                                    }
                                },
                                "multiSelect": {
                                    "type": "boolean",
                                    "description": "Set to true to allow the user to select multiple options."
                                }
                            },
                            "required": ["question", "header", "options", "multiSelect"]
                        }
                    }
                },
                "required": ["questions"]
            }
        }
    })
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct QuestionOption {
    pub label: String,
    pub description: String,
}

/// A decoded question from an AskUserQuestion invocation. `multi_select`
/// has no serde default on purpose: the schema requires the model to
/// state it, and a missing field is a malformed invocation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub question: String,
    pub header: String,
    pub options: Vec<QuestionOption>,
    #[serde(rename = "multiSelect")]
    pub multi_select: bool,
}

#[derive(Debug, Deserialize)]
struct QuestionArgs {
    questions: Vec<Question>,
}

/// Decode and validate the arguments string of an AskUserQuestion
/// invocation. The bounds mirror the schema; a model that ignores them
/// gets rejected here instead of producing a broken form.
pub fn parse_questions(arguments: &str) -> Result<Vec<Question>> {
    let args: QuestionArgs =
        serde_json::from_str(arguments).context("AskUserQuestion arguments are not valid JSON")?;

    let count = args.questions.len();
    if !(1..=4).contains(&count) {
        bail!("expected 1-4 questions, got {count}");
    }
    for (i, q) in args.questions.iter().enumerate() {
        let options = q.options.len();
        if !(2..=4).contains(&options) {
            bail!("question {i} has {options} options, expected 2-4");
        }
    }

    Ok(args.questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "questions": [
            {
                "question": "Which factor matters most to you?",
                "header": "Priority",
                "options": [
                    {"label": "Salary", "description": "Total compensation"},
                    {"label": "Growth", "description": "Learning and advancement"}
                ],
                "multiSelect": false
            }
        ]
    }"#;

    #[test]
    fn parses_valid_arguments() {
        let questions = parse_questions(VALID).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].header, "Priority");
        assert_eq!(questions[0].options.len(), 2);
        assert!(!questions[0].multi_select);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_questions("not json at all").is_err());
    }

    #[test]
    fn rejects_missing_multi_select() {
        let args = r#"{"questions":[{"question":"Q?","header":"H","options":[
            {"label":"A","description":"a"},{"label":"B","description":"b"}]}]}"#;
        assert!(parse_questions(args).is_err());
    }

    #[test]
    fn rejects_empty_question_list() {
        assert!(parse_questions(r#"{"questions":[]}"#).is_err());
    }

    #[test]
    fn rejects_too_few_options() {
        let args = r#"{"questions":[{"question":"Q?","header":"H","options":[
            {"label":"A","description":"a"}],"multiSelect":false}]}"#;
        let err = parse_questions(args).unwrap_err();
        assert!(err.to_string().contains("expected 2-4"));
    }

    #[test]
    fn rejects_too_many_questions() {
        let one = r#"{"question":"Q?","header":"H","options":[
            {"label":"A","description":"a"},{"label":"B","description":"b"}],"multiSelect":true}"#;
        let args = format!(r#"{{"questions":[{one},{one},{one},{one},{one}]}}"#);
        assert!(parse_questions(&args).is_err());
    }

    #[test]
    fn schema_names_the_tool() {
        let tool = ask_user_question_tool();
        assert_eq!(tool["function"]["name"], ASK_USER_QUESTION);
        assert_eq!(tool["type"], "function");
        let questions = &tool["function"]["parameters"]["properties"]["questions"];
        assert_eq!(questions["minItems"], 1);
        assert_eq!(questions["maxItems"], 4);
    }
}
