use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{GradeError, GradeResult, StepKind};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TextContent {
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VideoContent {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default = "VideoContent::default_source")]
    pub source: String,
}

impl VideoContent {
    fn default_source() -> String {
        String::from("youtube")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizSingleContent {
    pub question: String,
    pub choices: Vec<String>,
    #[serde(default)]
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizMultipleContent {
    pub question: String,
    pub choices: Vec<String>,
    #[serde(default)]
    pub correct_indexes: Vec<usize>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizSortingContent {
    #[serde(default)]
    pub instruction: String,
    pub items: Vec<String>,
    pub correct_order: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuizMatchingContent {
    #[serde(default)]
    pub instruction: String,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub pairs: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FillBlanksContent {
    pub text_with_blanks: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NumericContent {
    pub question: String,
    #[serde(default)]
    pub answer: f64,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TextAnswerContent {
    pub question: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FreeAnswerContent {
    pub question: String,
    #[serde(default)]
    pub min_length: usize,
    #[serde(default)]
    pub rubric: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CodeContent {
    pub language: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default = "CodeContent::default_time_limit")]
    pub time_limit: u32,
}

impl CodeContent {
    fn default_time_limit() -> u32 {
        5
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SqlContent {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub database_schema: String,
    #[serde(default)]
    pub expected_query: String,
    #[serde(default)]
    pub expected_result: Vec<Value>,
}

#[derive(Debug, Clone)]
pub enum StepContent {
    Text(TextContent),
    Video(VideoContent),
    QuizSingle(QuizSingleContent),
    QuizMultiple(QuizMultipleContent),
    QuizSorting(QuizSortingContent),
    QuizMatching(QuizMatchingContent),
    FillBlanks(FillBlanksContent),
    Numeric(NumericContent),
    TextAnswer(TextAnswerContent),
    FreeAnswer(FreeAnswerContent),
    Code(CodeContent),
    Sql(SqlContent),
}

impl StepContent {
    /// Parses a step's raw `jsonb` payload into the schema for its kind.
    pub fn from_value(kind: StepKind, value: &Value) -> GradeResult<Self> {
        macro_rules! parse {
            ($variant:ident) => {
                Self::$variant(
                    serde_json::from_value(value.clone()).map_err(GradeError::MalformedContent)?,
                )
            };
        }

        let content = match kind {
            StepKind::Text => parse!(Text),
            StepKind::Video => parse!(Video),
            StepKind::QuizSingle => parse!(QuizSingle),
            StepKind::QuizMultiple => parse!(QuizMultiple),
            StepKind::QuizSorting => parse!(QuizSorting),
            StepKind::QuizMatching => parse!(QuizMatching),
            StepKind::FillBlanks => parse!(FillBlanks),
            StepKind::Numeric => parse!(Numeric),
            StepKind::TextAnswer => parse!(TextAnswer),
            StepKind::FreeAnswer => parse!(FreeAnswer),
            StepKind::Code => parse!(Code),
            StepKind::Sql => parse!(Sql),
        };
        Ok(content)
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Text(_) => StepKind::Text,
            Self::Video(_) => StepKind::Video,
            Self::QuizSingle(_) => StepKind::QuizSingle,
            Self::QuizMultiple(_) => StepKind::QuizMultiple,
            Self::QuizSorting(_) => StepKind::QuizSorting,
            Self::QuizMatching(_) => StepKind::QuizMatching,
            Self::FillBlanks(_) => StepKind::FillBlanks,
            Self::Numeric(_) => StepKind::Numeric,
            Self::TextAnswer(_) => StepKind::TextAnswer,
            Self::FreeAnswer(_) => StepKind::FreeAnswer,
            Self::Code(_) => StepKind::Code,
            Self::Sql(_) => StepKind::Sql,
        }
    }

    /// The payload a fresh step of this kind starts with in the builder.
    pub fn default_for(kind: StepKind) -> Self {
        let value = default_content_value(kind);
        Self::from_value(kind, &value).expect("default content must match its own schema")
    }
}

/// Builder defaults per step kind.
pub fn default_content_value(kind: StepKind) -> Value {
    match kind {
        StepKind::Text => json!({ "markdown": "", "html": "" }),
        StepKind::Video => json!({ "url": "", "duration": 0, "source": "youtube" }),
        StepKind::QuizSingle => json!({
            "question": "Enter the question...",
            "choices": ["Option 1", "Option 2", "Option 3"],
            "correct_index": 0,
            "explanation": ""
        }),
        StepKind::QuizMultiple => json!({
            "question": "Enter the question...",
            "choices": ["Option 1", "Option 2", "Option 3"],
            "correct_indexes": [0],
            "explanation": ""
        }),
        StepKind::QuizSorting => json!({
            "instruction": "Arrange the items in the right order",
            "items": ["Item 1", "Item 2", "Item 3"],
            "correct_order": [0, 1, 2]
        }),
        StepKind::QuizMatching => json!({
            "instruction": "Match the items",
            "left": ["Left 1", "Left 2"],
            "right": ["Right 1", "Right 2"],
            "pairs": [[0, 0], [1, 1]]
        }),
        StepKind::FillBlanks => json!({
            "text_with_blanks": "Rust is a {{}} programming language",
            "answers": ["compiled"]
        }),
        StepKind::Numeric => json!({
            "question": "Enter a numeric question...",
            "answer": 0,
            "tolerance": 0
        }),
        StepKind::TextAnswer => json!({
            "question": "Enter the question...",
            "patterns": [],
            "case_sensitive": false
        }),
        StepKind::FreeAnswer => json!({
            "question": "Write an essay about...",
            "min_length": 100,
            "rubric": ""
        }),
        StepKind::Code => json!({
            "language": "python",
            "description": "Describe the task...",
            "template": "# Your code here\n",
            "tests": [],
            "time_limit": 5
        }),
        StepKind::Sql => json!({
            "description": "Describe the SQL task...",
            "database_schema": "",
            "expected_query": "",
            "expected_result": []
        }),
    }
}

/// Student-facing copy of a step payload with the solution fields removed.
/// Unknown or malformed payloads collapse to an empty object rather than
/// leaking whatever was stored.
pub fn strip_solutions(kind: StepKind, value: &Value) -> Value {
    let Ok(content) = StepContent::from_value(kind, value) else {
        return json!({});
    };

    match content {
        StepContent::Text(c) => json!({ "markdown": c.markdown, "html": c.html }),
        StepContent::Video(c) => {
            json!({ "url": c.url, "duration": c.duration, "source": c.source })
        }
        StepContent::QuizSingle(c) => {
            json!({ "question": c.question, "choices": c.choices })
        }
        StepContent::QuizMultiple(c) => {
            json!({ "question": c.question, "choices": c.choices })
        }
        StepContent::QuizSorting(c) => {
            json!({ "instruction": c.instruction, "items": c.items })
        }
        StepContent::QuizMatching(c) => {
            json!({ "instruction": c.instruction, "left": c.left, "right": c.right })
        }
        StepContent::FillBlanks(c) => {
            json!({ "text_with_blanks": c.text_with_blanks, "blanks": c.answers.len() })
        }
        StepContent::Numeric(c) => json!({ "question": c.question }),
        StepContent::TextAnswer(c) => json!({ "question": c.question }),
        StepContent::FreeAnswer(c) => {
            json!({ "question": c.question, "min_length": c.min_length })
        }
        StepContent::Code(c) => json!({
            "language": c.language,
            "description": c.description,
            "template": c.template,
            "time_limit": c.time_limit
        }),
        StepContent::Sql(c) => {
            json!({ "description": c.description, "database_schema": c.database_schema })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_parse_for_every_kind() {
        for kind in StepKind::ALL {
            let content = StepContent::default_for(kind);
            assert_eq!(content.kind(), kind);
        }
    }

    #[test]
    fn strip_solutions_hides_answers() {
        let value = default_content_value(StepKind::QuizSingle);
        let stripped = strip_solutions(StepKind::QuizSingle, &value);
        assert!(stripped.get("correct_index").is_none());
        assert!(stripped.get("choices").is_some());

        let value = default_content_value(StepKind::FillBlanks);
        let stripped = strip_solutions(StepKind::FillBlanks, &value);
        assert!(stripped.get("answers").is_none());
        assert_eq!(stripped.get("blanks").and_then(Value::as_u64), Some(1));
    }

    #[test]
    fn malformed_payload_strips_to_empty() {
        let bogus = json!({ "question": 42 });
        assert_eq!(strip_solutions(StepKind::QuizSingle, &bogus), json!({}));
    }
}
