//! # Survey Questionnaire
//!
//! The question model shared by survey authoring, the employee dashboard and
//! guest links, plus grading of submitted answers into the structured
//! `qa_responses` document that is stored with every response.
//!
//! ## Wire Shape
//!
//! Questions serialize flat with a `type` tag:
//!
//! ```json
//! {"id": "q1", "text": "How satisfied are you?", "type": "rating", "scale": 5, "required": true}
//! {"id": "q2", "text": "Pick one", "type": "multiple_choice", "options": ["A", "B"]}
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contact::EmailAddress;
use crate::error::{AnswerError, ValidationError};

/// Default rating scale when a rating question omits `scale`.
pub const DEFAULT_RATING_SCALE: u8 = 5;

/// Longest accepted free-text answer, in characters.
pub const MAX_TEXT_ANSWER: usize = 5000;

const MIN_RATING_SCALE: u8 = 2;
const MAX_RATING_SCALE: u8 = 10;

fn default_scale() -> u8 {
    DEFAULT_RATING_SCALE
}

/// Answers keyed by question id, as submitted by the client.
pub type AnswerSet = BTreeMap<String, Value>;

/// The kind of a question and its kind-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Integer rating from 1 to `scale`.
    Rating {
        #[serde(default = "default_scale")]
        scale: u8,
    },
    /// Free text.
    Text,
    /// Exactly one of `options`.
    MultipleChoice { options: Vec<String> },
    /// Yes or no.
    YesNo,
}

impl QuestionKind {
    /// The `type` tag value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Rating { .. } => "rating",
            Self::Text => "text",
            Self::MultipleChoice { .. } => "multiple_choice",
            Self::YesNo => "yes_no",
        }
    }
}

/// A single survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
}

/// One graded answer inside [`QaResponses`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    #[serde(rename = "questionId", alias = "question_id")]
    pub question_id: String,
    /// The question text at submission time.
    pub question: String,
    /// Normalized answer, `null` when an optional question was skipped.
    pub answer: Value,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The structured document stored with every survey response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResponses {
    /// Respondent email: the employee's address or the guest's invite address.
    pub email: EmailAddress,
    pub responses: Vec<QaEntry>,
}

/// An ordered, structurally valid list of questions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Questionnaire {
    questions: Vec<Question>,
}

impl Questionnaire {
    /// Build a questionnaire, rejecting structurally invalid question lists.
    pub fn new(questions: Vec<Question>) -> Result<Self, ValidationError> {
        let questionnaire = Self { questions };
        questionnaire.validate()?;
        Ok(questionnaire)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Structural checks: at least one question, unique non-empty ids,
    /// non-empty text, rating scales within 2..=10, and multiple-choice
    /// questions with at least two distinct non-empty options.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.questions.is_empty() {
            return Err(ValidationError::InvalidQuestionnaire(
                "a survey needs at least one question".into(),
            ));
        }

        let mut seen = HashSet::new();
        for q in &self.questions {
            if q.id.trim().is_empty() {
                return Err(ValidationError::InvalidQuestionnaire(
                    "question id must not be empty".into(),
                ));
            }
            if !seen.insert(q.id.as_str()) {
                return Err(ValidationError::InvalidQuestionnaire(format!(
                    "duplicate question id {:?}",
                    q.id
                )));
            }
            if q.text.trim().is_empty() {
                return Err(ValidationError::InvalidQuestionnaire(format!(
                    "question {:?} has no text",
                    q.id
                )));
            }
            match &q.kind {
                QuestionKind::Rating { scale } => {
                    if !(MIN_RATING_SCALE..=MAX_RATING_SCALE).contains(scale) {
                        return Err(ValidationError::InvalidQuestionnaire(format!(
                            "question {:?}: rating scale must be between {MIN_RATING_SCALE} and {MAX_RATING_SCALE}",
                            q.id
                        )));
                    }
                }
                QuestionKind::MultipleChoice { options } => {
                    let distinct: HashSet<&str> = options.iter().map(|o| o.trim()).collect();
                    if options.iter().any(|o| o.trim().is_empty())
                        || distinct.len() != options.len()
                        || distinct.len() < 2
                    {
                        return Err(ValidationError::InvalidQuestionnaire(format!(
                            "question {:?}: needs at least two distinct, non-empty options",
                            q.id
                        )));
                    }
                }
                QuestionKind::Text | QuestionKind::YesNo => {}
            }
        }
        Ok(())
    }

    /// Check a submitted answer set and produce the stored entries, one per
    /// question in questionnaire order.
    pub fn grade(&self, answers: &AnswerSet) -> Result<Vec<QaEntry>, AnswerError> {
        if let Some(unknown) = answers
            .keys()
            .find(|id| !self.questions.iter().any(|q| &q.id == *id))
        {
            return Err(AnswerError::UnknownQuestion(unknown.clone()));
        }

        self.questions
            .iter()
            .map(|q| {
                let answer = match answers.get(&q.id).filter(|v| !is_blank(v)) {
                    Some(value) => grade_one(q, value)?,
                    None if q.required => {
                        return Err(AnswerError::MissingRequired {
                            question_id: q.id.clone(),
                        })
                    }
                    None => Value::Null,
                };
                Ok(QaEntry {
                    question_id: q.id.clone(),
                    question: q.text.clone(),
                    answer,
                    kind: q.kind.type_name().to_string(),
                })
            })
            .collect()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn grade_one(q: &Question, value: &Value) -> Result<Value, AnswerError> {
    let wrong_type = |expected| AnswerError::WrongType {
        question_id: q.id.clone(),
        expected,
    };

    match &q.kind {
        QuestionKind::Rating { scale } => {
            if !value.is_number() {
                return Err(wrong_type("an integer rating"));
            }
            match value.as_u64() {
                Some(n) if n >= 1 && n <= u64::from(*scale) => Ok(Value::from(n)),
                _ => Err(AnswerError::RatingOutOfRange {
                    question_id: q.id.clone(),
                    scale: *scale,
                }),
            }
        }
        QuestionKind::Text => {
            let text = value.as_str().ok_or_else(|| wrong_type("a string"))?;
            if text.chars().count() > MAX_TEXT_ANSWER {
                return Err(AnswerError::TooLong {
                    question_id: q.id.clone(),
                    max: MAX_TEXT_ANSWER,
                });
            }
            Ok(Value::String(text.to_string()))
        }
        QuestionKind::MultipleChoice { options } => {
            let choice = value.as_str().ok_or_else(|| wrong_type("one of the options"))?;
            if options.iter().any(|o| o == choice) {
                Ok(Value::String(choice.to_string()))
            } else {
                Err(AnswerError::InvalidChoice {
                    question_id: q.id.clone(),
                    choice: choice.to_string(),
                })
            }
        }
        QuestionKind::YesNo => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("yes") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("no") => Ok(Value::Bool(false)),
            _ => Err(wrong_type("yes or no")),
        },
    }
}
