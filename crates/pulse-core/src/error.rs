//! # Error Types
//!
//! Validation errors for values constructed at the API boundary, and grading
//! errors for submitted survey answers. All errors use `thiserror`.

use thiserror::Error;

/// A value failed format validation at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is malformed.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    /// Invite token is not 64 lowercase hex characters.
    #[error("invalid invite token")]
    InvalidToken,

    /// A required name field was empty or too long.
    #[error("invalid {field}: {reason}")]
    InvalidName {
        /// Which field was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown role name.
    #[error("unknown role: {0:?}")]
    UnknownRole(String),

    /// The survey questionnaire is structurally invalid.
    #[error("invalid questionnaire: {0}")]
    InvalidQuestionnaire(String),
}

/// A submitted answer set does not satisfy the questionnaire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// A required question has no answer.
    #[error("question {question_id:?} is required")]
    MissingRequired {
        /// The unanswered question.
        question_id: String,
    },

    /// The answer set references a question the survey does not have.
    #[error("unknown question {0:?}")]
    UnknownQuestion(String),

    /// A rating answer was not an integer within the scale.
    #[error("question {question_id:?} expects a rating between 1 and {scale}")]
    RatingOutOfRange {
        /// The offending question.
        question_id: String,
        /// The question's scale.
        scale: u8,
    },

    /// A multiple-choice answer is not one of the options.
    #[error("question {question_id:?} does not offer option {choice:?}")]
    InvalidChoice {
        /// The offending question.
        question_id: String,
        /// The submitted choice.
        choice: String,
    },

    /// The answer has the wrong JSON type for the question.
    #[error("question {question_id:?} expects {expected}")]
    WrongType {
        /// The offending question.
        question_id: String,
        /// Human-readable description of the expected value.
        expected: &'static str,
    },

    /// A text answer exceeds the maximum length.
    #[error("answer to question {question_id:?} exceeds {max} characters")]
    TooLong {
        /// The offending question.
        question_id: String,
        /// Maximum permitted characters.
        max: usize,
    },
}

impl AnswerError {
    /// The question the error is about.
    pub fn question_id(&self) -> &str {
        match self {
            Self::UnknownQuestion(id) => id,
            Self::MissingRequired { question_id }
            | Self::RatingOutOfRange { question_id, .. }
            | Self::InvalidChoice { question_id, .. }
            | Self::WrongType { question_id, .. }
            | Self::TooLong { question_id, .. } => question_id,
        }
    }
}
