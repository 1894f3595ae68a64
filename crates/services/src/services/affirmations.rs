//! Affirmation generation: prompt construction, model call, and normalization of the
//! model's free-form reply into an [`AffirmationSet`].
//!
//! Generation never fails from the caller's point of view. A failed model call or an
//! unusable reply is replaced with fixed fallback content, and the result says which
//! of the two the caller got (see [`Generated`]).

use std::sync::Arc;

use db::models::affirmation::{AffirmationSource, AffirmationType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::gemini_api::{GeminiApiError, TextModel};

pub const FALLBACK_AFFIRMATIONS: [&str; 5] = [
    "I am capable of overcoming this challenge",
    "I have the strength to work through this situation",
    "I am worthy of positive change and growth",
    "I trust in my ability to find solutions",
    "I am resilient and can handle whatever comes my way",
];

pub const FALLBACK_SOLUTIONS: [&str; 3] = [
    "Break down the problem into smaller, manageable steps",
    "Seek support from trusted friends, family, or professionals",
    "Practice self-care and maintain a positive mindset",
];

pub const FALLBACK_MOTIVATIONAL: [&str; 2] = [
    "Every challenge is an opportunity for growth and learning",
    "You have overcome difficulties before and you can do it again",
];

pub const FALLBACK_PERSONALIZED_AFFIRMATION: &str =
    "I am capable of overcoming this challenge and growing stronger through it.";

/// Affirmations, solutions and motivational statements for one problem.
/// Target lengths are 5/3/2 but whatever the model returned is kept as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct AffirmationSet {
    pub affirmations: Vec<String>,
    pub solutions: Vec<String>,
    pub motivational: Vec<String>,
}

impl AffirmationSet {
    pub fn fallback() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            affirmations: owned(&FALLBACK_AFFIRMATIONS),
            solutions: owned(&FALLBACK_SOLUTIONS),
            motivational: owned(&FALLBACK_MOTIVATIONAL),
        }
    }

    /// Every entry tagged with the kind of statement it is, affirmations first.
    pub fn entries(&self) -> impl Iterator<Item = (AffirmationType, &str)> + '_ {
        let positive = self
            .affirmations
            .iter()
            .map(|s| (AffirmationType::Positive, s.as_str()));
        let solutions = self
            .solutions
            .iter()
            .map(|s| (AffirmationType::Solution, s.as_str()));
        let motivational = self
            .motivational
            .iter()
            .map(|s| (AffirmationType::Motivational, s.as_str()));
        positive.chain(solutions).chain(motivational)
    }

    pub fn len(&self) -> usize {
        self.affirmations.len() + self.solutions.len() + self.motivational.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The problem attributes a prompt is built from.
#[derive(Debug, Clone)]
pub struct ProblemContext {
    pub category: String,
    pub title: String,
    pub description: String,
    pub severity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PersonalizationPreferences {
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_length")]
    pub length: String,
}

fn default_tone() -> String {
    "encouraging".to_string()
}

fn default_length() -> String {
    "medium".to_string()
}

impl Default for PersonalizationPreferences {
    fn default() -> Self {
        Self {
            tone: default_tone(),
            length: default_length(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no JSON object found in model output")]
    NoJsonObject,
    #[error("model output is not a valid affirmation set: {0}")]
    InvalidShape(String),
    #[error("model returned empty text")]
    Empty,
}

/// Why fallback content was substituted.
#[derive(Debug, Clone, Error)]
pub enum GenerationFailure {
    #[error("model call failed: {0}")]
    Network(#[from] GeminiApiError),
    #[error("could not decode model output: {0}")]
    Decode(#[from] DecodeError),
}

/// Result of a generation request: real model output, or fallback content plus the
/// reason the model output could not be used.
#[derive(Debug, Clone)]
pub enum Generated<T> {
    Model(T),
    Fallback { value: T, reason: GenerationFailure },
}

impl<T> Generated<T> {
    pub fn value(&self) -> &T {
        match self {
            Generated::Model(value) | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Generated::Model(value) | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback { .. })
    }

    pub fn source(&self) -> AffirmationSource {
        match self {
            Generated::Model(_) => AffirmationSource::Model,
            Generated::Fallback { .. } => AffirmationSource::Fallback,
        }
    }
}

/// Prompt asking for a full JSON set of affirmations, solutions and motivational statements.
pub fn build_full_set_prompt(context: &ProblemContext) -> String {
    format!(
        r#"You are a compassionate AI assistant specializing in creating personalized affirmations and solutions for personal growth.

Problem Details:
- Category: {category}
- Title: {title}
- Description: {description}
- Severity (1-10): {severity}

Please provide:
1. 5 positive affirmations that are specific, empowering, and directly address the problem
2. 3 practical solutions or action steps
3. 2 motivational statements

Format your response as JSON with this structure:
{{
  "affirmations": [
    "affirmation 1",
    "affirmation 2",
    "affirmation 3",
    "affirmation 4",
    "affirmation 5"
  ],
  "solutions": [
    "solution 1",
    "solution 2",
    "solution 3"
  ],
  "motivational": [
    "motivational statement 1",
    "motivational statement 2"
  ]
}}

Make the affirmations:
- Present tense and positive
- Specific to the problem
- Believable and achievable
- Empowering and encouraging
- Personal and direct (use "I" statements)

Make the solutions:
- Practical and actionable
- Specific steps they can take
- Realistic and achievable
- Directly related to the problem

Make the motivational statements:
- Inspiring and uplifting
- Focus on growth and potential
- Encourage persistence and self-belief
"#,
        category = context.category,
        title = context.title,
        description = context.description,
        severity = context.severity,
    )
}

/// Prompt asking for one bare affirmation sentence.
pub fn build_personalized_prompt(
    context: &ProblemContext,
    preferences: &PersonalizationPreferences,
) -> String {
    format!(
        r#"Create a personalized affirmation for someone dealing with:
Category: {category}
Problem: {description}
Tone: {tone}
Length: {length}

Generate a single, powerful affirmation that is:
- Personal and specific to their situation
- Positive and empowering
- Believable and achievable
- In present tense using "I" statements
- Tailored to their specific problem description

Return only the affirmation text, no additional formatting.
"#,
        category = context.category,
        description = context.description,
        tone = preferences.tone,
        length = preferences.length,
    )
}

/// The span from the first `{` to the last `}`, if there is one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode model output into an [`AffirmationSet`]. All three keys must be present and
/// hold arrays of strings; other keys are ignored and lengths are not checked.
pub fn decode_affirmation_set(text: &str) -> Result<AffirmationSet, DecodeError> {
    let json = extract_json_object(text).ok_or(DecodeError::NoJsonObject)?;
    serde_json::from_str(json).map_err(|e| DecodeError::InvalidShape(e.to_string()))
}

/// Decode, substituting the fallback set on failure.
pub fn normalize_response(text: &str) -> Generated<AffirmationSet> {
    match decode_affirmation_set(text) {
        Ok(set) => Generated::Model(set),
        Err(e) => Generated::Fallback {
            value: AffirmationSet::fallback(),
            reason: e.into(),
        },
    }
}

/// Single-affirmation output is taken verbatim after trimming.
pub fn normalize_personalized_response(text: &str) -> Generated<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Generated::Fallback {
            value: FALLBACK_PERSONALIZED_AFFIRMATION.to_string(),
            reason: DecodeError::Empty.into(),
        }
    } else {
        Generated::Model(trimmed.to_string())
    }
}

/// Builds prompts, calls the model once per request, and normalizes the reply.
#[derive(Clone)]
pub struct AffirmationGenerator {
    model: Arc<dyn TextModel>,
}

impl AffirmationGenerator {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    pub async fn generate_affirmations(&self, context: &ProblemContext) -> Generated<AffirmationSet> {
        let prompt = build_full_set_prompt(context);
        info!(
            category = %context.category,
            severity = context.severity,
            "Requesting affirmation set"
        );

        let generated = match self.model.generate(&prompt).await {
            Ok(text) => {
                debug!(response = %text, "Raw model response");
                normalize_response(&text)
            }
            Err(e) => Generated::Fallback {
                value: AffirmationSet::fallback(),
                reason: e.into(),
            },
        };

        if let Generated::Fallback { reason, .. } = &generated {
            warn!(error = %reason, "Using fallback affirmation set");
        }
        generated
    }

    pub async fn generate_personalized_affirmation(
        &self,
        context: &ProblemContext,
        preferences: &PersonalizationPreferences,
    ) -> Generated<String> {
        let prompt = build_personalized_prompt(context, preferences);

        let generated = match self.model.generate(&prompt).await {
            Ok(text) => normalize_personalized_response(&text),
            Err(e) => Generated::Fallback {
                value: FALLBACK_PERSONALIZED_AFFIRMATION.to_string(),
                reason: e.into(),
            },
        };

        if let Generated::Fallback { reason, .. } = &generated {
            warn!(error = %reason, "Using fallback personalized affirmation");
        }
        generated
    }
}
