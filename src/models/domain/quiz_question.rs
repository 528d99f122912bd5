use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub order: i32,
    pub question: String,
    pub options: QuestionOptions,
    pub correct_answer: OptionLabel,
    pub topic: String,
    pub points: i32,
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The four answer choices. Always carries every label, so any `OptionLabel` resolves.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QuestionOptions {
    #[serde(rename = "A")]
    #[graphql(name = "A")]
    pub a: String,
    #[serde(rename = "B")]
    #[graphql(name = "B")]
    pub b: String,
    #[serde(rename = "C")]
    #[graphql(name = "C")]
    pub c: String,
    #[serde(rename = "D")]
    #[graphql(name = "D")]
    pub d: String,
}

#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Enum, Copy,
    JsonSchema,
)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] =
        [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn index(self) -> usize {
        match self {
            OptionLabel::A => 0,
            OptionLabel::B => 1,
            OptionLabel::C => 2,
            OptionLabel::D => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl std::str::FromStr for OptionLabel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            other => Err(format!("'{}' is not one of A, B, C, D", other)),
        }
    }
}

impl std::fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        };
        f.write_str(label)
    }
}

impl QuestionOptions {
    pub fn get(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.a,
            OptionLabel::B => &self.b,
            OptionLabel::C => &self.c,
            OptionLabel::D => &self.d,
        }
    }

    pub fn to_array(&self) -> [String; 4] {
        [self.a.clone(), self.b.clone(), self.c.clone(), self.d.clone()]
    }

    pub fn from_array(texts: [String; 4]) -> Self {
        let [a, b, c, d] = texts;
        QuestionOptions { a, b, c, d }
    }

    pub fn has_blank_option(&self) -> bool {
        OptionLabel::ALL
            .iter()
            .any(|label| self.get(*label).trim().is_empty())
    }
}

impl Question {
    pub fn correct_text(&self) -> &str {
        self.options.get(self.correct_answer)
    }

    pub fn is_correct(&self, selected: OptionLabel) -> bool {
        selected == self.correct_answer
    }
}
