

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};


pub const INTENT_COUNT: usize = 5;


#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum IntentLabel {
    Research,
    Answer,
    Transactional,
    News,
    Navigational,
}

impl IntentLabel {
    /// Position of the label in every score vector.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Research => 0,
            Self::Answer => 1,
            Self::Transactional => 2,
            Self::News => 3,
            Self::Navigational => 4,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    #[must_use]
    pub fn all() -> [Self; INTENT_COUNT] {
        [
            Self::Research,
            Self::Answer,
            Self::Transactional,
            Self::News,
            Self::Navigational,
        ]
    }


    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Research => {
                "Exploring a broad or complex topic that requires detailed explanations and offers significant scope for deeper investigation."
            }
            Self::Answer => {
                "A direct question seeking a specific, concise fact, definition, or set of instructions. Often starts with 'what is', 'how to', etc."
            }
            Self::Transactional => {
                "The intent to complete a commercial action. Examples: buying a product, viewing prices, ordering parts, signing up for a service, or tracking an order."
            }
            Self::News => {
                "Journalism, media reports, or live coverage about developing stories, politics, and breaking events."
            }
            Self::Navigational => {
                "The query itself is a destination. It contains a URL, domain, or a specific brand/app name used to go directly to that online property."
            }
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum IntentSource {
    /// Memory-informed LLM classification (source A).
    Memory,
    /// Zero-shot ensemble (source B).
    ZeroShot,
}


/// One confidence per label, indexed by [`IntentLabel::index`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentScores([f64; INTENT_COUNT]);

impl IntentScores {
    #[must_use]
    pub fn new(scores: [f64; INTENT_COUNT]) -> Self {
        Self(scores)
    }

    #[must_use]
    pub fn zeros() -> Self {
        Self([0.0; INTENT_COUNT])
    }

    #[must_use]
    pub fn one_hot(label: IntentLabel) -> Self {
        let mut scores = Self::zeros();
        scores.set(label, 1.0);
        scores
    }

    #[must_use]
    pub fn get(&self, label: IntentLabel) -> f64 {
        self.0[label.index()]
    }

    pub fn set(&mut self, label: IntentLabel, score: f64) {
        self.0[label.index()] = score;
    }

    #[must_use]
    pub fn as_array(&self) -> &[f64; INTENT_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (IntentLabel, f64)> + '_ {
        IntentLabel::all().into_iter().map(|label| (label, self.get(label)))
    }

    /// Highest score; the first label wins ties.
    #[must_use]
    pub fn best(&self) -> (IntentLabel, f64) {
        let mut best = (IntentLabel::Research, self.0[0]);
        for (label, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (label, score);
            }
        }
        best
    }

    /// First label whose score is strictly above `threshold`.
    #[must_use]
    pub fn first_above(&self, threshold: f64) -> Option<(IntentLabel, f64)> {
        self.iter().find(|(_, score)| *score > threshold)
    }

    #[must_use]
    pub fn rounded(&self, places: u32) -> Self {
        let mut out = *self;
        for value in out.0.iter_mut() {
            *value = crate::round_to(*value, places);
        }
        out
    }
}

impl From<[f64; INTENT_COUNT]> for IntentScores {
    fn from(scores: [f64; INTENT_COUNT]) -> Self {
        Self(scores)
    }
}
