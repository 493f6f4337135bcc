

use crate::core::error::{QueryMindError, Result};
use crate::core::intent::{IntentLabel, IntentScores, INTENT_COUNT};


pub const PHRASES_PER_LABEL: usize = 4;


/// Descriptive candidate phrases standing in for each label.
pub const PHRASE_BANK: [(IntentLabel, [&str; PHRASES_PER_LABEL]); INTENT_COUNT] = [
    (
        IntentLabel::Research,
        [
            "research and deep exploration",
            "investigate and understand comprehensively",
            "analyze multiple perspectives",
            "explore causes and effects",
        ],
    ),
    (
        IntentLabel::Answer,
        [
            "get a specific fact or answer",
            "find precise information",
            "obtain a direct definition",
            "get a quick factual response",
        ],
    ),
    (
        IntentLabel::Transactional,
        [
            "buy or purchase products",
            "complete a commercial transaction",
            "order items or services",
            "make a purchase decision",
        ],
    ),
    (
        IntentLabel::News,
        [
            "find current news updates",
            "get recent event information",
            "access breaking news",
            "find latest developments",
        ],
    ),
    (
        IntentLabel::Navigational,
        [
            "navigate to a website",
            "access a specific web page",
            "go to an online portal",
            "visit a particular domain",
        ],
    ),
];


pub const HYPOTHESIS_TEMPLATES: [&str; 4] = [
    "This query is about {}",
    "The user wants to {}",
    "This is a request to {}",
    "The purpose of this query is to {}",
];


/// Every phrase in label order. Score rows handed to [`average_scores`]
/// are aligned with this list.
pub fn candidate_phrases() -> Vec<&'static str> {
    PHRASE_BANK
        .iter()
        .flat_map(|(_, phrases)| phrases.iter().copied())
        .collect()
}


pub fn phrase_label(phrase: &str) -> Option<IntentLabel> {
    PHRASE_BANK
        .iter()
        .find(|(_, phrases)| phrases.contains(&phrase))
        .map(|(label, _)| *label)
}


/// Averages one row of phrase scores per template into a label vector.
///
/// Each label's score is the mean over all of its phrases under all templates.
pub fn average_scores(rows: &[Vec<f64>]) -> Result<IntentScores> {
    let phrases = candidate_phrases();
    let mut sums = [0.0_f64; INTENT_COUNT];
    let mut counts = [0_usize; INTENT_COUNT];

    for row in rows {
        if row.len() != phrases.len() {
            return Err(QueryMindError::MalformedEvidence(format!(
                "scorer returned {} scores for {} candidate phrases",
                row.len(),
                phrases.len()
            )));
        }
        for (phrase, score) in phrases.iter().zip(row) {
            if !score.is_finite() {
                return Err(QueryMindError::MalformedEvidence(format!(
                    "non-finite score for '{}'",
                    phrase
                )));
            }
            if let Some(label) = phrase_label(phrase) {
                sums[label.index()] += score;
                counts[label.index()] += 1;
            }
        }
    }

    let mut averaged = [0.0_f64; INTENT_COUNT];
    for (i, value) in averaged.iter_mut().enumerate() {
        if counts[i] > 0 {
            *value = sums[i] / counts[i] as f64;
        }
    }
    Ok(IntentScores::new(averaged))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_grid_shape() {
        let phrases = candidate_phrases();
        assert_eq!(phrases.len(), INTENT_COUNT * PHRASES_PER_LABEL);
        assert_eq!(phrases[0], "research and deep exploration");
        assert_eq!(phrase_label("access breaking news"), Some(IntentLabel::News));
        assert_eq!(phrase_label("unrelated"), None);
        assert!(HYPOTHESIS_TEMPLATES.iter().all(|t| t.contains("{}")));
    }

    #[test]
    fn test_phrase_bank_follows_label_order() {
        for (i, (label, _)) in PHRASE_BANK.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }

    #[test]
    fn test_average_over_phrases_and_templates() {
        // News phrases score 0.6 under one template and 0.2 under the other.
        let mut high = vec![0.0; 20];
        let mut low = vec![0.0; 20];
        for i in 12..16 {
            high[i] = 0.6;
            low[i] = 0.2;
        }
        high[0] = 0.4;

        let scores = average_scores(&[high, low]).unwrap();
        assert!((scores.get(IntentLabel::News) - 0.4).abs() < 1e-12);
        assert!((scores.get(IntentLabel::Research) - 0.05).abs() < 1e-12);
        assert_eq!(scores.get(IntentLabel::Answer), 0.0);
        assert_eq!(scores.best().0, IntentLabel::News);
    }

    #[test]
    fn test_average_rejects_misaligned_rows() {
        assert!(matches!(
            average_scores(&[vec![0.1; 19]]),
            Err(QueryMindError::MalformedEvidence(_))
        ));
        let mut row = vec![0.0; 20];
        row[3] = f64::NAN;
        assert!(average_scores(&[row]).is_err());
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(average_scores(&[]).unwrap(), IntentScores::zeros());
    }
}
