use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

/// Letters in every guess and target
pub const WORD_LENGTH: usize = 5;

/// Guess slots per game
pub const MAX_GUESSES: usize = 6;

/// Tile and key colouring for a letter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// Right letter, right position
    Correct,
    /// Letter occurs somewhere in the target
    Present,
    /// Letter does not occur in the target
    Absent,
}

/// A five-letter upper-case word
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn letter(&self, index: usize) -> Option<char> {
        self.0.as_bytes().get(index).map(|&b| b as char)
    }

    pub fn contains(&self, letter: char) -> bool {
        self.0.contains(letter)
    }

    pub fn letters(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }
}

impl FromStr for Word {
    type Err = AppError;

    /// Accepts any case; stored upper-case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_uppercase();
        if word.len() != WORD_LENGTH || !word.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(AppError::InvalidInput(format!(
                "Expected a {}-letter word, got {:?}",
                WORD_LENGTH, s
            )));
        }
        Ok(Self(word))
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The Wordle target for one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordlePuzzle {
    pub date: NaiveDate,
    pub word: Word,
}

impl WordlePuzzle {
    pub fn parse(date: NaiveDate, word: &str) -> Result<Self, AppError> {
        let word = word
            .parse()
            .map_err(|_| AppError::InvalidPuzzle(format!("Stored word {:?} is not playable", word)))?;
        Ok(Self { date, word })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_is_uppercased() {
        let word: Word = "crane".parse().unwrap();
        assert_eq!(word.as_str(), "CRANE");
        assert_eq!(word.letter(2), Some('A'));
        assert_eq!(word.letter(5), None);
    }

    #[test]
    fn test_word_rejects_wrong_length_and_symbols() {
        assert!("cranes".parse::<Word>().is_err());
        assert!("cr4ne".parse::<Word>().is_err());
        assert!("".parse::<Word>().is_err());
    }

    #[test]
    fn test_puzzle_with_bad_word_is_invalid_puzzle() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 14).unwrap();
        let err = WordlePuzzle::parse(date, "toolong").unwrap_err();
        assert!(matches!(err, AppError::InvalidPuzzle(_)));
    }

    #[test]
    fn test_feedback_serialization() {
        assert_eq!(serde_json::to_string(&Feedback::Correct).unwrap(), "\"correct\"");
        assert_eq!(serde_json::to_string(&Feedback::Absent).unwrap(), "\"absent\"");
    }
}
