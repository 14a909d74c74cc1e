use crate::error::{DataError, DataResult};
use crate::tokenizer::{coverage_alphabet, CommandTokens, Tokenizer, NUM_COMMAND_TOKENS};
use std::collections::HashMap;

/// One id per character, fitted on corpus character frequencies.
///
/// Command tokens take ids `0..7`; characters follow in descending frequency.
/// Characters outside the fitted alphabet encode to `unk`.
#[derive(Debug, Clone)]
pub struct CharacterLevelTokenizer {
    alphabet: Vec<char>,
    ids: HashMap<char, u32>,
    commands: CommandTokens,
}

impl CharacterLevelTokenizer {
    pub fn fit<'a>(
        texts: impl IntoIterator<Item = &'a str>,
        vocab_size: Option<usize>,
        coverage: f64,
        pad_token: u32,
    ) -> DataResult<Self> {
        let commands = CommandTokens::from_layout(&CommandTokens::layout(pad_token)?);

        let mut alphabet = coverage_alphabet(texts, coverage);
        if let Some(limit) = vocab_size {
            if limit <= NUM_COMMAND_TOKENS {
                return Err(DataError::InvalidConfig(format!(
                    "vocab_size must exceed the {NUM_COMMAND_TOKENS} command tokens, got {limit}"
                )));
            }
            alphabet.truncate(limit - NUM_COMMAND_TOKENS);
        }

        Ok(Self::from_alphabet(alphabet, commands))
    }

    /// Tokenizer over a fixed alphabet, in id order.
    #[must_use]
    pub fn from_alphabet(alphabet: Vec<char>, commands: CommandTokens) -> Self {
        let ids = alphabet
            .iter()
            .enumerate()
            .map(|(i, ch)| (*ch, (NUM_COMMAND_TOKENS + i) as u32))
            .collect();
        Self { alphabet, ids, commands }
    }

    #[must_use]
    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Characters for text ids; command and unknown ids are skipped.
    #[must_use]
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter()
            .filter_map(|id| {
                let idx = (*id as usize).checked_sub(NUM_COMMAND_TOKENS)?;
                self.alphabet.get(idx)
            })
            .collect()
    }
}

impl Tokenizer for CharacterLevelTokenizer {
    fn name(&self) -> &'static str {
        "CharacterLevelTokenizer"
    }

    fn encode(&self, text: &str) -> DataResult<Vec<u32>> {
        Ok(text.chars().map(|ch| self.ids.get(&ch).copied().unwrap_or(self.commands.unk)).collect())
    }

    fn vocab_size(&self) -> usize {
        NUM_COMMAND_TOKENS + self.alphabet.len()
    }

    fn command_tokens(&self) -> &CommandTokens {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_frequency() {
        let tok = CharacterLevelTokenizer::fit(["abb", "bcb"], None, 1.0, 0).unwrap();
        assert_eq!(tok.alphabet(), &['b', 'a', 'c']);
        assert_eq!(tok.encode("bac").unwrap(), vec![7, 8, 9]);
        assert_eq!(tok.decode(&[7, 1, 8]), "ba");
    }

    #[test]
    fn test_vocab_size_caps_alphabet() {
        let tok = CharacterLevelTokenizer::fit(["aaabbc"], Some(9), 1.0, 0).unwrap();
        assert_eq!(tok.vocab_size(), 9);
        let unk = tok.command_tokens().unk;
        assert_eq!(tok.encode("c").unwrap(), vec![unk]);
        assert!(CharacterLevelTokenizer::fit(["a"], Some(7), 1.0, 0).is_err());
    }

    #[test]
    fn test_pad_token_position() {
        let tok = CharacterLevelTokenizer::fit(["a"], None, 1.0, 2).unwrap();
        assert_eq!(tok.command_tokens().pad, 2);
        assert_eq!(tok.command_tokens().bos, 0);
    }

    #[test]
    fn test_text_token_range_excludes_commands() {
        let tok = CharacterLevelTokenizer::fit(["xyz"], None, 1.0, 0).unwrap();
        assert_eq!(tok.text_token_range(), 7..10);
    }
}
