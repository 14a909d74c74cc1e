use crate::dataset::Dataset;
use crate::error::{DataError, DataResult};
use crate::tokenizer::TokenizedView;
use crate::window::{index_rng, LengthWeighting, WindowOptions};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

const MASK_LM_PROB: f64 = 0.15;
const SHORT_SEQ_PROB: f64 = 0.01;
const MIN_SEQ_LEN: usize = 5;
/// Weighted draws before falling back to a uniform pick, and pair attempts per sample.
const MAX_DRAWS: usize = 100;

/// Masked-LM sentence pair `[CLS] A [SEP] B [SEP]`, padded to `max_seq_len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BertSample {
    pub tokens: Vec<u32>,
    /// Segment ids: 0 for `[CLS] A [SEP]`, 1 for `B [SEP]`, 0 for padding.
    pub types: Vec<u8>,
    pub is_random_next: bool,
    /// 1 where a masked-LM prediction is made.
    pub mask: Vec<u8>,
    /// Original token at masked positions, -1 elsewhere.
    pub mask_labels: Vec<i64>,
    /// 1 over padding.
    pub pad_mask: Vec<u8>,
}

#[derive(Clone)]
pub struct BertSentencePairDataset {
    view: TokenizedView,
    weighting: LengthWeighting,
    /// Sorted indices of documents with at least one sentence.
    with_sentences: Vec<usize>,
    num_samples: usize,
    max_seq_len: usize,
    max_preds_per_seq: usize,
    presplit_sentences: bool,
    seed: u64,
}

impl BertSentencePairDataset {
    pub fn new(view: TokenizedView, options: &WindowOptions) -> DataResult<Self> {
        if options.max_seq_len < MIN_SEQ_LEN {
            return Err(DataError::InvalidConfig(format!(
                "seq_length must be at least {MIN_SEQ_LEN} for sentence pairs, got {}",
                options.max_seq_len
            )));
        }

        let mut with_sentences = Vec::new();
        for idx in 0..view.len() {
            if !view.sentences(idx, options.presplit_sentences)?.is_empty() {
                with_sentences.push(idx);
            }
        }

        let documents = view.len();
        let num_samples = if documents < 2 || with_sentences.is_empty() {
            0
        } else {
            options.num_samples.unwrap_or(documents * (documents - 1))
        };
        let max_preds_per_seq = (options.max_seq_len as f64 * MASK_LM_PROB / 10.0).ceil() as usize * 10;

        Ok(Self {
            weighting: LengthWeighting::new(&view)?,
            with_sentences,
            view,
            num_samples,
            max_seq_len: options.max_seq_len,
            max_preds_per_seq,
            presplit_sentences: options.presplit_sentences,
            seed: options.seed,
        })
    }

    #[must_use]
    pub fn num_documents(&self) -> usize {
        self.view.len()
    }

    fn has_sentences(&self, idx: usize) -> bool {
        self.with_sentences.binary_search(&idx).is_ok()
    }

    /// Length-weighted draw of a document with at least one sentence.
    fn draw_document(&self, rng: &mut StdRng) -> DataResult<(usize, Vec<Vec<u32>>)> {
        let mut picked = None;
        for _ in 0..MAX_DRAWS {
            let idx = self.weighting.sample(rng);
            if self.has_sentences(idx) {
                picked = Some(idx);
                break;
            }
        }
        let idx = match picked {
            Some(idx) => idx,
            None => *self
                .with_sentences
                .choose(rng)
                .ok_or_else(|| DataError::InvalidConfig("no document has any sentences".to_string()))?,
        };
        Ok((idx, self.view.sentences(idx, self.presplit_sentences)?))
    }

    /// Uniform draw of a document with sentences other than `exclude`.
    fn draw_other_document(&self, rng: &mut StdRng, exclude: usize) -> DataResult<Option<Vec<Vec<u32>>>> {
        let candidates = &self.with_sentences;
        let pick = match candidates.binary_search(&exclude) {
            Ok(_) if candidates.len() < 2 => return Ok(None),
            Ok(pos) => {
                let pick = rng.gen_range(0..candidates.len() - 1);
                if pick >= pos { pick + 1 } else { pick }
            }
            Err(_) if candidates.is_empty() => return Ok(None),
            Err(_) => rng.gen_range(0..candidates.len()),
        };
        Ok(Some(self.view.sentences(candidates[pick], self.presplit_sentences)?))
    }

    /// Segment A from consecutive sentences of one document, segment B either
    /// its continuation or a span of another document.
    ///
    /// With no other document to draw from, B continues A; a lone sentence is
    /// cut in two.
    fn sentence_pair(&self, target_len: usize, rng: &mut StdRng) -> DataResult<(Vec<u32>, Vec<u32>, bool)> {
        let (doc_a_idx, doc_a) = self.draw_document(rng)?;

        let mut chunks: Vec<&[u32]> = Vec::new();
        let mut current_len = 0;
        for sentence in &doc_a[rng.gen_range(0..doc_a.len())..] {
            chunks.push(sentence);
            current_len += sentence.len();
            if current_len >= target_len {
                break;
            }
        }

        let num_a = if chunks.len() >= 2 { rng.gen_range(1..chunks.len()) } else { 1 };
        let tokens_a = chunks[..num_a].concat();

        if chunks.len() == 1 || rng.gen_bool(0.5) {
            if let Some(doc_b) = self.draw_other_document(rng, doc_a_idx)? {
                let target_b = target_len.saturating_sub(tokens_a.len()).max(1);
                let mut tokens_b = Vec::new();
                for sentence in &doc_b[rng.gen_range(0..doc_b.len())..] {
                    tokens_b.extend_from_slice(sentence);
                    if tokens_b.len() >= target_b {
                        break;
                    }
                }
                return Ok((tokens_a, tokens_b, true));
            }
        }

        if chunks.len() >= 2 {
            return Ok((tokens_a, chunks[num_a..].concat(), false));
        }
        let sentence = chunks[0];
        let cut = if sentence.len() >= 2 { rng.gen_range(1..sentence.len()) } else { sentence.len() };
        Ok((sentence[..cut].to_vec(), sentence[cut..].to_vec(), false))
    }

    /// Trim the longer segment from a random end until the pair fits.
    fn truncate_pair(&self, a: &mut Vec<u32>, b: &mut Vec<u32>, rng: &mut StdRng) {
        let max_tokens = self.max_seq_len - 3;
        while a.len() + b.len() > max_tokens {
            let longer = if a.len() > b.len() { &mut *a } else { &mut *b };
            if rng.gen_bool(0.5) {
                longer.remove(0);
            } else {
                longer.pop();
            }
        }
    }

    fn masked_sample(&self, a: &[u32], b: &[u32], is_random_next: bool, rng: &mut StdRng) -> BertSample {
        let commands = *self.view.tokenizer().command_tokens();
        let vocab = self.view.tokenizer().text_token_range();

        let mut tokens = Vec::with_capacity(self.max_seq_len);
        tokens.push(commands.cls);
        tokens.extend_from_slice(a);
        tokens.push(commands.sep);
        tokens.extend_from_slice(b);
        tokens.push(commands.sep);
        let used = tokens.len();

        let mut types = vec![0u8; a.len() + 2];
        types.resize(used, 1);

        let mut candidates: Vec<usize> = (1..=a.len()).chain(a.len() + 2..a.len() + 2 + b.len()).collect();
        candidates.shuffle(rng);
        let by_ratio = ((used as f64 * MASK_LM_PROB).round() as usize).max(1);
        let mut chosen = candidates[..by_ratio.min(self.max_preds_per_seq).min(candidates.len())].to_vec();
        chosen.sort_unstable();

        tokens.resize(self.max_seq_len, commands.pad);
        types.resize(self.max_seq_len, 0);
        let mut pad_mask = vec![0u8; used];
        pad_mask.resize(self.max_seq_len, 1);

        let mut mask = vec![0u8; self.max_seq_len];
        let mut mask_labels = vec![-1i64; self.max_seq_len];
        for idx in chosen {
            let label = tokens[idx];
            tokens[idx] = if rng.gen_bool(0.8) {
                commands.mask
            } else if rng.gen_bool(0.5) || vocab.is_empty() {
                label
            } else {
                rng.gen_range(vocab.clone())
            };
            mask[idx] = 1;
            mask_labels[idx] = i64::from(label);
        }

        BertSample { tokens, types, is_random_next, mask, mask_labels, pad_mask }
    }
}

impl Dataset for BertSentencePairDataset {
    type Item = BertSample;

    fn len(&self) -> usize {
        self.num_samples
    }

    fn get(&self, index: usize) -> DataResult<BertSample> {
        if index >= self.num_samples {
            return Err(DataError::IndexOutOfBounds { index, len: self.num_samples });
        }
        let mut rng = index_rng(self.seed, index);

        let target_len = if rng.gen_bool(SHORT_SEQ_PROB) {
            rng.gen_range(2..=self.max_seq_len)
        } else {
            self.max_seq_len
        };

        for _ in 0..MAX_DRAWS {
            let (mut a, mut b, is_random_next) = self.sentence_pair(target_len, &mut rng)?;
            if a.is_empty() || b.is_empty() {
                continue;
            }
            self.truncate_pair(&mut a, &mut b, &mut rng);
            return Ok(self.masked_sample(&a, &b, is_random_next, &mut rng));
        }
        Err(DataError::InvalidConfig(format!("could not build a sentence pair for sample {index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::test_support::view;

    const DOCS: [&str; 4] = [
        "The cat sat on the mat. It was warm. Then it slept.",
        "Rain fell all day! The river rose. Boats stayed home.",
        "A short one.",
        "Winter came early. Snow covered the hills. Children built forts. Parents shovelled.",
    ];

    fn dataset(max_seq_len: usize) -> BertSentencePairDataset {
        let options = WindowOptions { max_seq_len, ..Default::default() };
        BertSentencePairDataset::new(view(&DOCS), &options).unwrap()
    }

    #[test]
    fn test_length_is_document_pairs() {
        let ds = dataset(32);
        assert_eq!(ds.len(), 12);
        assert!(ds.get(12).is_err());
        assert_eq!(ds.max_preds_per_seq, 10);
    }

    #[test]
    fn test_sample_layout() {
        let ds = dataset(32);
        let commands = *ds.view.tokenizer().command_tokens();

        for idx in 0..ds.len() {
            let sample = ds.get(idx).unwrap();
            assert_eq!(sample.tokens.len(), 32);
            assert_eq!(sample.types.len(), 32);
            assert_eq!(sample.mask.len(), 32);
            assert_eq!(sample.mask_labels.len(), 32);
            assert_eq!(sample.tokens[0], commands.cls);
            assert_eq!(sample.tokens.iter().filter(|t| **t == commands.sep).count(), 2);

            let used = sample.pad_mask.iter().filter(|p| **p == 0).count();
            assert!(used <= 32);
            assert!(sample.pad_mask[..used].iter().all(|p| *p == 0));
            assert!(sample.tokens[used..].iter().all(|t| *t == commands.pad));
            assert_eq!(sample.types[used - 1], 1);

            let predictions = sample.mask.iter().filter(|m| **m == 1).count();
            assert!((1..=10).contains(&predictions));
            for (pos, m) in sample.mask.iter().enumerate() {
                assert_eq!(*m == 1, sample.mask_labels[pos] >= 0);
            }
        }
    }

    #[test]
    fn test_get_is_deterministic() {
        let ds = dataset(24);
        for idx in 0..ds.len() {
            assert_eq!(ds.get(idx).unwrap(), ds.get(idx).unwrap());
        }
    }

    #[test]
    fn test_pairs_truncated_to_fit() {
        let ds = dataset(8);
        for idx in 0..ds.len() {
            let sample = ds.get(idx).unwrap();
            assert_eq!(sample.tokens.len(), 8);
            assert_eq!(sample.pad_mask.iter().filter(|p| **p == 0).count(), 8);
        }
    }

    #[test]
    fn test_rejects_tiny_sequences() {
        let options = WindowOptions { max_seq_len: 4, ..Default::default() };
        assert!(BertSentencePairDataset::new(view(&DOCS), &options).is_err());
    }

    #[test]
    fn test_blank_document_is_never_drawn() {
        let options = WindowOptions { max_seq_len: 16, ..Default::default() };
        let ds = BertSentencePairDataset::new(view(&["Hello there. General Kenobi.", "   "]), &options).unwrap();
        assert_eq!(ds.len(), 2);
        for idx in 0..ds.len() {
            let sample = ds.get(idx).unwrap();
            assert!(!sample.is_random_next);
            assert_eq!(sample.tokens.len(), 16);
        }
    }

    #[test]
    fn test_no_sentences_anywhere_has_no_pairs() {
        let options = WindowOptions { max_seq_len: 16, ..Default::default() };
        let ds = BertSentencePairDataset::new(view(&["  ", "\n"]), &options).unwrap();
        assert_eq!(ds.len(), 0);
    }

    #[test]
    fn test_single_document_has_no_pairs() {
        let options = WindowOptions { max_seq_len: 16, ..Default::default() };
        let ds = BertSentencePairDataset::new(view(&["Only. One."]), &options).unwrap();
        assert_eq!(ds.len(), 0);
    }
}
