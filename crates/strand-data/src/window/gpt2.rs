use crate::dataset::Dataset;
use crate::error::{DataError, DataResult};
use crate::tokenizer::{Document, TokenizedView};
use crate::window::{index_rng, LengthWeighting, WindowOptions};
use rand::Rng;

const SAMPLES_PER_DOCUMENT: usize = 1000;

/// Left-to-right LM window of `max_seq_len + 1` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gpt2Sample {
    pub tokens: Vec<u32>,
    pub loss_mask: Vec<u8>,
}

/// Randomly placed fixed-length windows over length-weighted documents.
#[derive(Clone)]
pub struct Gpt2Dataset {
    view: TokenizedView,
    weighting: LengthWeighting,
    num_samples: usize,
    max_seq_len: usize,
    sample_across_doc: bool,
    random_across_doc_sampling: bool,
    seed: u64,
}

impl Gpt2Dataset {
    pub fn new(view: TokenizedView, options: &WindowOptions) -> DataResult<Self> {
        if options.max_seq_len == 0 {
            return Err(DataError::InvalidConfig("seq_length must be positive".to_string()));
        }
        let weighting = LengthWeighting::new(&view)?;
        let num_samples = if view.is_empty() {
            0
        } else {
            options.num_samples.unwrap_or(SAMPLES_PER_DOCUMENT * view.len())
        };
        tracing::debug!(documents = view.len(), num_samples, "gpt2 windows ready");

        Ok(Self {
            view,
            weighting,
            num_samples,
            max_seq_len: options.max_seq_len,
            sample_across_doc: options.sample_across_doc,
            random_across_doc_sampling: options.random_across_doc_sampling,
            seed: options.seed,
        })
    }

    #[must_use]
    pub fn num_documents(&self) -> usize {
        self.view.len()
    }

    /// Document `index` with its end-of-sequence token appended.
    fn document(&self, index: usize) -> DataResult<Document> {
        let mut doc = self.view.get(index)?;
        doc.tokens.push(self.view.tokenizer().command_tokens().eos);
        doc.loss_mask.push(1);
        Ok(doc)
    }
}

impl Dataset for Gpt2Dataset {
    type Item = Gpt2Sample;

    fn len(&self) -> usize {
        self.num_samples
    }

    fn get(&self, index: usize) -> DataResult<Gpt2Sample> {
        if index >= self.num_samples {
            return Err(DataError::IndexOutOfBounds { index, len: self.num_samples });
        }
        let window = self.max_seq_len + 1;
        let mut rng = index_rng(self.seed, index);

        let mut doc_idx = self.weighting.sample(&mut rng);
        let Document { mut tokens, mut loss_mask } = self.document(doc_idx)?;

        if tokens.len() > window {
            let strip_left = rng.gen_range(0..=tokens.len() - window);
            tokens.drain(..strip_left);
            loss_mask.drain(..strip_left);
        }

        while tokens.len() < window && self.sample_across_doc {
            doc_idx = if self.random_across_doc_sampling {
                self.weighting.sample(&mut rng)
            } else {
                (doc_idx + 1) % self.view.len()
            };
            let next = self.document(doc_idx)?;
            tokens.extend(next.tokens);
            loss_mask.extend(next.loss_mask);
        }

        tokens.truncate(window);
        loss_mask.truncate(window);
        let pad = self.view.tokenizer().command_tokens().pad;
        loss_mask.resize(window, 0);
        tokens.resize(window, pad);

        Ok(Gpt2Sample { tokens, loss_mask })
    }
}
