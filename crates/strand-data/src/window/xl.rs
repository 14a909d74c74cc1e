use crate::dataset::Dataset;
use crate::error::{DataError, DataResult};
use crate::tokenizer::TokenizedView;
use crate::window::WindowOptions;

/// Transformer-XL segment with its recurrence attention mask.
///
/// `attention_mask` has `max_seq_len` rows and `mem_len + max_seq_len`
/// columns; the first `mem_len` columns address the memory segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlSample {
    pub tokens: Vec<u32>,
    pub targets: Vec<u32>,
    pub loss_mask: Vec<u8>,
    pub attention_mask: Vec<Vec<u8>>,
}

/// Contiguous segments laid over the concatenated documents.
///
/// Document `d` contributes one position per token, each predicting the
/// token after it (the last one predicts `eos`). Across documents, segment `i`
/// starts at position `i * max_seq_len` of that stream. Otherwise every
/// document is cut into its own segments, the last one padded.
#[derive(Clone)]
pub struct XlDataset {
    view: TokenizedView,
    /// End position of each document in the position stream.
    indices: Vec<usize>,
    /// Stream position where each segment starts.
    starts: Vec<usize>,
    max_seq_len: usize,
    mem_len: usize,
    sample_across_doc: bool,
}

impl XlDataset {
    pub fn new(view: TokenizedView, options: &WindowOptions) -> DataResult<Self> {
        if options.max_seq_len == 0 {
            return Err(DataError::InvalidConfig("seq_length must be positive".to_string()));
        }

        let mut indices = Vec::with_capacity(view.len());
        let mut total = 0;
        for idx in 0..view.len() {
            total += view.get(idx)?.len();
            indices.push(total);
        }
        let seq = options.max_seq_len;
        let starts: Vec<usize> = if total == 0 {
            Vec::new()
        } else if options.sample_across_doc {
            (0..=total / seq).map(|i| i * seq).collect()
        } else {
            let mut starts = Vec::new();
            let mut doc_start = 0;
            for &doc_end in &indices {
                starts.extend((doc_start..doc_end).step_by(seq));
                doc_start = doc_end;
            }
            starts
        };
        tracing::debug!(documents = view.len(), total_tokens = total, segments = starts.len(), "xl segments ready");

        Ok(Self {
            view,
            indices,
            starts,
            max_seq_len: options.max_seq_len,
            mem_len: options.mem_len.unwrap_or(options.max_seq_len),
            sample_across_doc: options.sample_across_doc,
        })
    }

    #[must_use]
    pub fn num_documents(&self) -> usize {
        self.view.len()
    }

    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.indices.last().copied().unwrap_or(0)
    }
}

impl Dataset for XlDataset {
    type Item = XlSample;

    fn len(&self) -> usize {
        self.starts.len()
    }

    fn get(&self, index: usize) -> DataResult<XlSample> {
        let len = self.len();
        if index >= len {
            return Err(DataError::IndexOutOfBounds { index, len });
        }
        let commands = self.view.tokenizer().command_tokens();
        let (seq, mem) = (self.max_seq_len, self.mem_len);

        let mut attention_mask: Vec<Vec<u8>> =
            (0..seq).map(|_| [vec![0u8; mem], vec![1u8; seq]].concat()).collect();

        let start = self.starts[index];
        let mut doc_idx = self.indices.partition_point(|&end| end <= start);
        let doc_start = if doc_idx == 0 { 0 } else { self.indices[doc_idx - 1] };
        let mut offset = start - doc_start;

        if offset != 0 {
            let history = mem.min(offset);
            for row in &mut attention_mask {
                row[mem - history..mem].fill(1);
            }
        }

        let mut tokens = Vec::with_capacity(seq);
        let mut targets = Vec::with_capacity(seq);
        let mut loss_mask = Vec::with_capacity(seq);
        let mut first = true;

        while tokens.len() < seq && doc_idx < self.view.len() {
            let doc = self.view.get(doc_idx)?;
            let mut stream = doc.tokens;
            stream.push(commands.eos);
            let mut masks = doc.loss_mask;
            masks.push(1);

            let positions = stream.len() - 1;
            let end = positions.min(offset + seq - tokens.len());
            let segment_start = tokens.len();
            if end > offset {
                tokens.extend_from_slice(&stream[offset..end]);
                targets.extend_from_slice(&stream[offset + 1..=end]);
                loss_mask.extend_from_slice(&masks[offset + 1..=end]);
            }

            if !first && tokens.len() > segment_start {
                // A new document may not attend to memory or earlier documents.
                for row in &mut attention_mask[segment_start..] {
                    row[..mem + segment_start].fill(0);
                }
            }

            first = false;
            doc_idx += 1;
            offset = 0;
            if !self.sample_across_doc {
                break;
            }
        }

        tokens.resize(seq, commands.pad);
        targets.resize(seq, commands.pad);
        loss_mask.resize(seq, 0);

        Ok(XlSample { tokens, targets, loss_mask, attention_mask })
    }
}
