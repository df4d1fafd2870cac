//! Token-level decoding for one 30-second Whisper window: prompt layout, timestamp
//! rules, beam search and splitting of timestamped output into segments.
//!
//! The decoder is independent of the model; it drives a closure that returns the
//! logits of the last position for a token sequence.

use std::cmp::Ordering;

/// Seconds per timestamp token step.
pub const TIME_PRECISION: f64 = 0.02;
/// Largest timestamp allowed as the first generated token, in timestamp steps (1 s).
const MAX_INITIAL_TIMESTAMP_STEPS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialTokens {
    pub sot: u32,
    pub eot: u32,
    pub transcribe: u32,
    pub no_timestamps: u32,
    pub start_of_prev: Option<u32>,
    pub timestamp_begin: Option<u32>,
    pub no_speech: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWindow {
    /// Generated tokens, without the prompt and without the final end-of-text.
    pub tokens: Vec<u32>,
    pub avg_logprob: f64,
    pub no_speech_prob: f64,
}

/// Text tokens with the window-relative times of the timestamps around them.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedTokens {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub tokens: Vec<u32>,
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    logprob: f64,
}

impl Hypothesis {
    fn score(&self) -> f64 {
        self.logprob / self.tokens.len().max(1) as f64
    }
}

pub struct WindowDecoder<'a> {
    special: &'a SpecialTokens,
    suppress: &'a [u32],
    beam_size: usize,
    sample_len: usize,
    n_ctx: Option<usize>,
}

impl<'a> WindowDecoder<'a> {
    pub fn new(
        special: &'a SpecialTokens,
        suppress: &'a [u32],
        beam_size: usize,
        sample_len: usize,
    ) -> Self {
        Self {
            special,
            suppress,
            beam_size: beam_size.max(1),
            sample_len,
            n_ctx: None,
        }
    }

    /// Caps prompt plus generated tokens at the model's text context.
    pub fn with_context_limit(mut self, n_ctx: usize) -> Self {
        self.n_ctx = Some(n_ctx);
        self
    }

    fn max_steps(&self, prompt_len: usize) -> usize {
        match self.n_ctx {
            Some(n_ctx) => self.sample_len.min(n_ctx.saturating_sub(prompt_len)),
            None => self.sample_len,
        }
    }

    /// `[<|startofprev|> previous...] <|startoftranscript|> [<|lang|>] <|transcribe|>
    /// [<|notimestamps|>]`
    pub fn prompt(&self, language_token: Option<u32>, previous: &[u32]) -> Vec<u32> {
        let mut tokens = Vec::with_capacity(previous.len() + 5);
        if let (Some(start_of_prev), false) = (self.special.start_of_prev, previous.is_empty()) {
            tokens.push(start_of_prev);
            tokens.extend_from_slice(previous);
        }
        tokens.push(self.special.sot);
        if let Some(lang) = language_token {
            tokens.push(lang);
        }
        tokens.push(self.special.transcribe);
        if self.special.timestamp_begin.is_none() {
            tokens.push(self.special.no_timestamps);
        }
        tokens
    }

    /// Beam search over one window. `last_logits(sequence, flush)` must return the
    /// logits of the final position; `flush` is true on the first call of the window.
    pub fn decode<F, E>(&self, prompt: &[u32], mut last_logits: F) -> Result<DecodedWindow, E>
    where
        F: FnMut(&[u32], bool) -> Result<Vec<f32>, E>,
    {
        let mut live = vec![Hypothesis {
            tokens: Vec::new(),
            logprob: 0.0,
        }];
        let mut finished: Vec<Hypothesis> = Vec::new();
        let mut no_speech_prob = 0.0;
        let max_steps = self.max_steps(prompt.len());
        let mut sequence = Vec::with_capacity(prompt.len() + max_steps);

        for step in 0..max_steps {
            let mut candidates: Vec<(usize, u32, f64)> = Vec::new();

            for (index, hypothesis) in live.iter().enumerate() {
                sequence.clear();
                sequence.extend_from_slice(prompt);
                sequence.extend_from_slice(&hypothesis.tokens);

                let mut logits = last_logits(&sequence, step == 0)?;

                if step == 0 {
                    no_speech_prob = self.no_speech_probability(&logits);
                }

                self.apply_rules(&mut logits, &hypothesis.tokens);
                log_softmax(&mut logits);

                for (token, logprob) in top_k(&logits, self.beam_size + 1) {
                    candidates.push((index, token, hypothesis.logprob + logprob as f64));
                }
            }

            candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

            let mut next = Vec::with_capacity(self.beam_size);
            for (index, token, logprob) in candidates {
                let mut tokens = live[index].tokens.clone();
                if token == self.special.eot {
                    finished.push(Hypothesis { tokens, logprob });
                } else {
                    tokens.push(token);
                    next.push(Hypothesis { tokens, logprob });
                }
                if next.len() == self.beam_size {
                    break;
                }
            }

            live = next;
            if finished.len() >= self.beam_size || live.is_empty() {
                break;
            }
        }

        if finished.is_empty() {
            finished = live;
        }

        let best = finished
            .into_iter()
            .max_by(|a, b| a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal))
            .unwrap_or(Hypothesis {
                tokens: Vec::new(),
                logprob: 0.0,
            });

        Ok(DecodedWindow {
            avg_logprob: best.score(),
            tokens: best.tokens,
            no_speech_prob,
        })
    }

    fn no_speech_probability(&self, logits: &[f32]) -> f64 {
        let Some(token) = self.special.no_speech else {
            return 0.0;
        };
        let mut probs = logits.to_vec();
        log_softmax(&mut probs);
        probs
            .get(token as usize)
            .map(|lp| (*lp as f64).exp())
            .unwrap_or(0.0)
    }

    fn apply_rules(&self, logits: &mut [f32], generated: &[u32]) {
        let special = self.special;
        for &token in self
            .suppress
            .iter()
            .chain([special.sot, special.transcribe, special.no_timestamps].iter())
            .chain(special.start_of_prev.iter())
            .chain(special.no_speech.iter())
        {
            mask(logits, token as usize..token as usize + 1);
        }

        // Everything between end-of-text and the timestamps is a control token.
        let controls_end = special
            .timestamp_begin
            .map(|t| t as usize)
            .unwrap_or(logits.len());
        mask(logits, special.eot as usize + 1..controls_end);

        let Some(ts_begin) = special.timestamp_begin else {
            return;
        };
        let ts_begin_idx = ts_begin as usize;

        let Some(&last) = generated.last() else {
            // The first token must be a timestamp no later than one second.
            mask(logits, 0..ts_begin_idx);
            mask(
                logits,
                (ts_begin + MAX_INITIAL_TIMESTAMP_STEPS + 1) as usize..logits.len(),
            );
            return;
        };

        let last_was_timestamp = last >= ts_begin;
        let penultimate_was_timestamp =
            generated.len() < 2 || generated[generated.len() - 2] >= ts_begin;

        if last_was_timestamp {
            if penultimate_was_timestamp {
                mask(logits, ts_begin_idx..logits.len());
            } else {
                mask(logits, 0..special.eot as usize);
            }
        }

        // Timestamps never go backwards.
        if let Some(&previous_ts) = generated.iter().rev().find(|&&t| t >= ts_begin) {
            mask(logits, ts_begin_idx..previous_ts as usize);
        }
    }
}

/// Splits `<|t0|> text <|t1|><|t1|> text <|t2|>` into timed runs of text tokens.
/// A trailing run without a closing timestamp gets `end: None`.
pub fn split_at_timestamps(tokens: &[u32], timestamp_begin: u32) -> Vec<TimedTokens> {
    let mut runs = Vec::new();
    let mut start = None;
    let mut current: Vec<u32> = Vec::new();

    for &token in tokens {
        if token >= timestamp_begin {
            let time = (token - timestamp_begin) as f64 * TIME_PRECISION;
            if !current.is_empty() {
                runs.push(TimedTokens {
                    start,
                    end: Some(time),
                    tokens: std::mem::take(&mut current),
                });
            }
            start = Some(time);
        } else {
            current.push(token);
        }
    }

    if !current.is_empty() {
        runs.push(TimedTokens {
            start,
            end: None,
            tokens: current,
        });
    }

    runs
}

fn mask(logits: &mut [f32], range: std::ops::Range<usize>) {
    let end = range.end.min(logits.len());
    if range.start < end {
        logits[range.start..end].fill(f32::NEG_INFINITY);
    }
}

/// In-place log-softmax; `-inf` entries stay `-inf`.
pub fn log_softmax(logits: &mut [f32]) {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let sum: f32 = logits.iter().map(|&l| (l - max).exp()).sum();
    let log_sum = max + sum.ln();
    for l in logits.iter_mut() {
        *l -= log_sum;
    }
}

/// The `k` largest finite entries, highest first.
pub fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut indexed: Vec<(u32, f32)> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as u32, v))
        .collect();

    let by_value_desc = |a: &(u32, f32), b: &(u32, f32)| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal);

    if indexed.len() > k && k > 0 {
        indexed.select_nth_unstable_by(k - 1, by_value_desc);
        indexed.truncate(k);
    }
    indexed.sort_by(by_value_desc);
    indexed.truncate(k);
    indexed
}
