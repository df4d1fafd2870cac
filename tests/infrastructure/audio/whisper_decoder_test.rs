use std::convert::Infallible;

use tingxie::infrastructure::audio::whisper_decoder::{
    SpecialTokens, TIME_PRECISION, WindowDecoder, log_softmax, split_at_timestamps, top_k,
};

const EOT: u32 = 10;
const TS: u32 = 16;
const VOCAB: usize = 116;

fn special() -> SpecialTokens {
    SpecialTokens {
        sot: 11,
        eot: EOT,
        transcribe: 12,
        no_timestamps: 13,
        start_of_prev: Some(14),
        timestamp_begin: Some(TS),
        no_speech: Some(15),
    }
}

fn one_hot(token: u32) -> Vec<f32> {
    let mut logits = vec![0.0; VOCAB];
    logits[token as usize] = 10.0;
    logits
}

#[test]
fn given_previous_text_when_building_prompt_then_context_precedes_start_token() {
    let special = special();
    let decoder = WindowDecoder::new(&special, &[], 5, 20);

    let prompt = decoder.prompt(Some(99), &[1, 2]);

    assert_eq!(prompt, vec![14, 1, 2, 11, 99, 12]);
}

#[test]
fn given_model_without_timestamps_when_building_prompt_then_no_timestamps_token_is_added() {
    let special = SpecialTokens {
        timestamp_begin: None,
        ..special()
    };
    let decoder = WindowDecoder::new(&special, &[], 1, 20);

    let prompt = decoder.prompt(None, &[]);

    assert_eq!(prompt, vec![11, 12, 13]);
}

#[test]
fn given_scripted_logits_when_decoding_then_timestamped_tokens_are_returned() {
    let special = special();
    let decoder = WindowDecoder::new(&special, &[], 1, 20);
    let prompt = decoder.prompt(None, &[]);
    let script = [TS, 3, 4, TS + 50, EOT];
    let mut flushes = Vec::new();

    let decoded = decoder
        .decode(&prompt, |sequence, flush| {
            flushes.push(flush);
            let step = sequence.len() - prompt.len();
            Ok::<_, Infallible>(one_hot(script[step]))
        })
        .unwrap();

    assert_eq!(decoded.tokens, vec![TS, 3, 4, TS + 50]);
    assert!(decoded.no_speech_prob < 0.01);
    assert!(decoded.avg_logprob > -0.1);
    assert_eq!(flushes.first(), Some(&true));
    assert!(flushes[1..].iter().all(|f| !f));
}

#[test]
fn given_text_first_logits_when_decoding_then_first_token_is_forced_to_timestamp() {
    let special = special();
    let decoder = WindowDecoder::new(&special, &[], 1, 3);
    let prompt = decoder.prompt(None, &[]);

    let decoded = decoder
        .decode(&prompt, |_, _| Ok::<_, Infallible>(one_hot(3)))
        .unwrap();

    let first = decoded.tokens[0];
    assert!((TS..=TS + 50).contains(&first));
}

#[test]
fn given_suppressed_token_when_decoding_then_it_is_never_chosen() {
    let special = special();
    let suppress = [3];
    let decoder = WindowDecoder::new(&special, &suppress, 2, 4);
    let prompt = decoder.prompt(None, &[]);

    let decoded = decoder
        .decode(&prompt, |_, _| Ok::<_, Infallible>(one_hot(3)))
        .unwrap();

    assert!(!decoded.tokens.contains(&3));
}

#[test]
fn given_failing_model_when_decoding_then_error_propagates() {
    let special = special();
    let decoder = WindowDecoder::new(&special, &[], 2, 4);
    let prompt = decoder.prompt(None, &[]);

    let result = decoder.decode(&prompt, |_, _| Err::<Vec<f32>, _>("forward failed"));

    assert_eq!(result.unwrap_err(), "forward failed");
}

#[test]
fn given_paired_timestamps_when_splitting_then_runs_carry_times() {
    let tokens = [TS, 1, 2, TS + 75, TS + 75, 3, TS + 150];

    let runs = split_at_timestamps(&tokens, TS);

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].tokens, vec![1, 2]);
    assert_eq!(runs[0].start, Some(0.0));
    assert_eq!(runs[0].end, Some(75.0 * TIME_PRECISION));
    assert_eq!(runs[1].tokens, vec![3]);
    assert_eq!(runs[1].end, Some(150.0 * TIME_PRECISION));
}

#[test]
fn given_unterminated_run_when_splitting_then_end_is_open() {
    let runs = split_at_timestamps(&[TS + 10, 5, 6], TS);

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].start, Some(10.0 * TIME_PRECISION));
    assert_eq!(runs[0].end, None);
}

#[test]
fn given_values_when_taking_top_k_then_largest_finite_come_first() {
    let values = [0.1, f32::NEG_INFINITY, 0.7, 0.3, 0.9];

    let top = top_k(&values, 3);

    assert_eq!(top, vec![(4, 0.9), (2, 0.7), (3, 0.3)]);
    assert!(top_k(&[f32::NEG_INFINITY], 2).is_empty());
}

#[test]
fn given_logits_when_applying_log_softmax_then_probabilities_sum_to_one() {
    let mut logits = vec![1.0, 2.0, 3.0, f32::NEG_INFINITY];

    log_softmax(&mut logits);

    let total: f32 = logits.iter().map(|l| l.exp()).sum();
    assert!((total - 1.0).abs() < 1e-5);
    assert_eq!(logits[3], f32::NEG_INFINITY);
}

#[test]
fn given_long_context_and_no_end_of_text_when_decoding_then_sequence_stays_within_model_context() {
    const N_CTX: usize = 448;
    let special = special();
    let decoder = WindowDecoder::new(&special, &[], 1, N_CTX / 2).with_context_limit(N_CTX);
    let previous = vec![1; N_CTX / 2 - 1];
    let prompt = decoder.prompt(None, &previous);
    let mut longest = 0;

    let decoded = decoder
        .decode(&prompt, |sequence, _| {
            longest = longest.max(sequence.len());
            if sequence.len() > N_CTX {
                return Err(format!("sequence past context: {}", sequence.len()));
            }
            let mut logits = one_hot(3);
            logits[EOT as usize] = -100.0;
            Ok(logits)
        })
        .unwrap();

    assert!(longest < N_CTX, "longest sequence {}", longest);
    assert_eq!(decoded.tokens.len(), N_CTX - prompt.len());
}
