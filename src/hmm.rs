/********** Hidden Markov Model (HMM) Decoding Module **********
* Discrete-time, discrete-emission HMMs: a fixed set of hidden states
* evolves under a row-stochastic transition matrix, and each state emits
* a symbol from a finite observation alphabet under a row-stochastic
* emission matrix.
*
* The core of the module is the Viterbi decoder (see the viterbi
* submodule), which recovers the single most probable hidden-state path
* for an observed symbol sequence. HMMInstance wraps the decoder with
* full model validation and label-level convenience methods.
**********/

use rand::Rng;

pub mod alphabet;
pub mod hmm_instance;
pub mod hmm_matrices;
pub mod hmm_tools;
pub mod state;
pub mod viterbi;
use hmm_matrices::*;
use state::*;

pub struct HMM {}

impl HMM {
    /// Sample a hidden-state path and the symbol sequence it emits.
    ///
    /// Returns (state ids, symbol ids), both of length `time_steps`.
    /// The caller is expected to pass a validated model; sampling from
    /// malformed rows yields an arbitrary (but in-range) draw.
    pub fn gen_sequence(
        states: &[State],
        start_matrix: &StartMatrix,
        transition_matrix: &TransitionMatrix,
        emission_matrix: &EmissionMatrix,
        time_steps: usize,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut rng = rand::thread_rng();
        let mut sequence = Vec::with_capacity(time_steps);
        let mut symbols = Vec::with_capacity(time_steps);

        if time_steps == 0 || states.is_empty() {
            return (sequence, symbols);
        }

        // Choose the initial state based on the start matrix
        let mut current_state = sample_index(&start_matrix.matrix, &mut rng);
        sequence.push(current_state);
        symbols.push(sample_index(&emission_matrix.matrix[current_state], &mut rng));

        // Walk the chain, emitting one symbol per step
        for _ in 1..time_steps {
            current_state = sample_index(&transition_matrix.matrix[current_state], &mut rng);
            sequence.push(current_state);
            symbols.push(sample_index(&emission_matrix.matrix[current_state], &mut rng));
        }

        (sequence, symbols)
    }
}

// Draw an index from a probability row by walking the cumulative mass.
// Falls back to the last index if the row under-sums due to rounding.
fn sample_index<R: Rng>(probs: &[f64], rng: &mut R) -> usize {
    let random_value = rng.gen_range(0.0..1.0);
    let mut cumulative_prob = 0.0;

    for (idx, &prob) in probs.iter().enumerate() {
        cumulative_prob += prob;
        if random_value < cumulative_prob {
            return idx;
        }
    }

    probs.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_model() -> (Vec<State>, StartMatrix, TransitionMatrix, EmissionMatrix) {
        let states = vec![
            State::new(0, "H1").unwrap(),
            State::new(1, "H2").unwrap(),
        ];
        let start_matrix = StartMatrix::new(vec![0.6, 0.4]);
        let transition_matrix = TransitionMatrix::new(vec![
            vec![0.7, 0.3],
            vec![0.4, 0.6],
        ]);
        let emission_matrix = EmissionMatrix::new(vec![
            vec![0.1, 0.4, 0.5],
            vec![0.6, 0.3, 0.1],
        ]);

        (states, start_matrix, transition_matrix, emission_matrix)
    }

    // Test that generated sequences have the requested length
    #[test]
    fn test_gen_sequence_length() {
        let (states, start, transition, emission) = demo_model();
        let (sequence, symbols) = HMM::gen_sequence(&states, &start, &transition, &emission, 50);

        assert_eq!(sequence.len(), 50);
        assert_eq!(symbols.len(), 50);
    }

    // Test that generated ids stay within the model's ranges
    #[test]
    fn test_gen_sequence_in_range() {
        let (states, start, transition, emission) = demo_model();
        let (sequence, symbols) = HMM::gen_sequence(&states, &start, &transition, &emission, 200);

        assert!(sequence.iter().all(|&id| id < states.len()));
        assert!(symbols.iter().all(|&id| id < 3));
    }

    // Test that zero time steps produce empty sequences
    #[test]
    fn test_gen_sequence_empty() {
        let (states, start, transition, emission) = demo_model();
        let (sequence, symbols) = HMM::gen_sequence(&states, &start, &transition, &emission, 0);

        assert!(sequence.is_empty());
        assert!(symbols.is_empty());
    }

    // Test that a deterministic emission row always emits the same symbol
    #[test]
    fn test_gen_sequence_deterministic_emissions() {
        let states = vec![State::new(0, "only").unwrap()];
        let start = StartMatrix::new(vec![1.0]);
        let transition = TransitionMatrix::new(vec![vec![1.0]]);
        let emission = EmissionMatrix::new(vec![vec![0.0, 1.0]]);

        let (sequence, symbols) = HMM::gen_sequence(&states, &start, &transition, &emission, 20);

        assert!(sequence.iter().all(|&id| id == 0));
        assert!(symbols.iter().all(|&id| id == 1));
    }
}
