use std::collections::HashSet;

use super::alphabet::{Alphabet, AlphabetError};
use super::hmm_matrices::*;
use super::state::*;
use super::viterbi::*;

/// Validated front door to the decoder: cross-checks states, alphabet and
/// matrices against each other before any decoding runs, and translates
/// between symbol/state labels and the integer ids the decoder works on.
pub struct HMMInstance<'a> {
    states: Option<&'a [State]>,
    alphabet: Option<&'a Alphabet>,
    start_matrix: Option<&'a StartMatrix>,
    transition_matrix: Option<&'a TransitionMatrix>,
    emission_matrix: Option<&'a EmissionMatrix>,

    viterbi: Viterbi<'a>,
}

impl<'a> HMMInstance<'a> {
    pub fn new(
        states: &'a [State],
        alphabet: &'a Alphabet,
        start_matrix: &'a StartMatrix,
        transition_matrix: &'a TransitionMatrix,
        emission_matrix: &'a EmissionMatrix,
    ) -> Self {
        let viterbi = Viterbi::new(states, start_matrix, transition_matrix, emission_matrix);

        Self {
            states: Some(states),
            alphabet: Some(alphabet),
            start_matrix: Some(start_matrix),
            transition_matrix: Some(transition_matrix),
            emission_matrix: Some(emission_matrix),

            viterbi,
        }
    }

    pub fn new_empty() -> Self {
        let viterbi = Viterbi::new_empty();

        Self {
            states: None,
            alphabet: None,
            start_matrix: None,
            transition_matrix: None,
            emission_matrix: None,
            viterbi,
        }
    }

    pub fn reset(&mut self) {
        self.states = None;
        self.alphabet = None;
        self.start_matrix = None;
        self.transition_matrix = None;
        self.emission_matrix = None;

        self.viterbi.reset();
    }

    pub fn set_states(&mut self, states: &'a [State]) {
        self.states = Some(states);
        self.viterbi.set_states(states);
    }

    pub fn set_alphabet(&mut self, alphabet: &'a Alphabet) {
        self.alphabet = Some(alphabet);
    }

    pub fn set_start_matrix(&mut self, start_matrix: &'a StartMatrix) {
        self.start_matrix = Some(start_matrix);
        self.viterbi.set_start_matrix(start_matrix);
    }

    pub fn set_transition_matrix(&mut self, transition_matrix: &'a TransitionMatrix) {
        self.transition_matrix = Some(transition_matrix);
        self.viterbi.set_transition_matrix(transition_matrix);
    }

    pub fn set_emission_matrix(&mut self, emission_matrix: &'a EmissionMatrix) {
        self.emission_matrix = Some(emission_matrix);
        self.viterbi.set_emission_matrix(emission_matrix);
    }

    // Checks validity of the start matrix
    pub fn check_start_matrix_validity(
        start_matrix: &StartMatrix,
        num_states: usize,
    ) -> Result<(), HMMInstanceError> {
        // Validate dimensions of the start matrix
        if start_matrix.matrix.len() != num_states {
            return Err(HMMInstanceError::IncompatibleDimensions {
                dim_states: Some(num_states),
                dim_start_matrix: Some(start_matrix.matrix.len()),
                dim_transition_matrix: None,
                dim_emission_matrix: None,
                dim_alphabet: None,
            });
        }

        // Validate the start matrix itself
        start_matrix
            .validate()
            .map_err(|error| HMMInstanceError::InvalidMatrix { error })?;

        Ok(())
    }

    // Checks validity of the transition matrix
    pub fn check_transition_matrix_validity(
        transition_matrix: &TransitionMatrix,
        num_states: usize,
    ) -> Result<(), HMMInstanceError> {
        // Validate the dimensions of the transition matrix
        let transition_matrix_dim_0 = transition_matrix.matrix.len();
        let transition_matrix_dim_1 = if transition_matrix_dim_0 == 0 {
            0
        } else {
            transition_matrix.matrix[0].len()
        };

        if transition_matrix_dim_0 != num_states || transition_matrix_dim_1 != num_states {
            return Err(HMMInstanceError::IncompatibleDimensions {
                dim_states: Some(num_states),
                dim_start_matrix: None,
                dim_transition_matrix: Some([transition_matrix_dim_0, transition_matrix_dim_1]),
                dim_emission_matrix: None,
                dim_alphabet: None,
            });
        }

        // Validate the transition matrix itself
        transition_matrix
            .validate()
            .map_err(|error| HMMInstanceError::InvalidMatrix { error })?;

        Ok(())
    }

    // Checks validity of the emission matrix against states and alphabet
    pub fn check_emission_matrix_validity(
        emission_matrix: &EmissionMatrix,
        num_states: usize,
        num_symbols: usize,
    ) -> Result<(), HMMInstanceError> {
        let emission_matrix_dim_0 = emission_matrix.num_states();
        let emission_matrix_dim_1 = emission_matrix.num_symbols();

        if emission_matrix_dim_0 != num_states || emission_matrix_dim_1 != num_symbols {
            return Err(HMMInstanceError::IncompatibleDimensions {
                dim_states: Some(num_states),
                dim_start_matrix: None,
                dim_transition_matrix: None,
                dim_emission_matrix: Some([emission_matrix_dim_0, emission_matrix_dim_1]),
                dim_alphabet: Some(num_symbols),
            });
        }

        // Validate the emission matrix itself
        emission_matrix
            .validate()
            .map_err(|error| HMMInstanceError::InvalidMatrix { error })?;

        Ok(())
    }

    // Checks validity of the states
    pub fn check_states_validity(states: &[State]) -> Result<(), HMMInstanceError> {
        if states.is_empty() {
            return Err(HMMInstanceError::NoStates);
        }

        let mut state_ids: HashSet<usize> = HashSet::new();
        let mut state_names: HashSet<&str> = HashSet::new();
        let expected_ids: Vec<usize> = (0..states.len()).collect(); // Expected sequence: [0, 1, 2, ..., N-1]

        for state in states {
            // Check for duplicate state IDs
            if !state_ids.insert(state.get_id()) {
                return Err(HMMInstanceError::DuplicateStateId { id: state.get_id() });
            }

            // Check for duplicate state names, since identity is by label
            if !state_names.insert(state.get_name()) {
                return Err(HMMInstanceError::DuplicateStateName {
                    name: state.get_name().to_string(),
                });
            }
        }

        // Check if the state IDs are exactly the expected sequence [0, 1, ..., N-1]
        let mut actual_ids: Vec<usize> = state_ids.into_iter().collect();
        actual_ids.sort_unstable();

        if actual_ids != expected_ids {
            return Err(HMMInstanceError::InvalidStateIdSequence {
                expected: expected_ids,
                found: actual_ids,
            });
        }

        Ok(())
    }

    pub fn check_validity(
        states: Option<&[State]>,
        alphabet: Option<&Alphabet>,
        start_matrix: Option<&StartMatrix>,
        transition_matrix: Option<&TransitionMatrix>,
        emission_matrix: Option<&EmissionMatrix>,
    ) -> Result<(), HMMInstanceError> {
        // Unwrap the Option values or return the corresponding error
        let states = states.ok_or(HMMInstanceError::UndefinedStates)?;
        let alphabet = alphabet.ok_or(HMMInstanceError::UndefinedAlphabet)?;
        let start_matrix = start_matrix.ok_or(HMMInstanceError::UndefinedStartMatrix)?;
        let transition_matrix =
            transition_matrix.ok_or(HMMInstanceError::UndefinedTransitionMatrix)?;
        let emission_matrix = emission_matrix.ok_or(HMMInstanceError::UndefinedEmissionMatrix)?;

        // Call the sub-functions to validate the components
        Self::check_states_validity(states)?;
        Self::check_start_matrix_validity(start_matrix, states.len())?;
        Self::check_transition_matrix_validity(transition_matrix, states.len())?;
        Self::check_emission_matrix_validity(emission_matrix, states.len(), alphabet.len())?;

        Ok(())
    }

    /// Decode a sequence of pre-resolved symbol ids.
    pub fn run_viterbi(&mut self, observations: &[usize]) -> Result<(), HMMInstanceError> {
        Self::check_validity(
            self.states,
            self.alphabet,
            self.start_matrix,
            self.transition_matrix,
            self.emission_matrix,
        )?;

        self.viterbi
            .run(observations)
            .map_err(|err| HMMInstanceError::ViterbiError { err })
    }

    /// Decode a sequence of symbol labels, resolving them through the
    /// alphabet first.
    pub fn run_viterbi_on_labels<S: AsRef<str>>(
        &mut self,
        observations: &[S],
    ) -> Result<(), HMMInstanceError> {
        let alphabet = self.alphabet.ok_or(HMMInstanceError::UndefinedAlphabet)?;
        let encoded = alphabet
            .encode(observations)
            .map_err(|err| HMMInstanceError::AlphabetError { err })?;

        self.run_viterbi(&encoded)
    }

    /// Decoded state-id path from the last run.
    pub fn get_viterbi_prediction(&self) -> Option<&Vec<usize>> {
        self.viterbi.get_prediction()
    }

    /// Decoded path mapped back to state labels.
    pub fn get_decoded_labels(&self) -> Option<Vec<&str>> {
        let states = self.states?;
        let path = self.viterbi.get_prediction()?;

        Some(path.iter().map(|&id| states[id].get_name()).collect())
    }

    pub fn get_path_probability(&self) -> Option<f64> {
        self.viterbi.get_path_probability()
    }

    /// True if some probability column collapsed to zero during the last
    /// run; the returned path is then partly arbitrary.
    pub fn is_degenerate(&self) -> bool {
        self.viterbi.is_degenerate()
    }

    pub fn degenerate_steps(&self) -> &[usize] {
        self.viterbi.degenerate_steps()
    }
}

#[derive(Debug)]
pub enum HMMInstanceError {
    UndefinedStates,           // States field is None
    UndefinedAlphabet,         // Alphabet is None
    UndefinedStartMatrix,      // StartMatrix is None
    UndefinedTransitionMatrix, // TransitionMatrix is None
    UndefinedEmissionMatrix,   // EmissionMatrix is None
    NoStates,                  // The state set has no elements
    IncompatibleDimensions {
        // Dimensions of the inputs do not match
        dim_states: Option<usize>,
        dim_start_matrix: Option<usize>,
        dim_transition_matrix: Option<[usize; 2]>,
        dim_emission_matrix: Option<[usize; 2]>,
        dim_alphabet: Option<usize>,
    },
    InvalidMatrix { error: MatrixValidationError }, // If there is an error from the probability matrix validation
    DuplicateStateId { id: usize },                 // ID is repeated between states
    DuplicateStateName { name: String },            // Label is repeated between states
    InvalidStateIdSequence {
        // State IDs are not in sequence starting from 0
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    AlphabetError { err: AlphabetError }, // Symbol lookup/encoding failed
    ViterbiError { err: ViterbiError },   // Error surfaced by the decoder itself
}
