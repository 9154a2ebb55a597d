use log::{debug, warn};

use super::hmm_matrices::{
    EmissionMatrix, MatrixValidationError, ProbabilityMatrix, StartMatrix, TransitionMatrix,
};
use super::hmm_tools::{StateMatrix1D, StateMatrix2D};
use super::state::*;

/// Floor for the running maximum of each (time step, state) cell.
///
/// Probabilities are non-negative, so 0.0 is a safe starting value for the
/// maximization. It also acts as the tie-break sentinel: a candidate must be
/// strictly greater than the running maximum to replace it, so when several
/// predecessors reach the same probability the first one in state-iteration
/// order wins. If no candidate ever beats the floor, the backpointer keeps
/// its default of state 0 (see `degenerate_steps`).
pub const PROB_FLOOR: f64 = 0.0;

pub struct Viterbi<'a> {
    states: Option<&'a [State]>,
    start_matrix: Option<&'a StartMatrix>,
    transition_matrix: Option<&'a TransitionMatrix>,
    emission_matrix: Option<&'a EmissionMatrix>,

    viterbi_probs: Option<StateMatrix2D<f64>>,
    backtrace: Option<StateMatrix2D<usize>>,
    ml_path: Option<StateMatrix1D<usize>>,
    path_prob: Option<f64>,
    degenerate_steps: Vec<usize>,
}

impl<'a> Viterbi<'a> {
    pub fn new(
        states: &'a [State],
        start_matrix: &'a StartMatrix,
        transition_matrix: &'a TransitionMatrix,
        emission_matrix: &'a EmissionMatrix,
    ) -> Self {
        Self {
            states: Some(states),
            start_matrix: Some(start_matrix),
            transition_matrix: Some(transition_matrix),
            emission_matrix: Some(emission_matrix),

            viterbi_probs: None,
            backtrace: None,
            ml_path: None,
            path_prob: None,
            degenerate_steps: Vec::new(),
        }
    }

    pub fn new_empty() -> Self {
        Self {
            states: None,
            start_matrix: None,
            transition_matrix: None,
            emission_matrix: None,

            viterbi_probs: None,
            backtrace: None,
            ml_path: None,
            path_prob: None,
            degenerate_steps: Vec::new(),
        }
    }

    pub fn set_states(&mut self, states: &'a [State]) {
        self.states = Some(states);
    }

    pub fn set_start_matrix(&mut self, start_matrix: &'a StartMatrix) {
        self.start_matrix = Some(start_matrix);
    }

    pub fn set_transition_matrix(&mut self, transition_matrix: &'a TransitionMatrix) {
        self.transition_matrix = Some(transition_matrix);
    }

    pub fn set_emission_matrix(&mut self, emission_matrix: &'a EmissionMatrix) {
        self.emission_matrix = Some(emission_matrix);
    }

    pub fn reset(&mut self) {
        self.states = None;
        self.start_matrix = None;
        self.transition_matrix = None;
        self.emission_matrix = None;

        self.viterbi_probs = None;
        self.backtrace = None;
        self.ml_path = None;
        self.path_prob = None;
        self.degenerate_steps.clear();
    }

    // Check input validity
    pub fn pre_run_validity(&self) -> Result<(), ViterbiError> {
        // Check if any of the input components are None
        if self.states.is_none() {
            return Err(ViterbiError::UndefinedStates);
        }
        if self.start_matrix.is_none() {
            return Err(ViterbiError::UndefinedStartMatrix);
        }
        if self.transition_matrix.is_none() {
            return Err(ViterbiError::UndefinedTransitionMatrix);
        }
        if self.emission_matrix.is_none() {
            return Err(ViterbiError::UndefinedEmissionMatrix);
        }

        // Unwrap the components
        let states = self.states.unwrap();
        let start_matrix = self.start_matrix.unwrap();
        let transition_matrix = self.transition_matrix.unwrap();
        let emission_matrix = self.emission_matrix.unwrap();

        if states.is_empty() {
            return Err(ViterbiError::EmptyStates);
        }

        // Get dims
        let states_dim = states.len();
        let start_matrix_dim = start_matrix.matrix.len();
        let transition_matrix_dim_0 = transition_matrix.matrix.len();
        let transition_matrix_dim_1 = if transition_matrix_dim_0 == 0 {
            0
        } else {
            transition_matrix.matrix[0].len()
        };
        let emission_matrix_dim_0 = emission_matrix.num_states();
        let emission_matrix_dim_1 = emission_matrix.num_symbols();

        // Check compatibility of dims
        if states_dim != start_matrix_dim
            || states_dim != transition_matrix_dim_0
            || states_dim != emission_matrix_dim_0
        {
            return Err(ViterbiError::IncompatibleDimensions {
                dim_states: states_dim,
                dim_start_matrix: start_matrix_dim,
                dim_transition_matrix: [transition_matrix_dim_0, transition_matrix_dim_1],
                dim_emission_matrix: [emission_matrix_dim_0, emission_matrix_dim_1],
            });
        }

        // Check intrinsic validity of probability matrices
        start_matrix
            .validate()
            .map_err(|error| ViterbiError::InvalidMatrix { error })?;
        transition_matrix
            .validate()
            .map_err(|error| ViterbiError::InvalidMatrix { error })?;
        emission_matrix
            .validate()
            .map_err(|error| ViterbiError::InvalidMatrix { error })?;

        Ok(())
    }

    pub fn setup_algo(
        &self,
        observations: &[usize],
    ) -> Result<(StateMatrix2D<f64>, StateMatrix2D<usize>, StateMatrix1D<usize>), ViterbiError> {
        // Check validity of inputs
        self.pre_run_validity()?;

        if observations.is_empty() {
            return Err(ViterbiError::EmptyObservationSequence);
        }

        // Every observation must resolve to an emission matrix column
        let alphabet_size = self.emission_matrix.unwrap().num_symbols();
        for (position, &symbol_id) in observations.iter().enumerate() {
            if symbol_id >= alphabet_size {
                return Err(ViterbiError::SymbolOutOfRange {
                    position,
                    symbol_id,
                    alphabet_size,
                });
            }
        }

        // Get dimensions
        let num_states = self.states.unwrap().len();
        let num_observations = observations.len();

        // Create the viterbi algo related matrices. The backtrace has one
        // column less since time step 0 has no predecessor.
        let viterbi_probs = StateMatrix2D::<f64>::empty((num_states, num_observations));
        let backtrace_mat = StateMatrix2D::<usize>::empty((num_states, num_observations - 1));

        let ml_path = StateMatrix1D::<usize>::empty(num_observations);

        Ok((viterbi_probs, backtrace_mat, ml_path))
    }

    pub fn run(&mut self, observations: &[usize]) -> Result<(), ViterbiError> {
        // Collect the allocated memory
        let (mut viterbi_probs, mut backtrace_mat, mut ml_path) = self.setup_algo(observations)?;

        // Unwrap states and matrices
        let states = self.states.unwrap();
        let start_matrix = self.start_matrix.unwrap();
        let transition_matrix = self.transition_matrix.unwrap();
        let emission_matrix = self.emission_matrix.unwrap();

        self.degenerate_steps.clear();

        debug!(
            "viterbi forward pass: {} states, {} observations",
            states.len(),
            observations.len()
        );

        /*********** Viterbi's algorithm ***********/

        // Run first step of the Viterbi algo using the start probabilities
        for state in states {
            let start_prob = start_matrix[state]; // Start probability for the state
            let emission_prob = emission_matrix[(state, observations[0])]; // Emission probability for the first observation

            viterbi_probs[state][0] = start_prob * emission_prob;
        }

        if states.iter().all(|state| viterbi_probs[state][0] == PROB_FLOOR) {
            self.degenerate_steps.push(0);
        }

        // Run remaining steps of Viterbi using the transition and emission matrices
        for i in 1..observations.len() {
            let mut zero_cells = 0_usize;

            for next_state in states {
                let mut max_prob: f64 = PROB_FLOOR;
                let mut best_prev_state: usize = 0;

                let emission_prob = emission_matrix[(next_state, observations[i])]; // Emission probability for the ith observation

                for previous_state in states {
                    let transition_prob = transition_matrix[(previous_state, next_state)]; // Transition probability for the transition prev_state -> next_state

                    let total_prob =
                        transition_prob * emission_prob * viterbi_probs[previous_state][i - 1]; // Total probability until now

                    // Strict improvement only: equal candidates keep the
                    // earlier predecessor
                    if total_prob > max_prob {
                        max_prob = total_prob;
                        best_prev_state = previous_state.id;
                    }
                }

                // A cell whose maximum never left the floor keeps the
                // default backpointer of state 0
                if max_prob == PROB_FLOOR {
                    zero_cells += 1;
                }

                // Update the viterbi and backtrace matrices
                viterbi_probs[next_state][i] = max_prob;
                backtrace_mat[next_state][i - 1] = best_prev_state;
            }

            if zero_cells == states.len() {
                self.degenerate_steps.push(i);
            }
        }

        if let Some(&first) = self.degenerate_steps.first() {
            warn!(
                "all-zero probability column at time step {}; backpointers default to state 0 and the path is unreliable from there",
                first
            );
        }

        /*********** Backtrace ***********/

        // Find best last state
        let mut last_state = 0;
        let mut max_final_prob = PROB_FLOOR;

        for state in states {
            let final_prob = viterbi_probs[state][observations.len() - 1];
            if final_prob > max_final_prob {
                max_final_prob = final_prob;
                last_state = state.id;
            }
        }

        // Fill the preallocated path buffer from the end backwards
        ml_path[observations.len() - 1] = last_state;

        let mut next_state = last_state;
        for t in (0..observations.len() - 1).rev() {
            // Get the previous state from the backtrace matrix
            let prev_state = backtrace_mat[next_state][t];
            ml_path[t] = prev_state;

            // Update the state to continue the backtrace
            next_state = prev_state;
        }

        debug!(
            "viterbi backtrace done: final state {}, path probability {:e}",
            last_state, max_final_prob
        );

        self.viterbi_probs = Some(viterbi_probs);
        self.backtrace = Some(backtrace_mat);
        self.ml_path = Some(ml_path);
        self.path_prob = Some(max_final_prob);

        Ok(())
    }

    /// Most likely state-id path from the last `run`, in chronological order.
    pub fn get_prediction(&self) -> Option<&Vec<usize>> {
        self.ml_path.as_ref().map(|path| &path.raw_vec)
    }

    /// Joint probability of the returned path and the observations.
    pub fn get_path_probability(&self) -> Option<f64> {
        self.path_prob
    }

    /// DP table of the last `run`: entry [state][t] is the probability of
    /// the best partial path ending in that state at time t.
    pub fn get_probability_table(&self) -> Option<&StateMatrix2D<f64>> {
        self.viterbi_probs.as_ref()
    }

    pub fn get_backtrace_table(&self) -> Option<&StateMatrix2D<usize>> {
        self.backtrace.as_ref()
    }

    /// Time steps whose entire probability column collapsed to zero. The
    /// path segment before the earliest such step is arbitrary.
    pub fn degenerate_steps(&self) -> &[usize] {
        &self.degenerate_steps
    }

    pub fn is_degenerate(&self) -> bool {
        !self.degenerate_steps.is_empty()
    }
}

#[derive(Debug)]
pub enum ViterbiError {
    UndefinedStates,           // States field is None
    UndefinedStartMatrix,      // StartMatrix is None
    UndefinedTransitionMatrix, // TransitionMatrix is None
    UndefinedEmissionMatrix,   // EmissionMatrix is None
    EmptyStates,               // The state set has no elements
    EmptyObservationSequence,  // There is nothing to decode
    IncompatibleDimensions {
        // Dimensions of the inputs do not match
        dim_states: usize,
        dim_start_matrix: usize,
        dim_transition_matrix: [usize; 2],
        dim_emission_matrix: [usize; 2],
    },
    SymbolOutOfRange {
        // An observation id has no emission matrix column
        position: usize,
        symbol_id: usize,
        alphabet_size: usize,
    },
    InvalidMatrix { error: MatrixValidationError }, // If there is an error from the probability matrix validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Reference model: states H1/H2 over symbols O1/O2/O3
    fn reference_model() -> (Vec<State>, StartMatrix, TransitionMatrix, EmissionMatrix) {
        let states = State::from_names(&["H1", "H2"]).unwrap();
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

    // Test the known decoding example: [O1, O1, O2, O3] -> [H2, H2, H1, H1]
    #[test]
    fn test_known_example_path() {
        let (states, start, transition, emission) = reference_model();
        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        viterbi.run(&[0, 0, 1, 2]).unwrap();

        assert_eq!(viterbi.get_prediction().unwrap(), &vec![1, 1, 0, 0]);
        assert!(!viterbi.is_degenerate());

        // Hand-computed joint probability of the best path
        assert_relative_eq!(
            viterbi.get_path_probability().unwrap(),
            0.0048384,
            max_relative = 1e-12
        );
    }

    // Test that the decoded path always has the length of the observations
    #[test]
    fn test_path_length_matches_observations() {
        let (states, start, transition, emission) = reference_model();
        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        for observations in [vec![0], vec![2, 1], vec![0, 0, 1, 2, 2, 1, 0]] {
            viterbi.run(&observations).unwrap();
            assert_eq!(viterbi.get_prediction().unwrap().len(), observations.len());
        }
    }

    // Test that repeated runs on identical inputs return identical paths
    #[test]
    fn test_determinism() {
        let (states, start, transition, emission) = reference_model();
        let observations = vec![0, 2, 1, 1, 0, 2];

        let mut first = Viterbi::new(&states, &start, &transition, &emission);
        first.run(&observations).unwrap();

        let mut second = Viterbi::new(&states, &start, &transition, &emission);
        second.run(&observations).unwrap();

        assert_eq!(first.get_prediction(), second.get_prediction());
    }

    // Test that all table entries stay in [0, 1] and that the first column
    // is bounded by the start probabilities
    #[test]
    fn test_probability_table_bounds() {
        let (states, start, transition, emission) = reference_model();
        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        viterbi.run(&[0, 1, 2, 1, 0]).unwrap();

        let probs = viterbi.get_probability_table().unwrap();
        for row in probs.iter() {
            assert!(row.iter().all(|&val| (0.0..=1.0).contains(&val)));
        }

        for state in &states {
            assert!(probs[state][0] <= start[state]);
        }
    }

    // Test the single-observation case: argmax of start * emission
    #[test]
    fn test_single_observation() {
        let (states, start, transition, emission) = reference_model();
        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        // O1: 0.6 * 0.1 = 0.06 for H1, 0.4 * 0.6 = 0.24 for H2
        viterbi.run(&[0]).unwrap();
        assert_eq!(viterbi.get_prediction().unwrap(), &vec![1]);

        // O3: 0.6 * 0.5 = 0.30 for H1, 0.4 * 0.1 = 0.04 for H2
        viterbi.run(&[2]).unwrap();
        assert_eq!(viterbi.get_prediction().unwrap(), &vec![0]);
    }

    // Test the single-state degenerate case: the path repeats that state
    // and the table follows the trivial self-transition recurrence
    #[test]
    fn test_single_state() {
        let states = State::from_names(&["only"]).unwrap();
        let start = StartMatrix::new(vec![1.0]);
        let transition = TransitionMatrix::new(vec![vec![1.0]]);
        let emission = EmissionMatrix::new(vec![vec![0.5, 0.5]]);

        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);
        viterbi.run(&[0, 1, 0, 1]).unwrap();

        assert_eq!(viterbi.get_prediction().unwrap(), &vec![0, 0, 0, 0]);

        let probs = viterbi.get_probability_table().unwrap();
        for t in 0..4 {
            assert_relative_eq!(probs[0][t], 0.5_f64.powi(t as i32 + 1), max_relative = 1e-12);
        }
    }

    // Test that exactly tied predecessors resolve to the first state in
    // iteration order, at every cell and at the final argmax
    #[test]
    fn test_tie_break_first_state_wins() {
        let states = State::from_names(&["A", "B"]).unwrap();
        let start = StartMatrix::new(vec![0.5, 0.5]);
        let transition = TransitionMatrix::new(vec![
            vec![0.5, 0.5],
            vec![0.5, 0.5],
        ]);
        // Single symbol, both states emit it with certainty: every
        // candidate at every cell is exactly tied
        let emission = EmissionMatrix::new(vec![vec![1.0], vec![1.0]]);

        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);
        viterbi.run(&[0, 0, 0]).unwrap();

        assert_eq!(viterbi.get_prediction().unwrap(), &vec![0, 0, 0]);

        let backtrace = viterbi.get_backtrace_table().unwrap();
        for state in &states {
            assert!(backtrace[state].iter().all(|&prev| prev == 0));
        }
    }

    // Test the all-zero column diagnostic: an observation that no state can
    // emit zeroes the column, the path still completes and is flagged
    #[test]
    fn test_degenerate_all_zero_column() {
        let states = State::from_names(&["A", "B"]).unwrap();
        let start = StartMatrix::new(vec![0.5, 0.5]);
        let transition = TransitionMatrix::new(vec![
            vec![0.5, 0.5],
            vec![0.5, 0.5],
        ]);
        // Neither state can emit the second symbol
        let emission = EmissionMatrix::new(vec![vec![1.0, 0.0], vec![1.0, 0.0]]);

        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);
        viterbi.run(&[0, 1, 0]).unwrap();

        assert_eq!(viterbi.get_prediction().unwrap(), &vec![0, 0, 0]);
        assert!(viterbi.is_degenerate());
        // Once a column collapses, every later column is zero as well
        assert_eq!(viterbi.degenerate_steps(), &[1, 2]);
        assert_eq!(viterbi.get_path_probability().unwrap(), 0.0);
    }

    // Test that an empty observation sequence is rejected
    #[test]
    fn test_empty_observations() {
        let (states, start, transition, emission) = reference_model();
        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        match viterbi.run(&[]) {
            Err(ViterbiError::EmptyObservationSequence) => (),
            _ => panic!("Expected EmptyObservationSequence error"),
        }
    }

    // Test that an empty state set is rejected
    #[test]
    fn test_empty_states() {
        let states: Vec<State> = Vec::new();
        let start = StartMatrix::new(vec![]);
        let transition = TransitionMatrix::new(vec![vec![]]);
        let emission = EmissionMatrix::new(vec![vec![]]);

        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        match viterbi.run(&[0]) {
            Err(ViterbiError::EmptyStates) => (),
            _ => panic!("Expected EmptyStates error"),
        }
    }

    // Test that a symbol id outside the alphabet is rejected with context
    #[test]
    fn test_symbol_out_of_range() {
        let (states, start, transition, emission) = reference_model();
        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        match viterbi.run(&[0, 5, 1]) {
            Err(ViterbiError::SymbolOutOfRange {
                position,
                symbol_id,
                alphabet_size,
            }) => {
                assert_eq!(position, 1);
                assert_eq!(symbol_id, 5);
                assert_eq!(alphabet_size, 3);
            }
            _ => panic!("Expected SymbolOutOfRange error"),
        }
    }

    // Test that mismatched component dimensions are rejected
    #[test]
    fn test_incompatible_dimensions() {
        let (states, start, transition, _) = reference_model();
        let emission = EmissionMatrix::new(vec![vec![0.5, 0.5]]); // Only one state row

        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        match viterbi.run(&[0]) {
            Err(ViterbiError::IncompatibleDimensions { dim_emission_matrix, .. }) => {
                assert_eq!(dim_emission_matrix, [1, 2]);
            }
            _ => panic!("Expected IncompatibleDimensions error"),
        }
    }

    // Test that a malformed model fails fast before the forward pass
    #[test]
    fn test_malformed_model_rejected() {
        let (states, start, _, emission) = reference_model();
        let transition = TransitionMatrix::new(vec![
            vec![0.7, 0.7], // Row sums to 1.4
            vec![0.4, 0.6],
        ]);

        let mut viterbi = Viterbi::new(&states, &start, &transition, &emission);

        match viterbi.run(&[0, 1]) {
            Err(ViterbiError::InvalidMatrix {
                error: MatrixValidationError::RowsIncorrectValues { rows, .. },
            }) => assert_eq!(rows, vec![0]),
            _ => panic!("Expected InvalidMatrix error"),
        }
    }

    // Test that an unconfigured decoder reports the missing component
    #[test]
    fn test_undefined_components() {
        let mut viterbi = Viterbi::new_empty();

        match viterbi.run(&[0]) {
            Err(ViterbiError::UndefinedStates) => (),
            _ => panic!("Expected UndefinedStates error"),
        }

        let states = State::from_names(&["A"]).unwrap();
        viterbi.set_states(&states);

        match viterbi.run(&[0]) {
            Err(ViterbiError::UndefinedStartMatrix) => (),
            _ => panic!("Expected UndefinedStartMatrix error"),
        }
    }
}
