use rand::Rng;

use super::hmm_tools::*;
use super::state::*;
use std::ops::{Index, IndexMut};

// Tolerance when checking that probability rows sum to 1
pub const VALIDATION_MARGIN: f64 = 1e-4;

pub trait ProbabilityMatrix {
    // Check if the matrix is valid
    fn validate(&self) -> Result<(), MatrixValidationError>;
}

// Custom error for matrix value validation
#[derive(Debug)]
pub enum MatrixValidationError {
    IncorrectShape,                                                  // Rows have inconsistent lengths, or a square matrix isn't square
    VectorIncorrectValues { values: Vec<f64> },                      // If 1D, the vector/row matrix values dont sum to 1
    RowsIncorrectValues { rows: Vec<usize>, values: Vec<Vec<f64>> }, // Rows are incorrect, doesn't sum to 1
    MatrixEmpty,                                                     // Entire matrix sums to 0
    RowsEmpty { rows: Vec<usize> },                                  // Rows are empty
    InvalidValue,                                                    // There is at least one value outside of [0.0, 1.0]
}

// Row-stochastic validation shared by the 2D matrices: every value in
// [0, 1], no all-zero rows, every row summing to 1 within the margin.
fn validate_stochastic_rows(matrix: &StateMatrix2D<f64>) -> Result<(), MatrixValidationError> {
    let mut empty_rows = Vec::<usize>::new();
    let mut incorrect_rows_id = Vec::<usize>::new();
    let mut incorrect_rows_values = Vec::<Vec<f64>>::new();

    for (i, row) in matrix.iter().enumerate() {
        // Check if values are valid
        if row.iter().any(|&val| val < 0.0 || val > 1.0 + VALIDATION_MARGIN) {
            return Err(MatrixValidationError::InvalidValue);
        }

        // Check if the row is empty
        if row.iter().all(|&val| val == 0.0) {
            empty_rows.push(i);
        }
        // Check if the row doesn't sum to 1.0
        else {
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > VALIDATION_MARGIN {
                incorrect_rows_id.push(i);
                incorrect_rows_values.push(row.clone());
            }
        }
    }

    // Entire matrix is empty
    if empty_rows.len() == matrix.len() {
        return Err(MatrixValidationError::MatrixEmpty);
    }
    // Some rows are empty
    else if !empty_rows.is_empty() {
        return Err(MatrixValidationError::RowsEmpty { rows: empty_rows });
    }
    // Some rows have incorrect values
    else if !incorrect_rows_id.is_empty() {
        return Err(MatrixValidationError::RowsIncorrectValues {
            rows: incorrect_rows_id,
            values: incorrect_rows_values,
        });
    }

    // Matrix is valid
    Ok(())
}

// Generate a random probability row: each entry draws a share of the
// remaining mass and the last entry takes the leftover.
fn random_probability_row<R: Rng>(len: usize, rng: &mut R) -> Vec<f64> {
    let mut row: Vec<f64> = Vec::with_capacity(len);
    let mut total: f64 = 1.0;

    for _ in 0..(len - 1) {
        let val = rng.gen_range(0.0..total);
        row.push(val);
        total -= val;
    }

    row.push(total);
    row
}

#[derive(Debug, Clone)]
pub struct TransitionMatrix {
    pub matrix: StateMatrix2D<f64>, // Square: states x states
}

impl TransitionMatrix {
    // Create a new transition matrix from full matrix input
    pub fn new(matrix: Vec<Vec<f64>>) -> Self {
        Self {
            matrix: StateMatrix2D::new(matrix),
        }
    }

    // Create a new transition matrix from StateMatrix2D input
    pub fn from_state_matrix(matrix: StateMatrix2D<f64>) -> Self {
        Self { matrix }
    }

    // Generate a random transition matrix
    pub fn new_random(num_states: usize) -> Self {
        let mut rng = rand::thread_rng();
        let raw_matrix = (0..num_states)
            .map(|_| random_probability_row(num_states, &mut rng))
            .collect();

        Self {
            matrix: StateMatrix2D::new(raw_matrix),
        }
    }

    // Create an empty transition matrix
    pub fn empty(size: usize) -> Self {
        Self {
            matrix: StateMatrix2D::empty((size, size)),
        }
    }

    // Get probability for a given transition
    pub fn get<T: IDTarget>(&self, from: T, to: T) -> f64 {
        *self.matrix.get((from.get_id(), to.get_id()))
    }

    // Set the probability of transitioning from one state to another
    pub fn set<T: IDTarget>(&mut self, from_state: T, to_state: T, prob: f64) {
        self.matrix.set((from_state.get_id(), to_state.get_id()), prob);
    }
}

impl ProbabilityMatrix for TransitionMatrix {
    fn validate(&self) -> Result<(), MatrixValidationError> {
        // Num of rows and columns must be the same
        if self.matrix.iter().any(|row| row.len() != self.matrix.len()) {
            return Err(MatrixValidationError::IncorrectShape);
        }

        validate_stochastic_rows(&self.matrix)
    }
}

// Implement Index trait for not mut
impl Index<(usize, usize)> for TransitionMatrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (from, to) = index;
        &self.matrix[from][to]
    }
}

impl Index<(&State, &State)> for TransitionMatrix {
    type Output = f64;

    fn index(&self, index: (&State, &State)) -> &Self::Output {
        let (from, to) = (index.0.id, index.1.id);
        &self.matrix[from][to]
    }
}

// Implement IndexMut trait for mut
impl IndexMut<(usize, usize)> for TransitionMatrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (from, to) = index;
        &mut self.matrix[from][to]
    }
}

impl IndexMut<(&State, &State)> for TransitionMatrix {
    fn index_mut(&mut self, index: (&State, &State)) -> &mut Self::Output {
        let (from, to) = (index.0.id, index.1.id);
        &mut self.matrix[from][to]
    }
}

/// Emission matrix: one row per state, one column per alphabet symbol.
/// Rectangular in general, unlike the transition matrix.
#[derive(Debug, Clone)]
pub struct EmissionMatrix {
    pub matrix: StateMatrix2D<f64>,
}

impl EmissionMatrix {
    // Create a new emission matrix from full matrix input
    pub fn new(matrix: Vec<Vec<f64>>) -> Self {
        Self {
            matrix: StateMatrix2D::new(matrix),
        }
    }

    // Create a new emission matrix from StateMatrix2D input
    pub fn from_state_matrix(matrix: StateMatrix2D<f64>) -> Self {
        Self { matrix }
    }

    // Generate a random emission matrix
    pub fn new_random(num_states: usize, num_symbols: usize) -> Self {
        let mut rng = rand::thread_rng();
        let raw_matrix = (0..num_states)
            .map(|_| random_probability_row(num_symbols, &mut rng))
            .collect();

        Self {
            matrix: StateMatrix2D::new(raw_matrix),
        }
    }

    // Create an empty emission matrix
    pub fn empty(num_states: usize, num_symbols: usize) -> Self {
        Self {
            matrix: StateMatrix2D::empty((num_states, num_symbols)),
        }
    }

    pub fn num_states(&self) -> usize {
        self.matrix.len()
    }

    pub fn num_symbols(&self) -> usize {
        if self.matrix.is_empty() {
            0
        } else {
            self.matrix[0].len()
        }
    }

    // Get the probability of a state emitting a symbol
    pub fn get<T: IDTarget>(&self, state: T, symbol: usize) -> f64 {
        *self.matrix.get((state.get_id(), symbol))
    }

    // Set the probability of a state emitting a symbol
    pub fn set<T: IDTarget>(&mut self, state: T, symbol: usize, prob: f64) {
        self.matrix.set((state.get_id(), symbol), prob);
    }
}

impl ProbabilityMatrix for EmissionMatrix {
    fn validate(&self) -> Result<(), MatrixValidationError> {
        // All rows must cover the same alphabet
        let num_symbols = self.num_symbols();
        if self.matrix.iter().any(|row| row.len() != num_symbols) {
            return Err(MatrixValidationError::IncorrectShape);
        }

        validate_stochastic_rows(&self.matrix)
    }
}

impl Index<(usize, usize)> for EmissionMatrix {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (state, symbol) = index;
        &self.matrix[state][symbol]
    }
}

impl Index<(&State, usize)> for EmissionMatrix {
    type Output = f64;

    fn index(&self, index: (&State, usize)) -> &Self::Output {
        &self.matrix[index.0.id][index.1]
    }
}

impl IndexMut<(usize, usize)> for EmissionMatrix {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (state, symbol) = index;
        &mut self.matrix[state][symbol]
    }
}

impl IndexMut<(&State, usize)> for EmissionMatrix {
    fn index_mut(&mut self, index: (&State, usize)) -> &mut Self::Output {
        &mut self.matrix[index.0.id][index.1]
    }
}

#[derive(Debug, Clone)]
pub struct StartMatrix {
    pub matrix: Vec<f64>,
}

impl StartMatrix {
    // Create a new start matrix from full matrix input
    pub fn new(matrix: Vec<f64>) -> Self {
        Self { matrix }
    }

    // Create a new random start matrix
    pub fn new_random(num_states: usize) -> Self {
        let mut rng = rand::thread_rng();

        Self {
            matrix: random_probability_row(num_states, &mut rng),
        }
    }

    // Create an empty start matrix
    pub fn empty(size: usize) -> Self {
        Self {
            matrix: vec![0.0; size],
        }
    }

    // Get the start probability for a given state
    pub fn get<T: IDTarget>(&self, state: T) -> f64 {
        self.matrix[state.get_id()]
    }

    // Set the start probability for a given state
    pub fn set<T: IDTarget>(&mut self, state: T, prob: f64) {
        self.matrix[state.get_id()] = prob;
    }
}

impl ProbabilityMatrix for StartMatrix {
    // Validate the 1D start matrix
    fn validate(&self) -> Result<(), MatrixValidationError> {
        // Check if all values are valid
        if self
            .matrix
            .iter()
            .any(|&val| val < 0.0 || val > 1.0 + VALIDATION_MARGIN)
        {
            return Err(MatrixValidationError::InvalidValue);
        }

        // Check if all elements are zero (i.e., the matrix is empty)
        if self.matrix.iter().all(|&val| val == 0.0) {
            return Err(MatrixValidationError::MatrixEmpty);
        }

        // Check if the values in the matrix sum to 1.0 (with some tolerance for floating-point errors)
        let total_sum: f64 = self.matrix.iter().sum();
        if (total_sum - 1.0).abs() > VALIDATION_MARGIN {
            return Err(MatrixValidationError::VectorIncorrectValues {
                values: self.matrix.clone(),
            });
        }

        Ok(())
    }
}

// Implement Index trait for not mut
impl Index<usize> for StartMatrix {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.matrix[index]
    }
}

impl Index<&State> for StartMatrix {
    type Output = f64;

    fn index(&self, state: &State) -> &Self::Output {
        &self.matrix[state.id]
    }
}

// Implement IndexMut trait for mut
impl IndexMut<usize> for StartMatrix {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.matrix[index]
    }
}

impl IndexMut<&State> for StartMatrix {
    fn index_mut(&mut self, state: &State) -> &mut Self::Output {
        &mut self.matrix[state.id]
    }
}


#[cfg(test)]
mod tests_emission_matrix {
    use super::*;

    // Test for creating a new emission matrix from a full matrix
    #[test]
    fn test_emission_matrix_new() {
        let matrix = vec![vec![0.1, 0.4, 0.5], vec![0.6, 0.3, 0.1]];
        let emission_matrix = EmissionMatrix::new(matrix.clone());

        assert_eq!(emission_matrix.matrix.raw_matrix, matrix);
        assert_eq!(emission_matrix.num_states(), 2);
        assert_eq!(emission_matrix.num_symbols(), 3);
    }

    // Test for setting and getting values with usize and State
    #[test]
    fn test_emission_matrix_get_set() {
        let mut emission_matrix = EmissionMatrix::empty(2, 3);
        let state = State::new(1, "H2").unwrap();

        emission_matrix.set(0, 2, 0.5);
        assert_eq!(emission_matrix.get(0, 2), 0.5);

        emission_matrix.set(&state, 1, 0.3);
        assert_eq!(emission_matrix.get(&state, 1), 0.3);
    }

    // Test for validation - a rectangular matrix is accepted
    #[test]
    fn test_emission_matrix_validation_valid() {
        let emission_matrix = EmissionMatrix::new(vec![
            vec![0.1, 0.4, 0.5],
            vec![0.6, 0.3, 0.1],
        ]);

        assert!(emission_matrix.validate().is_ok());
    }

    // Test for validation - ragged rows (IncorrectShape error)
    #[test]
    fn test_emission_matrix_validation_ragged_rows() {
        let emission_matrix = EmissionMatrix::new(vec![
            vec![0.5, 0.5],
            vec![0.3, 0.3, 0.4],
        ]);

        match emission_matrix.validate() {
            Err(MatrixValidationError::IncorrectShape) => (),
            _ => panic!("Expected IncorrectShape error"),
        }
    }

    // Test for validation - a row not summing to 1 (RowsIncorrectValues error)
    #[test]
    fn test_emission_matrix_validation_incorrect_rows() {
        let emission_matrix = EmissionMatrix::new(vec![
            vec![0.5, 0.5, 0.0],
            vec![0.3, 0.3, 0.3], // Sums to 0.9
        ]);

        match emission_matrix.validate() {
            Err(MatrixValidationError::RowsIncorrectValues { rows, values }) => {
                assert_eq!(rows, vec![1]);
                assert_eq!(values, vec![vec![0.3, 0.3, 0.3]]);
            }
            _ => panic!("Expected RowsIncorrectValues error"),
        }
    }

    // Test for validation - empty rows (RowsEmpty error)
    #[test]
    fn test_emission_matrix_validation_rows_empty() {
        let mut emission_matrix = EmissionMatrix::empty(2, 2);
        emission_matrix.set(0, 0, 1.0);

        match emission_matrix.validate() {
            Err(MatrixValidationError::RowsEmpty { rows }) => {
                assert_eq!(rows, vec![1]);
            }
            _ => panic!("Expected RowsEmpty error"),
        }
    }

    // Test for validation - invalid values (InvalidValue error)
    #[test]
    fn test_emission_matrix_validation_invalid_value() {
        let emission_matrix = EmissionMatrix::new(vec![vec![1.2, -0.2]]);

        match emission_matrix.validate() {
            Err(MatrixValidationError::InvalidValue) => (),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    // Test the generate random matrix method
    #[test]
    fn test_random_emission_matrix_valid() {
        for _ in 0..1000 {
            let emission_matrix = EmissionMatrix::new_random(3, 5);

            assert_eq!(emission_matrix.num_symbols(), 5);
            assert!(emission_matrix.validate().is_ok());
        }
    }
}
