use std::ops::{Index, IndexMut};

use super::state::{IDTarget, State};

/// One value per state. Indexable by state id or by `&State`.
#[derive(Debug, Clone)]
pub struct StateMatrix1D<T> {
    pub raw_vec: Vec<T>,
}

impl<T: Clone + Default> StateMatrix1D<T> {
    pub fn new(raw_vec: Vec<T>) -> Self {
        Self { raw_vec }
    }

    pub fn empty(len: usize) -> Self {
        Self {
            raw_vec: vec![T::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.raw_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_vec.is_empty()
    }

    pub fn get<I: IDTarget>(&self, target: I) -> &T {
        &self.raw_vec[target.get_id()]
    }

    pub fn set<I: IDTarget>(&mut self, target: I, value: T) {
        self.raw_vec[target.get_id()] = value;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.raw_vec.iter()
    }
}

impl<T> Index<usize> for StateMatrix1D<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.raw_vec[index]
    }
}

impl<T> IndexMut<usize> for StateMatrix1D<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.raw_vec[index]
    }
}

impl<T> Index<&State> for StateMatrix1D<T> {
    type Output = T;

    fn index(&self, state: &State) -> &Self::Output {
        &self.raw_vec[state.id]
    }
}

impl<T> IndexMut<&State> for StateMatrix1D<T> {
    fn index_mut(&mut self, state: &State) -> &mut Self::Output {
        &mut self.raw_vec[state.id]
    }
}

/// Row-per-state matrix. `matrix[state][t]` reads entry t of the state's
/// row, so the DP tables are laid out states x time steps.
#[derive(Debug, Clone)]
pub struct StateMatrix2D<T> {
    pub raw_matrix: Vec<Vec<T>>,
}

impl<T: Clone + Default> StateMatrix2D<T> {
    pub fn new(raw_matrix: Vec<Vec<T>>) -> Self {
        Self { raw_matrix }
    }

    pub fn empty(shape: (usize, usize)) -> Self {
        let (rows, cols) = shape;
        Self {
            raw_matrix: vec![vec![T::default(); cols]; rows],
        }
    }

    pub fn len(&self) -> usize {
        self.raw_matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_matrix.is_empty()
    }

    pub fn get(&self, index: (usize, usize)) -> &T {
        &self.raw_matrix[index.0][index.1]
    }

    pub fn set(&mut self, index: (usize, usize), value: T) {
        self.raw_matrix[index.0][index.1] = value;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<T>> {
        self.raw_matrix.iter()
    }
}

impl<T> Index<usize> for StateMatrix2D<T> {
    type Output = Vec<T>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.raw_matrix[index]
    }
}

impl<T> IndexMut<usize> for StateMatrix2D<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.raw_matrix[index]
    }
}

impl<T> Index<&State> for StateMatrix2D<T> {
    type Output = Vec<T>;

    fn index(&self, state: &State) -> &Self::Output {
        &self.raw_matrix[state.id]
    }
}

impl<T> IndexMut<&State> for StateMatrix2D<T> {
    fn index_mut(&mut self, state: &State) -> &mut Self::Output {
        &mut self.raw_matrix[state.id]
    }
}
