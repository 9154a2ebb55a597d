#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: usize,
    pub name: String,
}

impl State {
    // Constructor to create a new State.
    // The id doubles as the state's row/column index in the probability
    // matrices, so callers should hand out ids as 0..N in order.
    pub fn new(id: usize, name: impl Into<String>) -> Result<Self, StateError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StateError::EmptyName);
        }

        Ok(State { id, name })
    }

    // Build a full state set from labels, assigning ids in order
    pub fn from_names(names: &[&str]) -> Result<Vec<Self>, StateError> {
        names
            .iter()
            .enumerate()
            .map(|(id, name)| State::new(id, *name))
            .collect()
    }

    pub fn get_id(&self) -> usize {
        self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }
}

pub trait IDTarget {
    fn get_id(&self) -> usize;
}

impl IDTarget for usize {
    fn get_id(&self) -> usize {
        *self // Simply return the value of usize
    }
}

impl IDTarget for State {
    fn get_id(&self) -> usize {
        self.id // Return the ID field from the State struct
    }
}

// Implement IDTarget for &State
impl IDTarget for &State {
    fn get_id(&self) -> usize {
        self.id
    }
}

#[derive(Debug)]
pub enum StateError {
    EmptyName,
}
