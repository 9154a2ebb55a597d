use std::collections::HashMap;

/// Finite observation alphabet. Symbol order defines the column indices of
/// the emission matrix; labels must be unique.
#[derive(Debug, Clone)]
pub struct Alphabet {
    symbols: Vec<String>,
    index: HashMap<String, usize>,
}

impl Alphabet {
    pub fn new(symbols: Vec<String>) -> Result<Self, AlphabetError> {
        if symbols.is_empty() {
            return Err(AlphabetError::EmptyAlphabet);
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (id, symbol) in symbols.iter().enumerate() {
            // Duplicates would make label -> index resolution ambiguous
            if index.insert(symbol.clone(), id).is_some() {
                return Err(AlphabetError::DuplicateSymbol {
                    symbol: symbol.clone(),
                });
            }
        }

        Ok(Self { symbols, index })
    }

    pub fn from_labels(labels: &[&str]) -> Result<Self, AlphabetError> {
        Self::new(labels.iter().map(|label| label.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, id: usize) -> Option<&str> {
        self.symbols.get(id).map(|symbol| symbol.as_str())
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Resolve a label sequence to symbol ids, failing on the first label
    /// that is not part of the alphabet.
    pub fn encode<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, AlphabetError> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.index_of(label)
                    .ok_or_else(|| AlphabetError::UnknownSymbol {
                        symbol: label.to_string(),
                    })
            })
            .collect()
    }
}

#[derive(Debug)]
pub enum AlphabetError {
    EmptyAlphabet,                      // No symbols were provided
    DuplicateSymbol { symbol: String }, // The same label appears twice
    UnknownSymbol { symbol: String },   // A label is not part of the alphabet
}
