//! Query profile models
//!
//! A `QueryModel` is one unit of query work. The scheduler only needs its
//! identity and alphabet; engines additionally read the consensus residues,
//! whose length is the model's node count `M`.

use crate::sequence::{residue_string, Alphabet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
    pub alphabet: Alphabet,
    /// Consensus residues, one per match node
    #[serde(with = "residue_string")]
    pub consensus: Vec<u8>,
}

impl QueryModel {
    pub fn new(name: impl Into<String>, alphabet: Alphabet, consensus: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            accession: None,
            alphabet,
            consensus: consensus.as_ref().to_ascii_uppercase(),
        }
    }

    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = Some(accession.into());
        self
    }

    /// Number of match nodes
    pub fn m(&self) -> usize {
        self.consensus.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_nodes() {
        let model = QueryModel::new("PF02826", Alphabet::amino(), "mkvla").with_accession("PF02826.20");
        assert_eq!(model.m(), 5);
        assert_eq!(model.consensus, b"MKVLA");
        assert_eq!(model.accession.as_deref(), Some("PF02826.20"));
    }

    #[test]
    fn test_model_from_json() {
        let json = r#"{"name":"q1","alphabet":"dna","consensus":"acgtac"}"#;
        let model: QueryModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.alphabet, Alphabet::Dna);
        assert_eq!(model.m(), 6);
        assert!(model.accession.is_none());
    }
}
