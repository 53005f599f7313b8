//! Input file loading
//!
//! Query models and the sequence database are read from JSON files holding
//! the serde form of [`QueryModel`] (an array of them) and
//! [`SequenceDatabase`]:
//!
//! ```json
//! { "alphabet": "amino",
//!   "sequences": [ { "name": "seq1", "residues": "MKVLAAG" } ] }
//! ```
//!
//! The database is loaded completely before a search starts.

use crate::model::QueryModel;
use crate::sequence::{Alphabet, SequenceDatabase};
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load a JSON array of query models
pub fn load_queries(path: &Path) -> Result<Vec<QueryModel>> {
    let queries: Vec<QueryModel> = read_json(path)
        .with_context(|| format!("Failed to load query models: {}", path.display()))?;

    for query in &queries {
        if query.consensus.is_empty() {
            anyhow::bail!("Query model '{}' has no match nodes", query.name);
        }
        warn_noncanonical(&query.name, query.alphabet, &query.consensus);
    }

    tracing::debug!(path = %path.display(), count = queries.len(), "loaded query models");
    Ok(queries)
}

/// Load a JSON sequence database
pub fn load_database(path: &Path) -> Result<SequenceDatabase> {
    let db: SequenceDatabase = read_json(path)
        .with_context(|| format!("Failed to load sequence database: {}", path.display()))?;

    for seq in db.iter() {
        warn_noncanonical(&seq.name, db.alphabet(), &seq.residues);
    }

    tracing::debug!(
        path = %path.display(),
        sequences = db.len(),
        residues = db.total_residues(),
        "loaded sequence database"
    );
    Ok(db)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).context("Failed to open file")?;
    let value = serde_json::from_reader(BufReader::new(file)).context("Invalid JSON")?;
    Ok(value)
}

/// Ambiguity codes are allowed but never score as matches
fn warn_noncanonical(name: &str, alphabet: Alphabet, residues: &[u8]) {
    let odd = residues.iter().filter(|&&r| !alphabet.contains(r)).count();
    if odd > 0 {
        tracing::warn!(name, alphabet = %alphabet, count = odd, "non-canonical residues");
    }
}
