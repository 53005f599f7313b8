//! Error taxonomy for the search core
//!
//! Library operations return [`SearchError`]. Application code (configuration,
//! input loading, the CLI) uses `anyhow` on top of it.

use crate::queue::QueueError;
use crate::sequence::Alphabet;
use thiserror::Error;

/// Errors raised while scheduling or running a search
#[derive(Debug, Error)]
pub enum SearchError {
    /// A query or the database uses a different alphabet than the engine
    #[error("Expected {expected}, found {found}")]
    AlphabetMismatch { expected: Alphabet, found: Alphabet },

    /// The underlying search routine reported a failure status
    #[error(
        "Unexpected error occurred in '{function}': {status} (status code {code})",
        status = status_name(*.code)
    )]
    EngineFailure { function: String, code: i32 },

    /// The search engine panicked while processing a query
    #[error("search engine panicked: {message}")]
    EnginePanicked { message: String },

    /// Allocation failure inside the search engine
    #[error("{}", allocation_message(.type_name, *.size, *.count))]
    Allocation {
        type_name: String,
        size: usize,
        count: Option<usize>,
    },

    /// A worker captured a failure while processing a query
    #[error("worker {worker} failed on query '{query}': {source}")]
    WorkerFailed {
        worker: usize,
        query: String,
        #[source]
        source: Box<SearchError>,
    },

    /// A worker could not be constructed
    #[error("worker {worker} could not be started: {source}")]
    WorkerInit {
        worker: usize,
        #[source]
        source: Box<SearchError>,
    },

    /// A worker thread panicked outside of a search
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    /// The search was cancelled before every query was processed
    #[error("search was cancelled")]
    Cancelled,

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl SearchError {
    pub fn engine_failure(function: impl Into<String>, code: i32) -> Self {
        SearchError::EngineFailure {
            function: function.into(),
            code,
        }
    }

    pub fn allocation(type_name: impl Into<String>, size: usize) -> Self {
        SearchError::Allocation {
            type_name: type_name.into(),
            size,
            count: None,
        }
    }

    pub fn allocation_array(type_name: impl Into<String>, size: usize, count: usize) -> Self {
        SearchError::Allocation {
            type_name: type_name.into(),
            size,
            count: Some(count),
        }
    }

    /// Innermost error, unwrapping worker attribution
    pub fn root_cause(&self) -> &SearchError {
        match self {
            SearchError::WorkerFailed { source, .. } | SearchError::WorkerInit { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Symbolic name of an engine status code
pub fn status_name(code: i32) -> &'static str {
    const NAMES: [&str; 29] = [
        "eslOK",
        "eslFAIL",
        "eslEOL",
        "eslEOF",
        "eslEOD",
        "eslEMEM",
        "eslENOTFOUND",
        "eslEFORMAT",
        "eslEAMBIGUOUS",
        "eslEDIVZERO",
        "eslEINCOMPAT",
        "eslEINVAL",
        "eslESYS",
        "eslECORRUPT",
        "eslEINCONCEIVABLE",
        "eslESYNTAX",
        "eslERANGE",
        "eslEDUP",
        "eslENOHALT",
        "eslENORESULT",
        "eslENODATA",
        "eslETYPE",
        "eslEOVERWRITE",
        "eslENOSPACE",
        "eslEUNIMPLEMENTED",
        "eslENOFORMAT",
        "eslENOALPHABET",
        "eslEWRITE",
        "eslEINACCURATE",
    ];
    usize::try_from(code)
        .ok()
        .and_then(|i| NAMES.get(i).copied())
        .unwrap_or("unknown status")
}

fn allocation_message(type_name: &str, size: usize, count: Option<usize>) -> String {
    match count {
        Some(count) => format!(
            "Could not allocate {} bytes for an array of {} {}",
            size * count,
            count,
            type_name
        ),
        None => format!("Could not allocate {} bytes for type {}", size, type_name),
    }
}
