//! Domain types shared across the classifier.
//!
//! The class catalog defines the index mapping of every probability vector;
//! the result types are what callers receive from a classification.

pub mod catalog;
pub mod result;

pub use catalog::ClassCatalog;
pub use result::{
    ClassificationResult, ClassifierStatus, ClassifyOptions, DecisionDiagnostics,
    RejectionSignals,
};
