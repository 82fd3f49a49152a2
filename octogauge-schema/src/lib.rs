pub mod scores;
pub mod stats;

pub use scores::{Highlight, HighlightKind, MaturityComponent, PhamScores};
pub use stats::{Language, ScrapeStats};
