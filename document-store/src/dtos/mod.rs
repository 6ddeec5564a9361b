pub mod documents;

pub use documents::DocumentQuery;
