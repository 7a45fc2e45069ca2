mod reflatten;
mod writer;

pub use reflatten::reflatten;
pub use writer::flatten;
