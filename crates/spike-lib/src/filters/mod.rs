pub mod band;
pub mod morphology;

pub use band::BandLimit;
pub use morphology::{MorphologicalFilter, Parabola, StructuringElement};
