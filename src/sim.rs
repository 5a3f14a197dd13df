pub mod animator;
pub mod track_eval;
