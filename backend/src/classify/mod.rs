pub mod decider;
pub mod fingerprint;
pub mod heatmap;
pub mod predictor;
