//! Fatigue life estimation for notched specimens.
//!
//! The life is split into crack initiation, read from tables built with the
//! Fatemi-Socie or Smith-Watson-Topper parameter, and crack propagation,
//! integrated with a short-crack corrected growth law through the stress
//! field ahead of the notch.

pub mod app_logic;
pub mod config;
pub mod critical_plane;
pub mod error;
pub mod estimator;
pub mod field;
pub mod initiation;
pub mod intensity;
pub mod interpolate;
pub mod material;
pub mod optimize;
pub mod propagation;
pub mod report;
pub mod shape;
pub mod statistics;
pub mod stress;
