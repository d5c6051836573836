//! Script generation from saved selections.

pub mod python;

pub use python::generate as generate_python;
