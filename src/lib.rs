//! Workspace root crate.
//!
//! Holds no runtime code of its own — it exists so that cross-crate
//! integration tests (`tests/integration/*.rs`) have a place to live at the
//! workspace root.
