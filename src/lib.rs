pub mod autosave;
pub mod backend;
pub mod builder;
pub mod diagram;
pub mod error;
pub mod execution;
pub mod layout;
pub mod schema;
pub mod surface;
pub mod tree;
