//! Background services and external collaborators

pub mod extractor;
pub mod maintenance;
pub mod producer;
