pub mod databases;
pub mod etl;
pub mod global;
pub mod resources;
pub mod runtime;
pub mod steps;
