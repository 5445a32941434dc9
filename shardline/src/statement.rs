pub mod options;
pub mod prepared;
pub mod values;
