pub mod migrate;
pub mod root;
pub mod tenant;
