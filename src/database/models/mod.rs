pub mod cash_flow;
pub mod client;
pub mod invoice;
pub mod project;
pub mod publication;
pub mod task;
pub mod tenant;
pub mod user;
