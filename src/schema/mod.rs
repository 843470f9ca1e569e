pub mod keep_rule;
pub mod request;
pub mod roll;
