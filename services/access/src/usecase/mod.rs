pub mod approve;
pub mod delivery;
pub mod request;
pub mod validate;
