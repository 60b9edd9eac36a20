pub mod file;
pub mod request;

pub use request::{ClientInfo, Params};
