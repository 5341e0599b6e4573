pub mod aggregate;
pub mod cache;
pub mod energy;
pub mod measurement;
pub mod period;
pub mod site;
pub mod source;
pub mod time;
