pub mod forecast;
pub mod request;
pub mod series;
