pub mod probes;
pub mod products;
