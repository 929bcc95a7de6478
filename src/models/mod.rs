pub mod counters;
pub mod entity;
pub mod rollup;
pub mod traffic;
