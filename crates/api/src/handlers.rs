pub mod auth;
pub mod calendar;
pub mod constraints;
pub mod energy;
pub mod schedule;
pub mod subjects;
pub mod tasks;
