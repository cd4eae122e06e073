//! Construction and resolution of a term's colle timetable.
//!
//! Sixteen groups over twenty-two weeks: every group sits one
//! Maths/English and one Physics/Systems-Engineering colle per week,
//! drawn from the teachers' published availability. Hard feasibility
//! rules and a set of weighted preferences are encoded as an
//! integer-linear model and handed to an opaque solving engine; the
//! solved assignment is exported as a CSV timetable.

pub mod catalog;
pub mod config;
pub mod data;
pub mod ilp;
pub mod model;
pub mod penalty;
pub mod report;
pub mod solver;
