// Domain layer - Report model and decision rules

pub mod model;
pub mod rules;
