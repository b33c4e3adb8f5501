pub mod actor;
pub mod chain;
pub mod gate;
pub mod quorum;
pub mod transition;
