pub mod cli;
pub mod launch;
pub mod status;
pub mod worker;
