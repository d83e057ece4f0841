pub mod backend;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod pipeline;
pub mod profiles;
pub mod provider;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod startup;
pub mod telemetry;
