mod cli;
mod logger;
mod report;
