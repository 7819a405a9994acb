//! # SortOfRemote NG – SFTP drill
//!
//! Scheduled SFTP download load generator:
//!   • Connects to one server with a password per iteration
//!   • Copies a remote file into a local directory, then deletes one copy
//!   • Repeats the copy a fixed number of times per cycle
//!   • Reports cumulative megabytes on a self-rewriting console line
//!   • Fires once a day at a local time in a named time zone

pub mod sftp;
