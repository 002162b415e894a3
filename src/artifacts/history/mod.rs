//! Scan configuration and the contract shared by file providers
//!
//! - `object_cache`: path to last seen blob id, suppressing unchanged files
//! - `exclusions`: glob exclusions, including `.ludvigignore`
//! - `options`: size/exclusion filter and per-scan knobs
//! - `provider`: the `(content, path, context)` items every provider yields
//! - `progress`: periodic rate reporting for long scans

pub mod exclusions;
pub mod object_cache;
pub mod options;
pub mod progress;
pub mod provider;
