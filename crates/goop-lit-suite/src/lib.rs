//! Suite description for goop-lit
//!
//! Everything the engine needs to know about a test tree before it runs a
//! single test: which files are tests, where they live, where scratch output
//! goes, and which `%` tokens stand for which tool paths.

pub mod descriptor;
pub mod site_config;
pub mod substitution;

pub use descriptor::{DEFAULT_SHELL, ExecutionFormat, SuiteBuilder, SuiteDescriptor};
pub use site_config::{SITE_CONFIG_FILE, SiteConfig};
pub use substitution::{Substitution, SubstitutionTable};
