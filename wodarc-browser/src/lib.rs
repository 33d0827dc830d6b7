//! Browser automation glue for profile crawling.
//!
//! Thin layer over a `fantoccini` WebDriver client used to walk a public
//! profile in a way that looks like a person at a desktop browser:
//!
//! - [`driver::Browser`]: session setup against a local chromedriver
//! - [`page::Page`] / [`page::PageElement`]: DOM queries and scripts
//! - [`humanize::Humanizer`]: randomised delays and per-character typing
//! - [`agent::AgentPool`]: plausible desktop user-agent profiles
//! - [`stealth`]: Chrome arguments and JS evasions
pub mod agent;
pub mod driver;
pub mod humanize;
pub mod page;
pub mod stealth;

pub use driver::Browser;
pub use page::{Page, PageElement};
