//! CLI domain: parse, route, and output only.
//! No store logic; a single route table dispatches to the store façade.

mod output;
mod parse;
mod route;

pub use output::{format_value, map_error, parse_value};
pub use parse::{Cli, Commands};
pub use route::RunContext;
