//! One module per subcommand, each with its clap `Args` and a `run` entry point.

pub mod aggregate;
pub mod collect;
pub mod convert;
pub mod postprocess;
