use clap::{ArgEnum, Parser};

#[derive(Debug, Parser)]
#[clap(about = "Reconstructs control flow from three-address code and optimises it")]
pub struct Options {
    /// Input file; reads from stdin when omitted
    pub file: Option<String>,
    /// Run reaching-definitions constant propagation
    #[clap(long)]
    pub scp: bool,
    /// Run liveness-based dead-store elimination
    #[clap(long)]
    pub dse: bool,
    /// Print per-function pass statistics after optimising
    #[clap(short, long)]
    pub report: bool,
    /// Output format
    #[clap(short, long, arg_enum, default_value = "3addr")]
    pub backend: Backend,
    #[clap(short, long, default_value_t = 1)]
    pub verbose: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ArgEnum)]
pub enum Backend {
    /// Re-serialise as three-address code
    #[clap(name = "3addr")]
    ThreeAddr,
    /// Translate to a C-like program
    C,
    /// Dump the control-flow graph
    Cfg,
}
