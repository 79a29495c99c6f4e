use log::LevelFilter;

/// How much the tools print, chosen once on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only.
    Quiet,
    Verbose,
}

impl Verbosity {
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Quiet
        }
    }

    pub fn level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// `RUST_LOG` module directives still apply on top of the verbosity level.
pub fn builder(verbosity: Verbosity) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(verbosity.level());
    builder
}

pub fn init(verbosity: Verbosity) {
    // a logger set up earlier, e.g. by a test harness, wins
    let _ = builder(verbosity).try_init();
}
