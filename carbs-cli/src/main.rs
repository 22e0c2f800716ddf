use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

use carbs::IndexCodec;

mod commands;

#[derive(Parser)]
#[command(name = "carbs")]
#[command(about = "Indexed read-only access to CAR archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log codec and scan details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an archive and write its <archive>.idx sidecar
    Index {
        #[arg(value_name = "CAR")]
        car: PathBuf,

        /// Index codec (defaults to hashed when CIDs share a digest, else single-sorted, or sorted for mixed digest lengths)
        #[arg(long, value_enum)]
        codec: Option<CodecArg>,

        /// Overwrite an existing sidecar
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Print the root CIDs declared in the archive header
    Roots {
        #[arg(value_name = "CAR")]
        car: PathBuf,

        /// Fail instead of building a missing index
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Write one block's payload to a file or stdout
    Get {
        #[arg(value_name = "CAR")]
        car: PathBuf,

        #[arg(value_name = "CID")]
        cid: String,

        /// Output path (defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fail instead of building a missing index
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Check that the sidecar resolves every block in the archive
    Verify {
        #[arg(value_name = "CAR")]
        car: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CodecArg {
    Hashed,
    Sorted,
    SingleSorted,
}

impl From<CodecArg> for IndexCodec {
    fn from(c: CodecArg) -> Self {
        match c {
            CodecArg::Hashed => IndexCodec::Hashed,
            CodecArg::Sorted => IndexCodec::Sorted,
            CodecArg::SingleSorted => IndexCodec::SingleSorted,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Index { car, codec, force } => {
            commands::index::build_index(&car, codec.map(Into::into), force)
        }
        Commands::Roots { car, strict } => commands::read::print_roots(&car, strict),
        Commands::Get {
            car,
            cid,
            out,
            strict,
        } => commands::read::get_block(&car, &cid, out.as_deref(), strict),
        Commands::Verify { car } => commands::index::verify_index(&car),
    }
}
