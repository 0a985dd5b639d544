use anyhow::Result;
use clap::{Parser, Subcommand};
use packetlink_cli::{commands, load_config, parse_hex, parse_u32, parse_u8, read_input};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "packetlink")]
#[command(about = "Packetlink - Command/response framing for embedded serial links", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Link configuration (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode one packet into a frame
    Encode {
        /// Module id
        #[arg(short, long, value_parser = parse_u8)]
        module: u8,

        /// Command opcode (decimal or 0x-prefixed)
        #[arg(long, value_parser = parse_u8)]
        cmd: u8,

        /// Payload as hex
        #[arg(short, long, default_value = "")]
        payload: String,

        /// Flags word (decimal or 0x-prefixed)
        #[arg(short, long, value_parser = parse_u32, default_value = "0")]
        flags: u32,

        /// Mark the packet as a response
        #[arg(long)]
        response: bool,

        /// Write the raw frame here instead of printing hex
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Decode and validate one frame
    Decode {
        /// Input file with a raw frame ("-" for stdin)
        #[arg(short, long, conflicts_with = "hex")]
        input: Option<String>,

        /// Frame as hex
        #[arg(long)]
        hex: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the 16-bit checksum
    Checksum {
        /// Bytes as hex
        hex: String,

        /// Treat the input as a whole frame and checksum its covered range
        #[arg(long)]
        frame: bool,
    },

    /// Scan a capture and recover frames
    Scan {
        /// Input file to scan ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Output JSON file for recovered frames
        #[arg(short, long)]
        output: Option<String>,

        /// Show statistics only
        #[arg(long)]
        stats_only: bool,
    },

    /// Replay a capture through an echoing device channel
    Replay {
        /// Input file with received bytes ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Output file for reply frames; hex on stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run the built-in self-test
    Selftest,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Encode {
            module,
            cmd,
            payload,
            flags,
            response,
            output,
        } => {
            let args = commands::encode::EncodeArgs {
                module_id: module,
                cmd,
                payload: parse_hex(&payload)?,
                flags,
                response,
            };
            commands::encode::execute(&args, output.as_deref(), &config)
        }

        Commands::Decode { input, hex, json } => {
            let data = match (input, hex) {
                (_, Some(hex)) => parse_hex(&hex)?,
                (Some(input), None) => read_input(&input)?,
                (None, None) => read_input("-")?,
            };
            commands::decode::execute(&data, json, &config)
        }

        Commands::Checksum { hex, frame } => commands::checksum::execute(&parse_hex(&hex)?, frame),

        Commands::Scan {
            input,
            output,
            stats_only,
        } => commands::scan::execute(&read_input(&input)?, output.as_deref(), stats_only, &config),

        Commands::Replay { input, output } => {
            commands::replay::execute(&read_input(&input)?, output.as_deref(), &config)
        }

        Commands::Selftest => commands::selftest::execute(&config),
    }
}
