//! SealPipe CLI - encrypt and decrypt streams with a password or key.
//!
//! Data flows from stdin (or `--input`) to stdout (or `--output`). Logs go
//! to stderr so they never mix with the data.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sealpipe_common::{Error, SensitiveBytes};
use sealpipe_crypto::{
    inspect_header, KdfParams, KeySource, Operation, StreamOptions, DEFAULT_CHUNK_SIZE,
};

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "SEALPIPE_LOG";

#[derive(Parser)]
#[command(name = "sealpipe")]
#[command(about = "SealPipe - Authenticated stream encryption")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt data.
    Enc {
        #[command(flatten)]
        key: KeyArgs,

        /// Key derivation profile used with a password.
        #[arg(long, value_enum, default_value_t = KdfProfile::Scrypt)]
        kdf: KdfProfile,

        /// Plaintext bytes per chunk.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[command(flatten)]
        streams: StreamArgs,
    },

    /// Decrypt data.
    Dec {
        #[command(flatten)]
        key: KeyArgs,

        #[command(flatten)]
        streams: StreamArgs,
    },

    /// Print the key derived from a password and salt as hex.
    Derive {
        /// The password used to derive the key.
        #[arg(long)]
        pwd: Option<String>,

        /// Read the password from the terminal.
        #[arg(long, conflicts_with = "pwd")]
        prompt: bool,

        /// The salt used to derive the key from the password.
        #[arg(long)]
        salt: Option<String>,

        /// Key derivation profile.
        #[arg(long, value_enum, default_value_t = KdfProfile::Scrypt)]
        kdf: KdfProfile,
    },

    /// Show the header of an encrypted stream as JSON.
    Inspect {
        /// Input file (default: stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// The password used to derive the key.
    #[arg(long, conflicts_with = "key")]
    pwd: Option<String>,

    /// Read the password from the terminal.
    #[arg(long, conflicts_with_all = ["pwd", "key"])]
    prompt: bool,

    /// The salt used to derive the key from the password.
    #[arg(long)]
    salt: Option<String>,

    /// 256-bit key as hex; cannot be used with a password.
    #[arg(long)]
    key: Option<String>,
}

#[derive(Args)]
struct StreamArgs {
    /// Input file (default: stdin).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KdfProfile {
    /// scrypt, N=16384, r=8, p=1.
    ScryptLegacy,
    /// scrypt, N=32768, r=8, p=1.
    Scrypt,
    /// Argon2id, 64 MiB, 3 iterations.
    Argon2idInteractive,
    /// Argon2id, 32 MiB, 3 iterations.
    Argon2idModerate,
    /// Argon2id, 256 MiB, 4 iterations.
    Argon2idSensitive,
}

impl KdfProfile {
    fn params(self) -> KdfParams {
        match self {
            KdfProfile::ScryptLegacy => KdfParams::scrypt_legacy(),
            KdfProfile::Scrypt => KdfParams::scrypt(),
            KdfProfile::Argon2idInteractive => KdfParams::interactive(),
            KdfProfile::Argon2idModerate => KdfParams::moderate(),
            KdfProfile::Argon2idSensitive => KdfParams::sensitive(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Setup logging on stderr.
fn init_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Enc {
            key,
            kdf,
            chunk_size,
            streams,
        } => {
            let source = key_source(key, kdf.params(), true)?;
            let options = StreamOptions { chunk_size };
            run_stream(Operation::Encrypt(source), &options, &streams)
        }

        Commands::Dec { key, streams } => {
            let source = key_source(key, KdfParams::default(), false)?;
            run_stream(Operation::Decrypt(source), &StreamOptions::default(), &streams)
        }

        Commands::Derive {
            pwd,
            prompt,
            salt,
            kdf,
        } => {
            let password = read_password(pwd, prompt, false)?.ok_or_else(|| {
                Error::Usage("derive requires a password (--pwd or --prompt)".to_string())
            })?;
            let salt = salt.map(SensitiveBytes::from).unwrap_or_else(|| {
                warn!("Deriving key with an empty salt");
                SensitiveBytes::new(Vec::new())
            });

            let operation = Operation::DeriveOnly {
                password,
                salt,
                kdf: kdf.params(),
            };
            operation
                .run(io::empty(), io::stdout().lock())
                .context("Failed to derive key from password and salt")?;
            Ok(())
        }

        Commands::Inspect { input } => {
            let reader = open_input(input.as_deref())?;
            let header = inspect_header(reader).context("Failed to read stream header")?;
            let json = serde_json::to_string_pretty(&header)
                .map_err(|e| Error::Serialization(e.to_string()))?;
            println!("{}", json);
            Ok(())
        }
    }
}

/// Validate key arguments into a key source before any stream is opened.
fn key_source(args: KeyArgs, kdf: KdfParams, confirm: bool) -> Result<KeySource> {
    let password = read_password(args.pwd, args.prompt, confirm)?;
    let salt = args.salt.map(SensitiveBytes::from);
    Ok(KeySource::from_args(password, salt, args.key.as_deref(), kdf)?)
}

/// Password from the command line, or prompt for it.
fn read_password(
    pwd: Option<String>,
    prompt: bool,
    confirm: bool,
) -> Result<Option<SensitiveBytes>> {
    if !prompt {
        return Ok(pwd.map(SensitiveBytes::from));
    }

    let password = SensitiveBytes::from(
        rpassword::prompt_password("Enter password: ").context("Failed to read password")?,
    );
    if confirm {
        let again = SensitiveBytes::from(
            rpassword::prompt_password("Confirm password: ").context("Failed to read password")?,
        );
        if password.as_bytes() != again.as_bytes() {
            return Err(Error::Usage("passwords do not match".to_string()).into());
        }
    }
    Ok(Some(password))
}

fn run_stream(operation: Operation, options: &StreamOptions, streams: &StreamArgs) -> Result<()> {
    let reader = open_input(streams.input.as_deref())?;
    let output = streams.output.as_deref();

    let context = match &operation {
        Operation::Encrypt(_) => "Failed to encrypt data",
        Operation::Decrypt(_) => "Failed to decrypt data",
        Operation::DeriveOnly { .. } => "Failed to derive key",
    };
    // Output is created only once the key is known.
    let result = operation
        .run_into(options, reader, || open_output(output))
        .context(context)?;
    debug!(?result, "Done");
    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .map_err(Error::from)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("failed to create output {}: {}", path.display(), e),
                )
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Map an error to the exit code of its category.
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<Error>() {
            return e.kind().exit_code();
        }
        if cause.downcast_ref::<io::Error>().is_some() {
            return sealpipe_common::ErrorKind::Io.exit_code();
        }
    }
    1
}
