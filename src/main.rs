//! SWU Generator CLI
//!
//! Entry point for the `swugenerator` command-line tool.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::builder::PossibleValuesParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::error;

use swu_generator::config::load_variables;
use swu_generator::logging::{init_logging, LogConfig, LEVEL_NAMES};
use swu_generator::{
    Generator, GeneratorConfig, GeneratorError, KeyMaterial, ProcessingFlags, ResignConfig,
    Resigner, SignRequest, SystemRunner,
};

#[derive(Parser)]
#[command(name = "swugenerator")]
#[command(about = "SWU package generator for SWUpdate", version)]
struct Cli {
    /// File with the AES key and IV (`key=<hex>` and `iv=<hex>` lines)
    #[arg(short = 'K', long)]
    encryption_key_file: Option<PathBuf>,

    /// Do not compress files
    #[arg(short = 'n', long)]
    no_compress: bool,

    /// Do not encrypt files
    #[arg(short = 'e', long)]
    no_encrypt: bool,

    /// Use the IV from the key file for every artifact
    #[arg(short = 'x', long)]
    no_ivt: bool,

    /// Do not store sha256 hashes in sw-description
    #[arg(short = 'y', long)]
    no_hash: bool,

    /// Signer for sw-description, one of:
    /// CMS,<key>,<cert>[,<passfile>[,<certfile>[,<engine>[,<keyform>]]]],
    /// RSA,<key>[,<passfile>], PKCS11,<pin>[,<module>], CUSTOM,<command>
    #[arg(short = 'k', long)]
    sign: Option<String>,

    /// sw-description template
    #[arg(short = 's', long)]
    sw_description: Option<PathBuf>,

    /// Encrypt sw-description
    #[arg(short = 't', long)]
    encrypt_swdesc: bool,

    /// Comma-separated directories searched for artifacts
    #[arg(short = 'a', long, value_delimiter = ',')]
    artifactory: Vec<PathBuf>,

    /// SWU output file
    #[arg(short = 'o', long)]
    swu_file: PathBuf,

    /// Configuration file with template variables
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// SWU input file (sign)
    #[arg(short = 'i', long)]
    swu_input: Option<PathBuf>,

    /// Log level
    #[arg(
        short = 'l',
        long,
        default_value = "warning",
        ignore_case = true,
        value_parser = PossibleValuesParser::new(LEVEL_NAMES)
    )]
    loglevel: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an SWU from a sw-description template
    Create,

    /// Sign an existing SWU again
    Sign,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_name(&cli.loglevel).unwrap_or_default());

    let result = match cli.command {
        Commands::Create => run_create(&cli),
        Commands::Sign => run_sign(&cli),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(e.exit_code());
    }
}

fn run_create(cli: &Cli) -> Result<(), GeneratorError> {
    let Some(ref sw_description) = cli.sw_description else {
        usage_error(
            "the following required arguments were not provided:\n  --sw-description <SW_DESCRIPTION>",
        );
    };

    let variables = match cli.config {
        Some(ref path) => load_variables(path)?,
        None => BTreeMap::new(),
    };
    let keys = match cli.encryption_key_file {
        Some(ref path) => KeyMaterial::from_file(path)?,
        None => KeyMaterial::default(),
    };

    let config = GeneratorConfig {
        sw_description: sw_description.clone(),
        output: cli.swu_file.clone(),
        artifact_dirs: search_dirs(&cli.artifactory)?,
        variables,
        signer: parse_signer(cli)?,
        keys,
        encrypt_manifest: cli.encrypt_swdesc,
        flags: ProcessingFlags {
            no_compress: cli.no_compress,
            no_encrypt: cli.no_encrypt,
            no_ivt: cli.no_ivt,
            no_hash: cli.no_hash,
        },
    };

    let mut generator = Generator::new(config, SystemRunner)?;
    generator.process()?;
    generator.close()
}

fn run_sign(cli: &Cli) -> Result<(), GeneratorError> {
    let Some(ref input) = cli.swu_input else {
        usage_error("the following required arguments were not provided:\n  --swu-input <SWU_INPUT>");
    };

    let config = ResignConfig {
        input: input.clone(),
        output: cli.swu_file.clone(),
        signer: parse_signer(cli)?,
    };

    let mut resigner = Resigner::new(config, SystemRunner)?;
    resigner.process()?;
    resigner.close()
}

fn parse_signer(cli: &Cli) -> Result<Option<SignRequest>, GeneratorError> {
    Ok(cli.sign.as_deref().map(SignRequest::parse).transpose()?)
}

/// Current directory first, then each `-a` directory.
fn search_dirs(extra: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut dirs = vec![env::current_dir()?];
    dirs.extend(extra.iter().map(|dir| resolve_dir(dir)));
    Ok(dirs)
}

fn resolve_dir(dir: &Path) -> PathBuf {
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

fn usage_error(message: &str) -> ! {
    Cli::command()
        .error(ErrorKind::MissingRequiredArgument, message)
        .exit()
}
