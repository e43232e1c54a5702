use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use webmod_files::{
    ingest, random_string, FileRecord, IncomingFilePart, IngestFailure, UploadConfig,
    UploadError,
};
use webmod_types::Slug;

#[derive(Parser)]
#[command(name = "webmod")]
#[command(about = "webmod file upload toolkit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store local files in a directory, the same way uploads are stored
    Upload {
        /// Destination directory (created if missing)
        dir: PathBuf,
        /// Files to store, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep the original file names instead of random ones
        #[arg(long)]
        keep_names: bool,
        /// Allowed media type (repeatable; any type when omitted)
        #[arg(long = "allow", value_name = "MIME")]
        allow: Vec<String>,
        /// Upper bound for the combined size of all files
        #[arg(long)]
        max_bytes: Option<u64>,
    },
    /// Turn text into a URL-safe slug
    Slug {
        /// Text to slugify
        text: String,
    },
    /// Print a random string
    Random {
        /// Number of characters
        len: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Upload {
            dir,
            files,
            keep_names,
            allow,
            max_bytes,
        }) => {
            let config = UploadConfig::new(max_bytes, allow);
            match upload_files(&files, &dir, &config, !keep_names) {
                Ok(records) => {
                    print_records(&records);
                    ExitCode::SUCCESS
                }
                Err(failure) => {
                    print_records(&failure.written);
                    eprintln!("Error storing files: {}", failure.error);
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Slug { text }) => match Slug::new(&text) {
            Ok(slug) => {
                println!("{}", slug);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error creating slug: {}", e);
                ExitCode::FAILURE
            }
        },
        Some(Commands::Random { len }) => {
            println!("{}", random_string(len));
            ExitCode::SUCCESS
        }
        None => {
            println!("Use 'webmod --help' for commands");
            ExitCode::SUCCESS
        }
    }
}

fn print_records(records: &[FileRecord]) {
    for record in records {
        println!(
            "Stored {} as {} ({} bytes)",
            record.original_name, record.assigned_name, record.byte_size
        );
    }
}

/// Opens `files` and ingests them into `dir`.
///
/// Every file is opened, and the combined size checked against the configured bound,
/// before anything is written.
fn upload_files(
    files: &[PathBuf],
    dir: &Path,
    config: &UploadConfig,
    rename: bool,
) -> Result<Vec<FileRecord>, IngestFailure> {
    let mut parts = Vec::with_capacity(files.len());
    let mut total: u64 = 0;

    for path in files {
        let open_err = |source| UploadError::Write {
            path: path.clone(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        total += file.metadata().map_err(open_err)?.len();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UploadError::MalformedMultipart(format!("{} has no file name", path.display()))
            })?;
        parts.push(IncomingFilePart::new(name, file));
    }

    if total > config.max_total_bytes() {
        return Err(UploadError::PayloadTooLarge {
            limit: config.max_total_bytes(),
        }
        .into());
    }

    ingest(parts, dir, config, rename)
}
