use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const DEFAULT_FIXTURE: &str = "fixtures/lift_together.json";

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the ride matching workspace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the match pipeline against a local fixture file
    LocalMatch {
        /// Fixture with rideRequests and volunteers collections
        #[arg(long, default_value = DEFAULT_FIXTURE)]
        fixture: String,
        /// Only process this ride id
        #[arg(long)]
        ride: Option<String>,
    },
    /// Run the matcher benchmark
    Bench,
    /// Run CI checks
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the three Lambda binaries and zip each as `bootstrap`
    ServerlessPackage {
        /// Target triple of the Lambda runtime
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build without `--release`
        #[arg(long)]
        debug: bool,
        /// Directory receiving the zip files
        #[arg(long, env = "LAMBDA_DIST_DIR", default_value = "dist/lambda")]
        dist_dir: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CiJob {
    /// fmt, clippy and the test suites
    Check,
    /// Replay the bundled fixture
    LocalRun,
    /// Run the matcher benchmark
    Bench,
    /// Everything above, in order
    All,
}

/// A deployed function: the binary cargo builds and the zip it ships in.
struct LambdaArtifact {
    bin: &'static str,
    zip: &'static str,
}

const LAMBDA_ARTIFACTS: [LambdaArtifact; 3] = [
    LambdaArtifact {
        bin: "match_ride_lambda",
        zip: "match_ride.zip",
    },
    LambdaArtifact {
        bin: "send_notification_lambda",
        zip: "send_notification.zip",
    },
    LambdaArtifact {
        bin: "ride_api_lambda",
        zip: "ride_api.zip",
    },
];

type TaskResult = Result<(), String>;

fn cargo<S: AsRef<str>>(label: &str, args: &[S]) -> TaskResult {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    eprintln!("\n=== {label} ===\n+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(&args)
        .status()
        .map_err(|error| format!("could not start cargo: {error}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{label} failed ({status})"))
    }
}

fn local_match(fixture: &str, ride: Option<&str>) -> TaskResult {
    let mut args = vec![
        "run", "-p", "ride_match_lambda", "--bin", "local_match", "--", "--fixture", fixture,
    ];
    args.extend(ride.into_iter().flat_map(|ride| ["--ride", ride]));
    cargo(&format!("Replay {fixture}"), &args)
}

fn bench() -> TaskResult {
    cargo(
        "Matcher benchmark",
        &["bench", "-p", "ride_match_core", "--bench", "matching"],
    )
}

fn ci(job: CiJob) -> TaskResult {
    let runs = |wanted: CiJob| job == wanted || job == CiJob::All;

    if runs(CiJob::Check) {
        cargo("Formatting", &["fmt", "--all", "--", "--check"])?;
        cargo(
            "Clippy",
            &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        )?;
        cargo("Tests", &["test", "--workspace"])?;
    }
    if runs(CiJob::LocalRun) {
        local_match(DEFAULT_FIXTURE, None)?;
    }
    if runs(CiJob::Bench) {
        bench()?;
    }
    Ok(())
}

fn serverless_package(target: &str, debug: bool, dist_dir: &Path) -> TaskResult {
    let mut args = vec!["build", "-p", "ride_match_lambda", "--target", target];
    for artifact in &LAMBDA_ARTIFACTS {
        args.extend(["--bin", artifact.bin]);
    }
    if !debug {
        args.push("--release");
    }
    cargo("Build Lambda binaries", &args)?;

    let build_dir = Path::new("target")
        .join(target)
        .join(if debug { "debug" } else { "release" });
    fs::create_dir_all(dist_dir)
        .map_err(|error| format!("could not create {}: {error}", dist_dir.display()))?;

    for artifact in &LAMBDA_ARTIFACTS {
        let zip_path = dist_dir.join(artifact.zip);
        write_bootstrap_zip(&build_dir.join(artifact.bin), &zip_path)?;
        eprintln!("packaged {}", zip_path.display());
    }
    Ok(())
}

/// The provided.al2 runtime executes whatever is named `bootstrap`.
fn write_bootstrap_zip(binary_path: &Path, zip_path: &Path) -> TaskResult {
    let describe = |action: &str, path: &Path, error: &dyn std::fmt::Display| {
        format!("could not {action} {}: {error}", path.display())
    };

    let binary = fs::read(binary_path).map_err(|error| describe("read", binary_path, &error))?;
    let file =
        fs::File::create(zip_path).map_err(|error| describe("create", zip_path, &error))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .map_err(|error| describe("write", zip_path, &error))?;
    zip.write_all(&binary)
        .map_err(|error| describe("write", zip_path, &error))?;
    zip.finish()
        .map_err(|error| describe("finish", zip_path, &error))?;
    Ok(())
}

fn main() -> ExitCode {
    let result = match Cli::parse().command {
        Commands::LocalMatch { fixture, ride } => local_match(&fixture, ride.as_deref()),
        Commands::Bench => bench(),
        Commands::Ci { job } => ci(job),
        Commands::ServerlessPackage {
            target,
            debug,
            dist_dir,
        } => serverless_package(&target, debug, &dist_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("xtask: {message}");
            ExitCode::FAILURE
        }
    }
}
