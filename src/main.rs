use cardify::{Backend, CardRequest, CardResponse, Cardify, CardifyConfig, WaitUntil};
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Generate a 500x500 preview card for a web page.
#[derive(Debug, Parser)]
#[command(name = "cardify", version)]
struct Args {
    /// Page to render
    #[arg(required_unless_present = "request", conflicts_with = "request")]
    url: Option<String>,

    /// Read a JSON request (`{"url": ...}`) from a file, or `-` for stdin
    #[arg(long)]
    request: Option<PathBuf>,

    /// Also write the card as PNG to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Backend::default())]
    backend: Backend,

    /// Chrome/Chromium executable
    #[arg(long, env = "CARDIFY_CHROME")]
    chrome: Option<PathBuf>,

    /// Disable the Chrome sandbox (needed when running as root in containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Navigation timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// When a navigation counts as finished
    #[arg(long, value_enum, default_value_t = WaitUntil::NetworkIdle)]
    wait_until: WaitUntil,

    /// Font file to use instead of system fonts (repeatable)
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,
}

fn read_request(path: &PathBuf) -> io::Result<CardRequest> {
    let mut raw = String::new();
    if path.as_os_str() == "-" {
        io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(path)?;
    }
    serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn emit(response: &CardResponse) -> io::Result<()> {
    let js = serde_json::to_string(response)
        .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", cardify::service::GENERIC_FAILURE));
    let mut out = io::stdout().lock();
    writeln!(out, "{}", js)?;
    out.flush()
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let request = match &args.request {
        Some(path) => match read_request(path) {
            Ok(req) => req,
            Err(e) => {
                eprintln!("Failed to read request {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => CardRequest { url: args.url.clone() },
    };

    let mut config = CardifyConfig {
        backend: args.backend,
        font_files: args.fonts.clone(),
        ..CardifyConfig::default()
    };
    config.browser.chrome_path = args.chrome.clone();
    config.browser.sandbox = !args.no_sandbox;
    config.browser.timeout_ms = args.timeout_ms;
    config.browser.wait_until = args.wait_until;

    let cardify = match Cardify::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            return ExitCode::from(2);
        }
    };

    let (response, png) = match cardify.process(&request).await {
        Ok(card) => {
            let png = match &args.output {
                Some(_) => card.to_png().ok(),
                None => None,
            };
            (CardResponse::from_result(Ok(card)), png)
        }
        Err(e) => (CardResponse::from_result(Err(e)), None),
    };

    if let Err(e) = emit(&response) {
        eprintln!("Failed to write response: {}", e);
        return ExitCode::FAILURE;
    }

    if let (Some(path), Some(bytes)) = (&args.output, png) {
        if let Err(e) = std::fs::write(path, bytes) {
            eprintln!("Failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
