/// CLI argument parsing and help text

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server, optionally overriding PORT
    Serve { port: Option<u16> },
    /// Run one audio retention sweep and print the result
    Sweep,
    /// Check the environment configuration and exit
    ValidateEnv,
    Help,
    Version,
}

/// Parse arguments (without the program name)
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut command = None;
    let mut port = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "--sweep" => command = Some(Command::Sweep),
            "--validate-env" => command = Some(Command::ValidateEnv),
            "--port" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--port requires a value".to_string())?;
                port = Some(
                    value
                        .parse::<u16>()
                        .map_err(|_| format!("invalid port: {}", value))?,
                );
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(command.unwrap_or(Command::Serve { port }))
}

pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!("StudyHive Server v{}", version);
    println!("Turns lecture notes into study guides, podcasts and flashcards");
    println!();
    println!("USAGE:");
    println!("    studyhive_server [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>         Server port (default: $PORT or 3000)");
    println!("    --sweep               Run one audio cleanup sweep and exit");
    println!("    --validate-env        Check configuration and exit");
    println!("    -h, --help            Print this help message");
    println!("    -v, --version         Print version information");
    println!();
    println!("SERVER ENDPOINTS:");
    println!("    POST   /api/generate-summary     - Notes to study guide");
    println!("    POST   /api/generate-podcast     - Summary to MP3 podcast");
    println!("    POST   /api/generate-flashcards  - Notes to flashcards");
    println!("    GET    /api/health               - Health check");
    println!("    GET    /audio/<file>             - Generated audio");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    GEMINI_API_KEY                      - Text provider key (required)");
    println!("    GEMINI_MODEL                        - Model name (default: gemini-2.5-flash)");
    println!("    GOOGLE_APPLICATION_CREDENTIALS      - Service account JSON or path to it");
    println!("    GOOGLE_APPLICATION_CREDENTIALS_JSON - Service account JSON (takes precedence)");
    println!("    ALLOWED_ORIGINS                     - Comma separated CORS allow-list");
    println!("    PORT, APP_ENV                       - Port and environment name");
    println!("    DEFAULT_VOICE                       - Podcast voice (default: en-US-Neural2-F)");
    println!("    AUDIO_DIR, PUBLIC_DIR               - Audio output and static file directories");
    println!("    PROVIDER_TIMEOUT_SECONDS            - Per provider call deadline (default: 90)");
    println!("    REQUEST_TIMEOUT_SECONDS             - Whole request deadline (default: 300)");
    println!("    RATE_LIMIT_MAX_REQUESTS             - Requests per window (default: 10)");
    println!("    RATE_LIMIT_WINDOW_SECONDS           - Window length (default: 900)");
    println!("    AUDIO_RETENTION_HOURS               - Audio kept for (default: 24)");
    println!("    AUDIO_MAX_STORAGE_MB                - Audio storage budget (default: 100)");
    println!("    AUDIO_CLEANUP_INTERVAL_HOURS        - Sweep interval (default: 6)");
    println!("    STUDYHIVE_LOG_DIR                   - Log directory");
    println!("    RUST_LOG                            - Console log filter");
    println!();
    println!("Settings can also be placed in a .env file in the working directory.");
}

pub fn print_version() {
    println!("StudyHive Server v{}", env!("CARGO_PKG_VERSION"));
}
