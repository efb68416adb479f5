use clap::Parser;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "edge-gatekeeper")]
#[command(about = "Per-client rate limiting gatekeeper with challenge based unblocking")]
pub struct Args {
    // Port to run the public listener on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Origin server every allowed request is forwarded to
    #[arg(short, long, env = "ORIGIN_URL", default_value = "http://localhost:3000")]
    pub origin: String,

    // Counter store: "memory" or a redis:// url
    #[arg(short, long, env = "COUNTER_STORE_URL", default_value = "memory")]
    pub store: String,

    // Shared secret for /admin/unblock
    #[arg(long, env = "ADMIN_SECRET")]
    pub admin_secret: Option<String>,

    // Turnstile widget site key (public, embedded in the challenge page)
    #[arg(long, env = "TURNSTILE_SITE_KEY", default_value = "")]
    pub turnstile_site_key: String,

    // Turnstile secret used for server side verification
    #[arg(long, env = "TURNSTILE_SECRET_KEY")]
    pub turnstile_secret_key: Option<String>,

    #[arg(
        long,
        env = "TURNSTILE_VERIFY_URL",
        default_value = "https://challenges.cloudflare.com/turnstile/v0/siteverify"
    )]
    pub turnstile_verify_url: String,

    // External unblock endpoint blocked clients are sent to
    #[arg(long, env = "UNBLOCK_URL", default_value = "https://example.com/unblock")]
    pub unblock_url: String,

    #[arg(long, env = "UNBLOCK_KEY", default_value = "fixstaticone")]
    pub unblock_key: String,

    // "redirect" sends the browser to the unblock url, "fetch" calls it server side
    #[arg(
        long,
        env = "UNBLOCK_MODE",
        default_value = "redirect",
        value_parser = parse_unblock_mode
    )]
    pub unblock_mode: UnblockMode,

    // Header carrying the client identity
    #[arg(long, env = "IDENTITY_HEADER", default_value = "student-id")]
    pub identity_header: String,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 2)]
    pub rate_limit: u64,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Timeout for origin, verifier and unblock calls in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value_t = 30)]
    pub upstream_timeout: u64,

    // Largest client request body forwarded to origin, in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_body_bytes: usize,

    // Optional port for /health and /metrics
    #[arg(long, env = "OPS_PORT")]
    pub ops_port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnblockMode {
    #[default]
    Redirect,
    Fetch,
}

// Anything other than "fetch" means redirect
fn parse_unblock_mode(s: &str) -> Result<UnblockMode, String> {
    if s.trim().eq_ignore_ascii_case("fetch") {
        Ok(UnblockMode::Fetch)
    } else {
        Ok(UnblockMode::Redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_worker_fallbacks() {
        let args = Args::try_parse_from(["edge-gatekeeper"]).unwrap();
        assert_eq!(args.rate_limit, 2);
        assert_eq!(args.rate_window, 60);
        assert_eq!(args.unblock_url, "https://example.com/unblock");
        assert_eq!(args.unblock_key, "fixstaticone");
        assert_eq!(args.unblock_mode, UnblockMode::Redirect);
        assert_eq!(args.identity_header, "student-id");
        assert!(args.admin_secret.is_none());
        assert_eq!(args.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn unblock_mode_is_case_insensitive_and_lenient() {
        assert_eq!(parse_unblock_mode("FETCH").unwrap(), UnblockMode::Fetch);
        assert_eq!(parse_unblock_mode("fetch").unwrap(), UnblockMode::Fetch);
        assert_eq!(parse_unblock_mode("redirect").unwrap(), UnblockMode::Redirect);
        assert_eq!(parse_unblock_mode("bogus").unwrap(), UnblockMode::Redirect);
    }
}
