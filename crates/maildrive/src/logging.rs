use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "warn,maildrive=info,maildrive_google=info";
const VERBOSE_DIRECTIVES: &str = "warn,maildrive=debug,maildrive_google=debug";

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    }
}

/// Diagnostics go to stderr; stdout belongs to the user-facing messages.
/// `RUST_LOG` overrides the defaults.
pub fn init(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for verbose in [false, true] {
            assert!(default_directives(verbose).parse::<EnvFilter>().is_ok());
        }
        assert!(default_directives(true).contains("maildrive=debug"));
    }
}
