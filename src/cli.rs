// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// If --url is missing, clap prints the usage message and exits with a
// non-zero code before any crawling starts.
// =============================================================================

use clap::Parser;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "link-crawler",
    version = "0.1.0",
    about = "A concurrent link-following web crawler",
    long_about = "link-crawler starts at a seed URL, prints the title of every page it reaches \
                  and follows links in parallel up to a depth ceiling. \
                  Send SIGUSR1 to raise the ceiling by 10 while it runs; SIGINT/SIGTERM stop it."
)]
pub struct Cli {
    /// Seed URL to start crawling from (e.g., https://en.wikipedia.org/wiki/Rust)
    #[arg(long)]
    pub url: String,

    /// Maximum crawl depth (default: 3)
    ///
    /// The seed page is depth 0, so depth 1 = just the seed page,
    /// depth 2 = the seed and every page it links to, etc.
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Number of crawl workers (default: 0 = one task per discovered link)
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Stop starting new fetches after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Skip the 2 second pause before each crawl task
    #[arg(long)]
    pub no_delay: bool,

    /// Output the run summary in JSON format
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_is_required() {
        let result = Cli::try_parse_from(["link-crawler", "--depth", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_defaults_to_three() {
        let cli = Cli::try_parse_from(["link-crawler", "--url", "https://example.com"]).unwrap();
        assert_eq!(cli.url, "https://example.com");
        assert_eq!(cli.depth, 3);
        assert!(!cli.json);
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why no subcommands here?
//    - The crawler does exactly one thing, so flags on a single struct are enough
//    - --url is a String without a default, which makes it required
//
// 2. What is Option<u64> for --deadline?
//    - clap treats Option fields as optional flags
//    - None means "no deadline", Some(30) means "stop after 30 seconds"
//
// 3. What is try_parse_from?
//    - Like parse(), but takes the arguments explicitly and returns a Result
//    - Handy in tests because it doesn't exit the process on errors
// -----------------------------------------------------------------------------
