//! The `thumbgate verify` command: check a URL without generating anything.

use clap::Args;
use thumbgate_core::{Config, Thumbgate};

/// Arguments for the `verify` command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Request URI, e.g. /4238_bpM4oOcw_150x200_s.jpg?ed0eee0cfa25309e40cc0d71
    pub uri: String,
}

/// Execute the verify command.
///
/// Exits with an error if the URI would not produce a thumbnail.
pub fn execute(args: VerifyArgs, config: Config) -> anyhow::Result<()> {
    let gate = Thumbgate::new(config)?;
    let uri = request_uri(&args.uri);

    match gate.authenticate(uri) {
        Ok(descriptor) => {
            println!("OK");
            println!("  source:      {}", descriptor.source_filename());
            println!("  thumbnail:   {}", descriptor.filename());
            println!("  box:         {}x{}", descriptor.width, descriptor.height);
            Ok(())
        }
        Err(e) => anyhow::bail!("{} [{}]: {}", e.status(), e.kind(), e),
    }
}

/// Strip scheme and authority from a full URL, leaving path + query.
fn request_uri(input: &str) -> &str {
    match input.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => input,
    }
}
