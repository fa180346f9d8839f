//! The `thumbgate sign` command: mint a signed thumbnail URL.

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use thumbgate_core::{Config, ConfigError, Signer, Transform, TransformDescriptor};

/// Arguments for the `sign` command.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Source image id
    pub id: String,

    /// Source image hash
    pub hash: String,

    /// Bounding box, e.g. 150x200
    pub size: String,

    /// Transform token
    #[arg(short, long, default_value = "s")]
    pub transform: String,

    /// File extension (also the output format)
    #[arg(short, long, default_value = "jpg")]
    pub ext: String,

    /// Prefix the printed URI with this base URL (e.g. https://img.example.com)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print a JSON object instead of the bare URI
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SignOutput<'a> {
    uri: String,
    signature: &'a str,
    descriptor: &'a TransformDescriptor,
}

/// Execute the sign command.
pub fn execute(args: SignArgs, config: &Config) -> anyhow::Result<()> {
    let secret = config
        .signing
        .resolved_secret()
        .ok_or(ConfigError::MissingSecret)?;
    let signer = Signer::new(secret.as_bytes(), config.signing.algorithm)?;

    let mut descriptor = build_descriptor(&args)?;
    descriptor.signature = signer.sign(&descriptor);
    let uri = full_uri(&descriptor, args.base_url.as_deref());

    if args.json {
        let output = SignOutput {
            uri,
            signature: &descriptor.signature,
            descriptor: &descriptor,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{uri}");
    }
    Ok(())
}

fn build_descriptor(args: &SignArgs) -> anyhow::Result<TransformDescriptor> {
    let (width, height) = args
        .size
        .split_once('x')
        .context("size must be WIDTHxHEIGHT")?;
    let width: u32 = width.parse().context("invalid width")?;
    let height: u32 = height.parse().context("invalid height")?;
    if width == 0 || height == 0 {
        anyhow::bail!("width and height must be positive");
    }
    let transform = Transform::from_token(&args.transform)
        .with_context(|| format!("unknown transform '{}'", args.transform))?;

    Ok(TransformDescriptor {
        id: args.id.clone(),
        hash: args.hash.clone(),
        width,
        height,
        transform,
        extension: args.ext.clone(),
        signature: String::new(),
    })
}

fn full_uri(descriptor: &TransformDescriptor, base_url: Option<&str>) -> String {
    let uri = descriptor.to_request_uri();
    match base_url {
        Some(base) => format!("{}{}", base.trim_end_matches('/'), uri),
        None => uri,
    }
}
