//! zpl-preview command-line interface.
//!
//! Front end over `zpl_preview_core`: parse and inspect label files,
//! substitute template values, re-serialize, dry-run render with a
//! per-command outcome report, and convert images to and from `^GF`
//! graphics payloads.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use zpl_preview_core::{
    CodecDecoder, ImageAsset, Outcome, RecordingSurface, Stream, TemplateValues, graphic,
    parse_stream,
};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "zpl-preview",
    version,
    about = "Parse, render, and template ZPL label files"
)]
struct Cli {
    /// Output mode: human-readable text or machine-readable JSON.
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    output: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Parse a label file and report its structure.
    Check {
        /// Path to the ZPL file.
        file: PathBuf,
    },

    /// List the template fields a label file expects.
    Fields {
        /// Path to the ZPL file.
        file: PathBuf,
    },

    /// Re-serialize a label file, substituting template values.
    Format {
        /// Path to the ZPL file.
        file: PathBuf,
        /// Bind a text value, `key=value`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Write the output back to the file instead of stdout.
        #[arg(long, short)]
        write: bool,
    },

    /// Dry-run render: execute every command and report outcomes.
    Render {
        /// Path to the ZPL file.
        file: PathBuf,
        /// Bind a text value, `key=value`. Repeatable.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Bind an image value, `key=path`. Repeatable.
        #[arg(long = "image", value_name = "KEY=PATH")]
        image: Vec<String>,
        /// Include the captured draw calls in the report.
        #[arg(long)]
        trace: bool,
    },

    /// Encode an image file into a `^GF` graphics payload.
    EncodeImage {
        /// Path to the image (any format the `image` crate reads).
        file: PathBuf,
    },

    /// Decode a `^GF` graphics payload into a PNG.
    DecodeImage {
        /// Path to a file holding the payload (a leading `^GF` is allowed).
        file: PathBuf,
        /// Output PNG path.
        #[arg(long, short)]
        out: PathBuf,
    },
}

// ── Main ────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.output == "json";

    match cli.cmd {
        Cmd::Check { file } => cmd_check(&file, json),
        Cmd::Fields { file } => cmd_fields(&file, json),
        Cmd::Format { file, set, write } => cmd_format(&file, &set, write),
        Cmd::Render {
            file,
            set,
            image,
            trace,
        } => cmd_render(&file, &set, &image, trace, json).await,
        Cmd::EncodeImage { file } => cmd_encode_image(&file, json),
        Cmd::DecodeImage { file, out } => cmd_decode_image(&file, &out),
    }
}

fn load_stream(file: &Path) -> Result<Stream> {
    let text =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    match parse_stream(&text) {
        Ok(stream) => Ok(stream),
        Err(err) => {
            eprintln!("parse error: {err}");
            process::exit(1);
        }
    }
}

fn parse_values(set: &[String], image: &[String]) -> Result<TemplateValues> {
    let mut values = TemplateValues::new();
    for binding in set {
        let Some((key, value)) = binding.split_once('=') else {
            bail!("malformed --set binding {binding:?}, expected KEY=VALUE");
        };
        values.set_text(key, value);
    }
    for binding in image {
        let Some((key, path)) = binding.split_once('=') else {
            bail!("malformed --image binding {binding:?}, expected KEY=PATH");
        };
        let img = image::open(path)
            .with_context(|| format!("reading image {path}"))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        values.set_image(key, ImageAsset::from_rgba(img.as_raw(), width, height));
    }
    Ok(values)
}

// ── Subcommands ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CheckReport {
    labels: usize,
    valid: bool,
    commands: Vec<usize>,
}

fn cmd_check(file: &Path, json: bool) -> Result<()> {
    let stream = load_stream(file)?;
    let report = CheckReport {
        labels: stream.labels().len(),
        valid: stream.is_valid(),
        commands: stream.labels().iter().map(|l| l.commands().len()).collect(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} label(s), {} command(s), valid: {}",
            report.labels,
            report.commands.iter().sum::<usize>(),
            report.valid
        );
    }
    if !report.valid {
        process::exit(1);
    }
    Ok(())
}

fn cmd_fields(file: &Path, json: bool) -> Result<()> {
    let stream = load_stream(file)?;
    let mut fields = Vec::new();
    for label in stream.labels() {
        for (_, descriptor) in label.template_fields() {
            if !fields.contains(&descriptor) {
                fields.push(descriptor);
            }
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else if fields.is_empty() {
        println!("no template fields");
    } else {
        for field in fields {
            println!("{}\t{:?}", field.id, field.kind);
        }
    }
    Ok(())
}

fn cmd_format(file: &Path, set: &[String], write: bool) -> Result<()> {
    let stream = load_stream(file)?;
    let values = parse_values(set, &[])?;
    let mut parts = Vec::with_capacity(stream.labels().len());
    for label in stream.labels() {
        // Labels from a successful parse are always valid.
        parts.push(
            label
                .stringify(&values)
                .context("stringifying a parsed label")?,
        );
    }
    let text = parts.join("\n");
    if write {
        fs::write(file, text).with_context(|| format!("writing {}", file.display()))?;
    } else {
        println!("{text}");
    }
    Ok(())
}

#[derive(Serialize)]
struct RenderReport {
    label: usize,
    outcomes: Vec<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calls: Option<Vec<zpl_preview_core::DrawCall>>,
}

async fn cmd_render(
    file: &Path,
    set: &[String],
    image: &[String],
    trace: bool,
    json: bool,
) -> Result<()> {
    let mut stream = load_stream(file)?;
    let values = parse_values(set, image)?;
    let mut reports = Vec::new();
    let mut failed = false;

    for (index, label) in stream.labels_mut().iter_mut().enumerate() {
        label
            .register_images(&values, &CodecDecoder)
            .await
            .context("decoding template images")?;
        let mut surface = RecordingSurface::new();
        let outcomes = label.render(&mut surface, &values);
        failed |= outcomes.iter().any(|o| !o.ok);
        reports.push(RenderReport {
            label: index,
            outcomes,
            calls: trace.then(|| surface.into_calls()),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let failures: Vec<&Outcome> =
                report.outcomes.iter().filter(|o| !o.ok).collect();
            if failures.is_empty() {
                println!(
                    "label {}: Success! ({} draw(s))",
                    report.label,
                    report.outcomes.len()
                );
            } else {
                println!("label {}:", report.label);
                for outcome in failures {
                    let reason = outcome.reason.as_deref().unwrap_or("unknown reason");
                    println!("Failure: {} - {}", outcome.command, reason);
                }
            }
        }
    }
    if failed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_encode_image(file: &Path, json: bool) -> Result<()> {
    let img = image::open(file)
        .with_context(|| format!("reading image {}", file.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    let asset = ImageAsset::from_rgba(img.as_raw(), width, height);
    if json {
        println!(
            "{}",
            serde_json::json!({
                "encoded": asset.encoded(),
                "contentHash": asset.content_hash(),
            })
        );
    } else {
        println!("^GF{}", asset.encoded());
    }
    Ok(())
}

fn cmd_decode_image(file: &Path, out: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let payload = text.trim();
    let payload = payload.strip_prefix("^GF").unwrap_or(payload);
    let def = graphic::parse_graphic(payload)
        .map_err(|e| anyhow::anyhow!("invalid graphics payload: {e}"))?;
    let bitmap = graphic::decode_graphic(&def);

    let png = image::RgbaImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        if bitmap.get(x, y) {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    });
    png.save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!(
        "{}x{} pixels -> {}",
        bitmap.width(),
        bitmap.height(),
        out.display()
    );
    Ok(())
}
