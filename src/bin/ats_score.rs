use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use placement_notify::ats::calculate_ats_score;

#[derive(Parser, Debug)]
struct Args {
    /// Plain-text resume
    #[arg(long)]
    resume: PathBuf,

    /// Plain-text job description
    #[arg(long)]
    jd: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let resume = fs::read_to_string(&args.resume)
        .with_context(|| format!("failed to read {}", args.resume.display()))?;
    let jd = fs::read_to_string(&args.jd)
        .with_context(|| format!("failed to read {}", args.jd.display()))?;
    println!("{:.2}", calculate_ats_score(&resume, &jd));
    Ok(())
}
