use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "moodpaper", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a wallpaper PNG from a request and source images.
    Compose(ComposeArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Compose request JSON.
    #[arg(long = "request")]
    request_path: PathBuf,

    /// Source image file, in slot order; repeatable.
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Override the request seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
    }
}

fn read_request_json(path: &Path) -> anyhow::Result<moodpaper::ComposeRequest> {
    let f = File::open(path).with_context(|| format!("open request '{}'", path.display()))?;
    let r = BufReader::new(f);
    let request: moodpaper::ComposeRequest =
        serde_json::from_reader(r).with_context(|| "parse request JSON")?;
    Ok(request)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let mut request = read_request_json(&args.request_path)?;
    if let Some(seed) = args.seed {
        request.seed = Some(seed);
    }

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes =
            std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        images.push(moodpaper::SourceImage::new(name, bytes));
    }

    let png = moodpaper::compose(&request, &images)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
