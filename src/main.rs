use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use compos_layout::draw;
use compos_layout::{analyze_layout, load_compos, ComposTable, RecognitionParams};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorBy {
    Class,
    Group,
    GroupPair,
    ListItem,
}

impl ColorBy {
    fn column(self) -> &'static str {
        match self {
            ColorBy::Class => "class",
            ColorBy::Group => "group",
            ColorBy::GroupPair => "group_pair",
            ColorBy::ListItem => "list_item",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Recognize repeated groups, pairs and list items among detected GUI components.",
    arg_required_else_help = true
)]
pub struct Args {
    /// Path to the detector's component JSON
    pub input: PathBuf,

    /// Optional CSV output path. If omitted, writes to stdout.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Optional JSON file overriding recognition parameters
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Screenshot to draw the results on
    #[clap(long, requires = "draw_dir")]
    pub image: Option<PathBuf>,

    /// Directory for rendered visualizations
    #[clap(long)]
    pub draw_dir: Option<PathBuf>,

    /// Attribute the visualization is colored by
    #[clap(long, value_enum, default_value_t = ColorBy::ListItem)]
    pub color_by: ColorBy,

    /// Enable debug logging for every stage
    #[clap(long)]
    pub debug: bool,

    /// Directory for the log file
    #[clap(long)]
    pub log_dir: Option<PathBuf>,
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn draw_results(table: &ComposTable, args: &Args) -> anyhow::Result<()> {
    let (Some(image), Some(draw_dir)) = (&args.image, &args.draw_dir) else {
        return Ok(());
    };
    let screenshot = image::open(expand(image))
        .with_context(|| format!("Failed to open screenshot {}", image.display()))?
        .to_rgb8();
    let column = args.color_by.column();
    let path = draw::visualize(&screenshot, table, column, column, &expand(draw_dir))?;
    info!(path = %path.display(), "Wrote visualization");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive so the file log is flushed on exit
    let _guard = match &args.log_dir {
        Some(log_dir) => compos_layout::logging::init_logging_with_dir(args.debug, expand(log_dir))?,
        None => {
            compos_layout::logging::init_logging(args.debug);
            None
        }
    };

    let params = match &args.config {
        Some(path) => RecognitionParams::from_json_file(&expand(path))
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RecognitionParams::default(),
    };

    let input = expand(&args.input);
    let table = load_compos(&input)
        .with_context(|| format!("Failed to load components from {}", input.display()))?;
    let table = analyze_layout(table, &params)?;

    match &args.output {
        Some(path) => {
            let path = expand(path);
            table.write_csv(&path)?;
            info!("Output written to: {:?}", path);
        }
        None => {
            let mut csv = Vec::new();
            table.to_csv(&mut csv)?;
            print!("{}", String::from_utf8_lossy(&csv));
        }
    }

    draw_results(&table, &args)?;
    Ok(())
}
