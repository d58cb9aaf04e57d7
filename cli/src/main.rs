//! pagejson CLI - dump PDF pages as structured JSON

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pagejson::{
    DocumentHandle, ExtractionStats, Extractor, LopdfEngine, PageOutcome, PageSelection,
    RenderEngine,
};

#[derive(Parser)]
#[command(name = "pagejson")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Dump PDF pages as structured JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of pages
    Count {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Serialize one page
    Page {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page number (1-based)
        #[arg(value_name = "PAGE")]
        page: u32,

        /// Inline images as base64 PNG
        #[arg(long)]
        images: bool,

        /// Indent the output
        #[arg(long)]
        pretty: bool,

        /// Largest image area that is inlined
        #[arg(long, value_name = "N", env = "PAGEJSON_MAX_IMAGE_AREA")]
        max_image_area: Option<i64>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Serialize every page
    Dump {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Inline images as base64 PNG
        #[arg(long)]
        images: bool,

        /// Process pages one at a time
        #[arg(long)]
        sequential: bool,

        /// Output directory, one page-N.json per page (stdout if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Show document information and per-page block statistics
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Count { input } => cmd_count(&input),
        Commands::Page {
            input,
            page,
            images,
            pretty,
            max_image_area,
            output,
        } => cmd_page(&input, page, images, pretty, max_image_area, output.as_deref()),
        Commands::Dump {
            input,
            pages,
            images,
            sequential,
            output,
        } => cmd_dump(&input, pages.as_deref(), images, sequential, output.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_count(input: &Path) -> CliResult<()> {
    let pages = pagejson::count_pages(input)?;
    println!("{}", pages);
    Ok(())
}

fn cmd_page(
    input: &Path,
    page: u32,
    images: bool,
    pretty: bool,
    max_image_area: Option<i64>,
    output: Option<&Path>,
) -> CliResult<()> {
    let mut extractor = Extractor::new().with_images(images);
    if pretty {
        extractor = extractor.pretty();
    }
    if let Some(area) = max_image_area {
        extractor = extractor.with_max_image_area(area);
    }

    let page = extractor.page(input, page)?;

    if let Some(path) = output {
        fs::write(path, &page.json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", page.json);
    }

    Ok(())
}

fn cmd_dump(
    input: &Path,
    pages: Option<&str>,
    images: bool,
    sequential: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let selection = match pages {
        Some(p) => PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?,
        None => PageSelection::All,
    };

    let mut extractor = Extractor::new().with_images(images).with_pages(selection);
    if sequential {
        extractor = extractor.sequential();
    }

    let outcomes = extractor.document(input)?;

    let failed = match output {
        Some(dir) => write_pages(dir, &outcomes)?,
        None => print_pages(&outcomes),
    };

    if failed > 0 {
        return Err(format!("{} of {} pages failed", failed, outcomes.len()).into());
    }
    Ok(())
}

fn print_pages(outcomes: &[PageOutcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(page) => println!("Page {} JSON:\n{}", outcome.page, page.json),
            Err(e) => {
                eprintln!("{} {}", "Failed:".red(), e);
                failed += 1;
            }
        }
    }
    failed
}

fn write_pages(dir: &Path, outcomes: &[PageOutcome]) -> CliResult<usize> {
    fs::create_dir_all(dir)?;

    let pb = ProgressBar::new(outcomes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut failed = 0;
    for outcome in outcomes {
        pb.set_message(format!("page {}", outcome.page));
        match &outcome.result {
            Ok(page) => {
                fs::write(page_file(dir, outcome.page), &page.json)?;
            }
            Err(e) => {
                pb.suspend(|| eprintln!("{} {}", "Failed:".red(), e));
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    println!(
        "{} {} pages written to {}",
        "Done!".green().bold(),
        outcomes.len() - failed,
        dir.display()
    );
    Ok(failed)
}

fn page_file(dir: &Path, page: u32) -> PathBuf {
    dir.join(format!("page-{}.json", page))
}

fn cmd_info(input: &Path) -> CliResult<()> {
    let document = LopdfEngine::new().open_document(input)?;
    let pdf_version = document.version();
    let page_count = document.page_count()?;
    drop(document);

    let outcomes = Extractor::new().document(input)?;

    let mut total = ExtractionStats::new();
    let mut pages = Vec::with_capacity(outcomes.len());
    for outcome in &outcomes {
        match &outcome.result {
            Ok(page) => {
                total.merge(&page.stats);
                pages.push(serde_json::json!({
                    "page": outcome.page,
                    "blocks": page.stats.block_count(),
                    "text_blocks": page.stats.text_block_count,
                    "lines": page.stats.line_count,
                    "chars": page.stats.char_count,
                    "images": page.stats.image_count,
                    "other": page.stats.other_block_count,
                }));
            }
            Err(e) => pages.push(serde_json::json!({
                "page": outcome.page,
                "error": e.to_string(),
            })),
        }
    }

    let info = serde_json::json!({
        "file": input.display().to_string(),
        "pdf_version": pdf_version,
        "page_count": page_count,
        "totals": total,
        "pages": pages,
    });
    println!("{}", serde_json::to_string_pretty(&info)?);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pagejson".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF page to JSON extraction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pagejson".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_page_command() {
        let cli = Cli::try_parse_from([
            "pagejson", "page", "doc.pdf", "3", "--images", "--max-image-area", "100",
        ])
        .unwrap();
        match cli.command {
            Commands::Page {
                page,
                images,
                pretty,
                max_image_area,
                ..
            } => {
                assert_eq!(page, 3);
                assert!(images);
                assert!(!pretty);
                assert_eq!(max_image_area, Some(100));
            }
            _ => panic!("expected page command"),
        }
    }

    #[test]
    fn test_write_pages_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let outcomes = vec![
            PageOutcome {
                page: 1,
                result: Ok(pagejson::PageJson {
                    page: 1,
                    json: r#"{"blocks":[]}"#.to_string(),
                    stats: ExtractionStats::new(),
                }),
            },
            PageOutcome {
                page: 2,
                result: Err(pagejson::Error::PageOutOfRange(2, 1)),
            },
        ];

        let failed = write_pages(dir.path(), &outcomes).unwrap();
        assert_eq!(failed, 1);
        let written = fs::read_to_string(page_file(dir.path(), 1)).unwrap();
        assert_eq!(written, r#"{"blocks":[]}"#);
        assert!(!page_file(dir.path(), 2).exists());
    }
}
