use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use pagemark::cleaner::MANUAL_REVIEW_MARKER;
use pagemark::pdf::ExtractOptions;
use pagemark::{
    BackendChoice, HtmlDocument, InsertOptions, PageReference, Strategy, extract_references,
    generate_template, load_references, mark_html, save_references, validate_references,
};

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(version, about = "Insert print-page markers into EPUB/HTML text")]
struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert page-number markers into an HTML file
    Mark {
        input_html: PathBuf,
        page_references: PathBuf,
        /// Defaults to <input>.marked.html
        output_html: Option<PathBuf>,
        /// Add a stylesheet rule for the marker spans
        #[arg(long)]
        inject_css: bool,
        /// Keep markers that land out of document order
        #[arg(long)]
        keep_out_of_order: bool,
    },
    /// Extract page-boundary snippets from a PDF
    Extract {
        pdf: PathBuf,
        output_json: PathBuf,
        /// HTML rendition used as reference text for snippet repair
        html: Option<PathBuf>,
        /// Ignore the HTML reference and keep raw cleaned PDF text
        #[arg(long)]
        raw_pdf: bool,
        /// Replace snippets with the closest reference window by edit distance
        #[arg(long)]
        fuzzy_match: bool,
        /// Words per snippet
        #[arg(short = 'w', long, default_value_t = 10)]
        words: usize,
        /// Pages yielding fewer words get a placeholder
        #[arg(long, default_value_t = 3)]
        min_words: usize,
        #[arg(long, value_enum, default_value_t)]
        strategy: StrategyArg,
        #[arg(long, value_enum, default_value_t)]
        backend: BackendArg,
        /// First PDF page to process (1-based)
        #[arg(long)]
        start_page: Option<usize>,
        /// Last PDF page to process (inclusive)
        #[arg(long)]
        end_page: Option<usize>,
        /// Added to PDF page numbers to get book page labels
        #[arg(long, default_value_t = 0)]
        page_offset: i64,
        /// Rebuild word boundaries with a frequency dictionary
        #[arg(long)]
        segment_words: bool,
        /// Dictionary language for --segment-words
        #[arg(long, default_value = "el")]
        language: String,
        /// Word list path, one word per line
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Print entries that need manual review after extraction
        #[arg(long)]
        review: bool,
        /// Extra exclusion regex, repeatable
        #[arg(short = 'x', long = "exclude")]
        exclude: Vec<String>,
        #[arg(long)]
        no_default_excludes: bool,
        /// Keep footnote-sized text (layout-aware backends only)
        #[arg(long)]
        include_footnotes: bool,
        /// Smallest font size treated as body text, in points
        #[arg(long, default_value_t = 8.5)]
        min_font_size: f32,
        /// Two-column page order with a bottom footnote zone
        #[arg(long)]
        two_column: bool,
        /// Context words stored on each side of a snippet, 0 disables
        #[arg(long, default_value_t = 4)]
        context_words: usize,
    },
    /// Write a page-reference template with placeholder snippets
    Generate {
        num_pages: usize,
        output_file: PathBuf,
        /// First page number
        #[arg(long, default_value_t = 1)]
        start_page: usize,
        /// Label pages with Roman numerals (front matter)
        #[arg(long)]
        roman: bool,
    },
    /// Check a page-reference file for duplicates and placeholders
    Validate {
        json: PathBuf,
        /// Also check snippets against this HTML rendition
        #[arg(long)]
        html: Option<PathBuf>,
        #[arg(long)]
        show_duplicates: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum StrategyArg {
    /// Tail of the page text
    #[default]
    Tail,
    /// Visually lowest text block (layout-aware backends only)
    LowestBlock,
    /// Head of the page text
    Head,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Tail => Strategy::TailOfPage,
            StrategyArg::LowestBlock => Strategy::LowestBlock,
            StrategyArg::Head => Strategy::HeadOfPage,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum BackendArg {
    /// Layout-aware when compiled in, text-only otherwise
    #[default]
    Auto,
    /// Pure-Rust text extraction
    Fast,
    /// mupdf with line positions and font sizes
    Layout,
}

impl From<BackendArg> for BackendChoice {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => BackendChoice::Auto,
            BackendArg::Fast => BackendChoice::FastNative,
            BackendArg::Layout => BackendChoice::LayoutAware,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    match cli.command {
        Command::Mark {
            input_html,
            page_references,
            output_html,
            inject_css,
            keep_out_of_order,
        } => run_mark(
            &input_html,
            &page_references,
            output_html,
            inject_css,
            keep_out_of_order,
        ),
        Command::Extract {
            pdf,
            output_json,
            html,
            raw_pdf,
            fuzzy_match,
            words,
            min_words,
            strategy,
            backend,
            start_page,
            end_page,
            page_offset,
            segment_words,
            language,
            dictionary,
            review,
            exclude,
            no_default_excludes,
            include_footnotes,
            min_font_size,
            two_column,
            context_words,
        } => {
            let options = ExtractOptions {
                backend: backend.into(),
                strategy: strategy.into(),
                snippet_words: words,
                min_words,
                segment_words,
                language,
                dictionary,
                fuzzy_match,
                skip_footnotes: !include_footnotes,
                min_font_size,
                two_column,
                exclude_patterns: exclude,
                default_excludes: !no_default_excludes,
                start_page,
                end_page,
                page_offset,
                context_words,
            };
            run_extract(&pdf, &output_json, html.as_deref(), raw_pdf, review, &options)
        }
        Command::Generate {
            num_pages,
            output_file,
            start_page,
            roman,
        } => run_generate(num_pages, &output_file, start_page, roman),
        Command::Validate {
            json,
            html,
            show_duplicates,
        } => run_validate(&json, html.as_deref(), show_duplicates),
    }
}

fn run_mark(
    input: &Path,
    references_path: &Path,
    output: Option<PathBuf>,
    inject_css: bool,
    keep_out_of_order: bool,
) -> Result<()> {
    let html = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let references = load_references(references_path)?;
    info!(
        "marking {} with {} page references",
        input.display(),
        references.len()
    );

    let options = InsertOptions {
        inject_css,
        repair_out_of_order: !keep_out_of_order,
        ..InsertOptions::default()
    };
    let (marked, report) = mark_html(&html, &references, &options)?;

    let output = output.unwrap_or_else(|| input.with_extension("marked.html"));
    fs::write(&output, marked)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{}: {} markers inserted, {} not found, {} skipped",
        output.display(),
        report.stats.found,
        report.stats.not_found,
        report.stats.placeholders_skipped
    );
    if report.stats.out_of_order_removed > 0 {
        println!(
            "  removed {} out-of-order markers",
            report.stats.out_of_order_removed
        );
    }
    if report.stats.multiple_matches + report.stats.context_fallback > 0 {
        println!(
            "  {} pages matched ambiguously, verify them by eye",
            report.stats.multiple_matches + report.stats.context_fallback
        );
    }
    for failure in &report.failures {
        println!("  page {} not found: {:?}", failure.page, failure.snippet);
    }
    Ok(())
}

fn run_extract(
    pdf: &Path,
    output: &Path,
    html: Option<&Path>,
    raw_pdf: bool,
    review: bool,
    options: &ExtractOptions,
) -> Result<()> {
    let reference = match html {
        Some(path) if !raw_pdf => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(HtmlDocument::parse(&content)?.text())
        }
        _ => None,
    };

    let (references, stats) = extract_references(pdf, reference.as_deref(), options)?;
    save_references(output, &references)?;

    println!(
        "{}: {} pages, {} snippets extracted, {} too thin, {} failed",
        output.display(),
        stats.total_pages,
        stats.successful,
        stats.insufficient_text,
        stats.failed
    );

    if review {
        for entry in references.iter().filter(|r| needs_review(r)) {
            let note = entry.note.as_deref().unwrap_or("low confidence");
            println!("  page {} [{note}]: {:?}", entry.page, entry.snippet);
        }
    }
    Ok(())
}

fn needs_review(entry: &PageReference) -> bool {
    entry.is_placeholder()
        || entry.note.is_some()
        || entry.snippet.contains(MANUAL_REVIEW_MARKER)
        || entry.confidence.is_some_and(|c| c < 0.8)
}

fn run_generate(num_pages: usize, output: &Path, start_page: usize, roman: bool) -> Result<()> {
    let references = generate_template(num_pages, start_page, roman);
    save_references(output, &references)?;
    println!(
        "{}: {} template entries starting at page {}",
        output.display(),
        num_pages,
        references.first().map_or(String::new(), |r| r.page.clone())
    );
    Ok(())
}

fn run_validate(json: &Path, html: Option<&Path>, show_duplicates: bool) -> Result<()> {
    let references = load_references(json)?;
    let html_text = match html {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(HtmlDocument::parse(&content)?.text())
        }
        None => None,
    };

    let report = validate_references(&references, html_text.as_deref());
    println!(
        "{}: {} entries, {} unique snippets, {} duplicated, {} placeholders",
        json.display(),
        report.total,
        report.unique,
        report.duplicates.len(),
        report.placeholders
    );
    if let Some(rate) = report.html_match_rate {
        println!("  {:.1}% of snippets found verbatim in the HTML", rate * 100.0);
    }
    if let Some(missing) = &report.missing_from_html {
        for page in missing {
            println!("  page {page} not found in HTML");
        }
    }
    if show_duplicates {
        for (snippet, count) in &report.duplicates {
            println!("  {count}x {snippet:?}");
        }
    }
    Ok(())
}
