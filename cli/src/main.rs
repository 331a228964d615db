//! sheetquiz CLI - worksheet PDF to quiz JSON

mod classifier;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use sheetquiz::pipeline::{read_prompt_template, DEFAULT_BASE_URL, DEFAULT_MODEL};
use sheetquiz::render::{self, JsonFormat};
use sheetquiz::{
    assemble_quiz, build_prompt, flatten, load_classifications, load_index, ClassifierCredentials,
    ExtractOptions, PageSelection, PairingOptions, PairingStrategy, PdfExtractor, Pipeline,
    PipelineConfig,
};

use classifier::ChatClassifier;

#[derive(Parser)]
#[command(name = "sheetquiz")]
#[command(version)]
#[command(about = "Turn worksheet PDFs into quiz JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text blocks and images (index, transcript, image files)
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Print the per-page text lists of an extraction index
    Flatten {
        /// extracted_results.json from a previous extraction
        #[arg(value_name = "INDEX")]
        index: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the classification request for an extraction index
    Prompt {
        /// extracted_results.json from a previous extraction
        #[arg(value_name = "INDEX")]
        index: PathBuf,

        #[command(flatten)]
        prompt: PromptArgs,
    },

    /// Assemble a quiz from an index and a saved classifier response
    Assemble {
        /// extracted_results.json from a previous extraction
        #[arg(value_name = "INDEX")]
        index: PathBuf,

        /// Classifier response (raw reply or llm_response.json)
        #[arg(value_name = "RESPONSE")]
        response: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        pairing: PairingArgs,
    },

    /// Run the whole pipeline against the classification service
    Run {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        prompt: PromptArgs,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        pairing: PairingArgs,

        /// API key for the classification service
        #[arg(long, env = "SHEETQUIZ_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Base URL of the chat-completions endpoint
        #[arg(long, env = "SHEETQUIZ_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Model name
        #[arg(long, env = "SHEETQUIZ_MODEL", default_value = DEFAULT_MODEL)]
        model: String,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct ExtractArgs {
    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Fail on the first corrupt image or content stream
    #[arg(long)]
    strict: bool,

    /// Process pages in parallel
    #[arg(long)]
    parallel: bool,

    /// Skip writing extracted_text.txt
    #[arg(long)]
    no_transcript: bool,
}

impl ExtractArgs {
    fn to_options(&self) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
        let pages = match &self.pages {
            Some(p) => PageSelection::parse(p)?,
            None => PageSelection::All,
        };

        let mut options = ExtractOptions::new()
            .with_pages(pages)
            .with_parallel(self.parallel)
            .with_transcript(!self.no_transcript);
        if self.strict {
            options = options.strict();
        }
        Ok(options)
    }
}

#[derive(Args)]
struct PromptArgs {
    /// Prompt template file
    #[arg(long = "prompt", value_name = "FILE")]
    prompt_file: PathBuf,

    /// Task description appended to the prompt
    #[arg(long, default_value = "")]
    task: String,
}

#[derive(Args)]
struct PairingArgs {
    /// Maximum gap between an image and its label
    #[arg(long, default_value_t = sheetquiz::pairing::DEFAULT_THRESHOLD)]
    threshold: f32,

    /// Keep only the nearest image per label
    #[arg(long)]
    nearest: bool,
}

impl PairingArgs {
    fn to_options(&self) -> PairingOptions {
        let strategy = if self.nearest {
            PairingStrategy::Nearest
        } else {
            PairingStrategy::All
        };
        PairingOptions::new()
            .with_threshold(self.threshold)
            .with_strategy(strategy)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            extract,
        } => cmd_extract(&input, output.as_deref(), &extract),
        Commands::Flatten { index, output } => cmd_flatten(&index, output.as_deref()),
        Commands::Prompt { index, prompt } => cmd_prompt(&index, &prompt),
        Commands::Assemble {
            index,
            response,
            output,
            pairing,
        } => cmd_assemble(&index, &response, output.as_deref(), &pairing),
        Commands::Run {
            input,
            output,
            prompt,
            extract,
            pairing,
            api_key,
            base_url,
            model,
        } => {
            let credentials = ClassifierCredentials::new(api_key)
                .with_base_url(base_url)
                .with_model(model);
            cmd_run(&input, output.as_deref(), &prompt, &extract, &pairing, credentials)
        }
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

fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    PathBuf::from(format!("{}_output", stem))
}

/// Write to a file, or print to stdout.
fn emit(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    args: &ExtractArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| default_output_dir(input));

    let extractor = PdfExtractor::open_with_options(input, args.to_options()?)?;
    println!("{} {}", "Extracting".cyan(), input.display());
    println!("{}: {}", "Pages".bold(), extractor.page_count());

    let doc = extractor.extract_to(&output_dir)?;

    println!("\n{}", "=== EXTRACTION SUMMARY ===".cyan().bold());
    for page in &doc.pages {
        println!(
            "Page {}: {} images, {} text blocks",
            page.number,
            page.images.len(),
            page.text_blocks.len()
        );
    }
    println!(
        "\n{} {} images, {} text blocks extracted",
        "TOTAL:".green().bold(),
        doc.image_count(),
        doc.text_block_count()
    );

    println!("\n{}", "Output files:".green().bold());
    println!("  {} {}", "├─".dimmed(), render::INDEX_FILE);
    if args.no_transcript {
        println!("  {} page_N_img_M.*", "└─".dimmed());
    } else {
        println!("  {} {}", "├─".dimmed(), render::TRANSCRIPT_FILE);
        println!("  {} page_N_img_M.*", "└─".dimmed());
    }

    Ok(())
}

fn cmd_flatten(index: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let index = load_index(index)?;
    let pages = flatten(&index);
    let json = render::to_json(&pages, JsonFormat::Pretty)?;
    emit(&json, output)
}

fn cmd_prompt(index: &Path, args: &PromptArgs) -> Result<(), Box<dyn std::error::Error>> {
    let template = read_prompt_template(&args.prompt_file)?;
    let index = load_index(index)?;
    let prompt = build_prompt(&template, &args.task, &flatten(&index))?;
    println!("{}", prompt);
    Ok(())
}

fn cmd_assemble(
    index: &Path,
    response: &Path,
    output: Option<&Path>,
    pairing: &PairingArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = load_index(index)?;
    let classifications = load_classifications(response)?;
    let quiz = assemble_quiz(&index, &classifications, &pairing.to_options());

    let json = render::to_json(&quiz, JsonFormat::Pretty)?;
    emit(&json, output)
}

fn cmd_run(
    input: &Path,
    output: Option<&Path>,
    prompt: &PromptArgs,
    extract: &ExtractArgs,
    pairing: &PairingArgs,
    credentials: ClassifierCredentials,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| default_output_dir(input));
    let template = read_prompt_template(&prompt.prompt_file)?;

    let config = PipelineConfig::new(input, &output_dir, template, credentials)
        .with_task(prompt.task.clone())
        .with_extract_options(extract.to_options()?)
        .with_pairing_options(pairing.to_options());
    config.validate()?;

    let classifier = ChatClassifier::from_config(&config)?;
    let pipeline = Pipeline::new(config, classifier);

    let pb = ProgressBar::new(4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Extracting content...");
    let index = pipeline.extract()?;
    pb.inc(1);

    pb.set_message("Flattening text...");
    let pages = pipeline.flatten(&index)?;
    pb.inc(1);

    pb.set_message("Waiting for classification...");
    let classifications = pipeline.classify(&pages)?;
    pb.inc(1);

    pb.set_message("Assembling quiz...");
    let quiz = pipeline.assemble(&index, &classifications)?;
    pb.inc(1);

    pb.finish_with_message("Done!");

    println!(
        "\n{} {} quiz pages from {} classified pages",
        "Assembled".green().bold(),
        quiz.len(),
        classifications.len()
    );
    println!("\n{}", "Output files:".green().bold());
    for name in [
        render::INDEX_FILE,
        render::TRANSCRIPT_FILE,
        render::FLATTENED_FILE,
        render::RESPONSE_FILE,
    ] {
        println!("  {} {}", "├─".dimmed(), name);
    }
    println!("  {} {}", "└─".dimmed(), render::QUIZ_FILE);
    println!("{}", output_dir.display().to_string().dimmed());

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "sheetquiz".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Worksheet PDF to quiz tool");
    println!();
    println!("License: MIT");
}
