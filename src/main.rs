use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use alto_vision::config::AppConfig;
use alto_vision::escriptorium::EscriptoriumClient;
use alto_vision::ocr::{VisionClient, VisionResponse};
use alto_vision::pipeline::{
    merge_vision_alto, process_page, run_document, transcribe_image, DocumentJob, PageOutput,
};

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "tif", "tiff", "bmp", "webp"];

#[derive(Parser, Debug)]
#[command(name = "alto-vision")]
#[command(version, about = "Cloud OCR for pre-segmented ALTO layouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: $ALTO_VISION_CONFIG or ./config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Google Vision API key
    #[arg(long, env = "VISION_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// OCR language hint
    #[arg(short, long, global = true)]
    language: Option<String>,

    /// Disable progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create ALTO files from images that have no segmentation
    Transcribe {
        /// Image file or directory of images
        input: PathBuf,

        /// Output directory (default: next to each image)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Place OCR text into the lines of an existing ALTO file
    Merge {
        /// Segmented ALTO file
        alto: PathBuf,

        /// Page image the layout was segmented on
        #[arg(required_unless_present = "response")]
        image: Option<PathBuf>,

        /// Saved Vision JSON response to use instead of calling the service
        #[arg(long, conflicts_with = "image")]
        response: Option<PathBuf>,

        /// Output file (default: <alto stem>.vision.xml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Process every page of an eScriptorium document
    Document {
        /// Document primary key
        document: u64,

        /// Directory of exported ALTO files, one <image stem>.xml per page
        #[arg(long)]
        alto_dir: PathBuf,

        /// Output directory for merged ALTO files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Transcription to import into (default from config)
        #[arg(short, long, requires = "upload")]
        transcription: Option<String>,

        /// Upload merged files back to eScriptorium
        #[arg(long)]
        upload: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::discover(cli.config.as_deref())?;
    if cli.api_key.is_some() {
        config.vision.api_key = cli.api_key.clone();
    }
    if let Some(language) = &cli.language {
        config.vision.language = language.clone();
    }
    init_logging(&config.logging.level);

    match cli.command {
        Commands::Transcribe { input, output } => transcribe(&config, input, output, cli.quiet),
        Commands::Merge {
            alto,
            image,
            response,
            output,
        } => merge(&config, alto, image, response, output, cli.quiet),
        Commands::Document {
            document,
            alto_dir,
            output,
            transcription,
            upload,
        } => {
            let transcription = upload.then(|| {
                transcription.unwrap_or_else(|| config.escriptorium.transcription.clone())
            });
            let job = DocumentJob {
                document,
                alto_dir,
                output_dir: output.unwrap_or_else(|| PathBuf::from(format!("document_{document}"))),
                language: config.vision.language.clone(),
                transcription,
            };
            document_run(&config, &job, cli.quiet)
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn transcribe(config: &AppConfig, input: PathBuf, output: Option<PathBuf>, quiet: bool) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Path does not exist: {}", input.display());
    }

    let images = if input.is_dir() {
        list_images(&input)?
    } else {
        vec![input.clone()]
    };
    if images.is_empty() {
        anyhow::bail!("No images found in {}", input.display());
    }

    let client = VisionClient::from_config(&config.vision)?;
    if let Some(dir) = &output {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut success = 0;
    let mut failed = 0;
    for (i, image) in images.iter().enumerate() {
        if !quiet {
            println!("[{}/{}] Transcribing: {}", i + 1, images.len(), image.display());
        }
        let target = alto_path_for(image, output.as_deref());
        let result = transcribe_image(&client, &config.vision.language, image)
            .and_then(|xml| {
                fs::write(&target, xml).with_context(|| format!("failed to write {}", target.display()))
            });
        match result {
            Ok(()) => {
                if !quiet {
                    println!("  [✓] {}", target.display());
                }
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {e:#}");
                failed += 1;
            }
        }
    }

    finish(success, failed, quiet)
}

fn merge(
    config: &AppConfig,
    alto: PathBuf,
    image: Option<PathBuf>,
    response: Option<PathBuf>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let alto_xml = fs::read_to_string(&alto)
        .with_context(|| format!("failed to read layout {}", alto.display()))?;

    let merged: PageOutput = match (response, image) {
        (Some(path), _) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let response = VisionResponse::from_json(&json)
                .with_context(|| format!("failed to parse Vision response {}", path.display()))?;
            merge_vision_alto(&response, &alto_xml)?
        }
        (None, None) => anyhow::bail!("merge needs a page image or --response"),
        (None, Some(image)) => {
            let client = VisionClient::from_config(&config.vision)?;
            let bytes = fs::read(&image)
                .with_context(|| format!("failed to read image {}", image.display()))?;
            process_page(&client, &config.vision.language, bytes, &alto_xml)?
        }
    };

    let target = output.unwrap_or_else(|| alto.with_extension("vision.xml"));
    fs::write(&target, &merged.alto)
        .with_context(|| format!("failed to write {}", target.display()))?;

    if !quiet {
        println!(
            "[✓] {} lines, {} words placed, {} outside any line -> {}",
            merged.summary.lines,
            merged.summary.assigned_words,
            merged.summary.orphan_words,
            target.display()
        );
    }
    Ok(())
}

fn document_run(config: &AppConfig, job: &DocumentJob, quiet: bool) -> Result<()> {
    let host = EscriptoriumClient::from_config(&config.escriptorium)?;
    let ocr = VisionClient::from_config(&config.vision)?;

    if !quiet {
        println!("[*] Document: {}", job.document);
        println!("[*] Output: {}", job.output_dir.display());
    }

    let report = run_document(&host, &ocr, job)?;

    if !quiet {
        for page in &report.pages {
            match &page.result {
                Ok(summary) => println!(
                    "  [✓] {}: {} words in {} lines",
                    page.part, summary.assigned_words, summary.filled_lines
                ),
                Err(e) => println!("  [✗] {}: {e}", page.part),
            }
        }
    }

    finish(report.succeeded(), report.failed(), quiet)
}

fn finish(success: usize, failed: usize, quiet: bool) -> Result<()> {
    if !quiet {
        println!("\n[*] Summary: {success} succeeded, {failed} failed");
    }
    if failed > 0 {
        anyhow::bail!("{failed} page(s) failed to process");
    }
    Ok(())
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn alto_path_for(image: &Path, output: Option<&Path>) -> PathBuf {
    let file_name = image.with_extension("xml");
    match (output, file_name.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => file_name,
    }
}
