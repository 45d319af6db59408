//! The `medtag tag` command: retrieve candidate topics and optionally
//! classify with an LLM.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use serde::Serialize;

use medtag_core::llm::ClassifierFactory;
use medtag_core::{input, CaptionResult, Config, TagResult, Tagger, TopicClassifier};

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Text to tag. Reads stdin when no text, --file, or --image is given
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Tag an image instead of text (implies classification)
    #[arg(long, conflicts_with_all = ["text", "file"])]
    pub image: Option<PathBuf>,

    /// Run LLM classification over the retrieved candidates
    #[arg(long)]
    pub classify: bool,

    /// LLM provider override ("gemini" or "openai")
    #[arg(long)]
    pub llm: Option<String>,

    /// Model name override for the selected provider
    #[arg(long)]
    pub model: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

/// JSON envelope for image tagging output.
#[derive(Serialize)]
struct ImageOutput<'a> {
    caption: &'a CaptionResult,
    #[serde(flatten)]
    tags: &'a TagResult,
}

/// Execute the tag command.
pub async fn execute(args: TagArgs, config: Config) -> anyhow::Result<()> {
    let tagger = Tagger::new(config.clone())
        .await
        .context("Failed to initialize the tagging pipeline")?;

    if let Some(image_path) = &args.image {
        let classifier = build_classifier(&args, &config)?;
        let image = input::prepare_image(image_path, config.limits.image_max_edge)?;

        let (caption, tags) = match tagger.tag_image(image, classifier.as_ref()).await {
            Ok(result) => result,
            Err(e) => return Err(with_guidance(e)),
        };

        match args.format {
            OutputFormat::Json => {
                let output = ImageOutput {
                    caption: &caption,
                    tags: &tags,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Caption: {}", caption.caption);
                if !caption.concepts.is_empty() {
                    println!("Depicts: {}", caption.concepts.join(", "));
                }
                println!();
                print_tag_result(&tags);
            }
        }
        return Ok(());
    }

    let text = read_text(&args)?;
    let classifier = if args.classify {
        Some(build_classifier(&args, &config)?)
    } else {
        None
    };

    let result = match tagger.tag_text(&text, classifier.as_deref()).await {
        Ok(result) => result,
        Err(e) => return Err(with_guidance(e)),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Table => print_tag_result(&result),
    }
    Ok(())
}

/// Gather the input text from the positional argument, a file, or stdin.
fn read_text(args: &TagArgs) -> anyhow::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Cannot read text from stdin")?;
    Ok(buffer)
}

fn build_classifier(
    args: &TagArgs,
    config: &Config,
) -> anyhow::Result<Box<dyn TopicClassifier>> {
    let provider = args.llm.as_deref().unwrap_or(&config.llm.provider);
    ClassifierFactory::create(provider, &config.llm, &config.limits, args.model.as_deref())
        .context("Failed to create the LLM classifier")
}

fn print_tag_result(result: &TagResult) {
    if let Some(model) = &result.model {
        if result.keywords.is_empty() {
            println!("Tags ({model}): none of the candidates apply");
        } else {
            println!("Tags ({model}): {}", result.keywords.join(", "));
        }
        println!();
    }

    println!("{:<5} {:>5}  {}", "RANK", "COUNT", "CANDIDATE");
    for (rank, concept) in result.retrieved.iter().enumerate() {
        println!("{:<5} {:>5}  {}", rank + 1, concept.count, concept.label);
    }
}

/// Attach retry/repair guidance to pipeline errors before they surface.
fn with_guidance(error: medtag_core::PipelineError) -> anyhow::Error {
    use medtag_core::PipelineError;

    let hint = if error.is_transient() {
        "This looks transient; running the command again may succeed."
    } else {
        match &error {
            PipelineError::InsufficientInput { .. } => {
                "Provide a longer text (roughly 15+ words)."
            }
            PipelineError::MalformedVocabulary { .. } => {
                "Fetch the taxonomy with `medtag taxonomy download`."
            }
            PipelineError::UnknownConcept { .. } => {
                "Delete the index file (`medtag config show` lists the data dir) and rerun."
            }
            _ => "",
        }
    };

    if hint.is_empty() {
        anyhow::Error::new(error)
    } else {
        anyhow::Error::new(error).context(hint.to_string())
    }
}
