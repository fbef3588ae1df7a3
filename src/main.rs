use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use survey_qa::catalog::TableCatalog;
use survey_qa::executor::PolarsSqlExecutor;
use survey_qa::llm::OpenAiClient;
use survey_qa::pipeline::QueryPipeline;
use survey_qa::prompt::PromptTemplate;
use survey_qa::resolver::{AmbiguousPolicy, TableResolver};
use survey_qa::session::{ChatSession, MessageContent};
use tracing::info;

const SUGGESTED_QUESTIONS: &[&str] = &[
    "Do different Hispanic/Latinx subgroups show varying levels of interest in switching?",
    "How does radio engagement (TSL) differ among Hispanic sub-identities?",
    "How do primary decision-makers and influencers compare across genders?",
    "Which demographic groups are more likely to be decision-makers?",
    "Is being a primary decision-maker correlated with being a weekly radio listener?",
];

#[derive(Clone, Copy, clap::ValueEnum)]
enum AmbiguousArg {
    /// Several substring matches fall through to fuzzy matching.
    FallThrough,
    /// Several substring matches fail with the list of matches.
    Fail,
}

#[derive(Parser)]
#[command(name = "survey-qa")]
#[command(about = "Ask natural-language questions about tabular survey data")]
struct Args {
    /// Directory of CSV tables, one table per file
    #[arg(short, long, default_value = "datasets")]
    data_dir: PathBuf,

    /// Directory holding table_selector.txt and code_generator.txt
    #[arg(short, long, default_value = "prompts")]
    prompts_dir: PathBuf,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Chat model name
    #[arg(long, default_value = "gpt-4")]
    model: String,

    /// What to do when several tables match the selector's answer
    #[arg(long, value_enum, default_value = "fall-through")]
    ambiguous: AmbiguousArg,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let args = Args::parse();

    let api_key = match args.api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok()) {
        Some(key) => key,
        None => bail!("OPENAI_API_KEY is not set; pass --api-key or export it"),
    };

    let catalog = TableCatalog::load_dir(&args.data_dir)
        .with_context(|| format!("loading tables from {}", args.data_dir.display()))?;
    info!("Loaded {} tables", catalog.len());

    let selector_template = PromptTemplate::load(&args.prompts_dir.join("table_selector.txt"))?;
    let codegen_template = PromptTemplate::load(&args.prompts_dir.join("code_generator.txt"))?;

    let policy = match args.ambiguous {
        AmbiguousArg::FallThrough => AmbiguousPolicy::FallThrough,
        AmbiguousArg::Fail => AmbiguousPolicy::Fail,
    };
    let pipeline = QueryPipeline::new(
        Arc::new(catalog),
        selector_template,
        codegen_template,
        Arc::new(OpenAiClient::new(api_key).with_model(args.model)),
        Arc::new(PolarsSqlExecutor),
    )
    .with_resolver(TableResolver::new(0.6, policy));

    println!("Suggested questions:");
    for question in SUGGESTED_QUESTIONS {
        println!("  - {}", question);
    }
    println!();

    let mut session = ChatSession::new();
    loop {
        print!("Ask a question about your data (empty line to quit): ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit") {
            break;
        }

        // One question is fully processed before the next is read.
        match pipeline.ask(&mut session, question).await {
            MessageContent::Tabular(frame) => println!("{}", frame),
            MessageContent::Text(text) => println!("Bot: {}", text),
            MessageContent::Error(message) => println!("Bot: {}", message),
        }
    }

    Ok(())
}
