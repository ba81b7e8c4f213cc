use anyhow::{Error, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use oxigraph::model::{NamedNode, NamedOrBlankNode, Term, Triple};
use resultexport::encode::TermEncoder;
use resultexport::term::LiteralOrIri;
use resultexport::util::read_triples;
use resultexport::vocabulary::InMemoryVocabulary;
use resultexport::{
    BlankNodeManager, CancellationHandle, ExecutionContext, ExportConfig, ExportQuery, IdTable,
    MediaType, PageWindow, QueryForm, QueryResult, ResultBlock, SelectClause, StreamEnd,
    TemplateTriple, VariableToColumnMap, compute_result,
};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Columns of the result built from an input file, one row per triple.
const COLUMNS: [&str; 3] = ["?subject", "?predicate", "?object"];

#[derive(Debug, Parser)]
#[command(name = "rexport")]
#[command(about = "Export the triples of an RDF file as query results")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// JSON file with export settings; see `rexport config`
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Number of rows per result block, overrides the config file
    #[clap(long, global = true)]
    block_rows: Option<usize>,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// RDF file to read (turtle, ntriples, nquads, trig or rdf/xml by extension)
    input: PathBuf,
    /// Output format: csv, tsv, sparql-xml, sparql-json, octet-stream, turtle or
    /// qlever-json. Defaults to the extension of --output, then to the query form's default.
    #[clap(long, short = 'f')]
    format: Option<String>,
    /// Only use triples with this predicate IRI
    #[clap(long, short = 'p')]
    predicate: Option<String>,
    /// Number of rows to skip
    #[clap(long, default_value = "0")]
    offset: u64,
    /// Maximum number of rows in the result
    #[clap(long)]
    limit: Option<u64>,
    /// Maximum number of rows to write; the result size still counts up to --limit
    #[clap(long)]
    export_limit: Option<u64>,
    /// Abort the export after this many milliseconds
    #[clap(long)]
    timeout_ms: Option<u64>,
    /// Output file path; if omitted, writes to STDOUT
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Export rows of ?subject ?predicate ?object (also available as ?s ?p ?o)
    Select {
        #[command(flatten)]
        args: ExportArgs,
        /// Variables to select, comma separated
        #[clap(long, default_value = "?subject,?predicate,?object")]
        vars: String,
    },
    /// Instantiate a triple template for every row
    Construct {
        #[command(flatten)]
        args: ExportArgs,
        /// Template triples, e.g. `?o <http://ex.org/inverse> ?s`
        #[clap(long, short = 't')]
        template: String,
    },
    /// Report whether there is at least one row
    Ask {
        #[command(flatten)]
        args: ExportArgs,
    },
    /// Print the effective configuration as JSON, or save it to a file
    Config {
        /// File to write the configuration to
        #[clap(long)]
        save: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    resultexport::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    resultexport::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // RUST_LOG may already be set from REXPORT_LOG by `init_logging`; the flags win.
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let mut config = match &cmd.config {
        Some(path) => ExportConfig::from_file(path)?,
        None => ExportConfig::default(),
    };
    if let Some(rows) = cmd.block_rows {
        if rows == 0 {
            return Err(anyhow!("--block-rows must be positive"));
        }
        config.block_rows = rows;
    }
    if cmd.verbose || cmd.debug {
        config.print();
    }

    match cmd.command {
        Commands::Select { args, vars } => {
            let clause =
                SelectClause::new(vars.split(',').map(str::trim).filter(|v| !v.is_empty()));
            if clause.variables().is_empty() {
                return Err(anyhow!("--vars must name at least one variable"));
            }
            export(QueryForm::Select(clause), &args, &config, MediaType::Csv)
        }
        Commands::Construct { args, template } => {
            let templates = TemplateTriple::parse_all(&template)?;
            export(QueryForm::Construct(templates), &args, &config, MediaType::Turtle)
        }
        Commands::Ask { args } => export(QueryForm::Ask, &args, &config, MediaType::SparqlJson),
        Commands::Config { save } => {
            match save {
                Some(path) => {
                    config.save_to_file(&path)?;
                    println!("Saved configuration to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&config)?),
            }
            Ok(())
        }
    }
}

fn media_type(args: &ExportArgs, default: MediaType) -> Result<MediaType> {
    if let Some(format) = &args.format {
        return Ok(format.parse()?);
    }
    let from_output = args
        .output
        .as_ref()
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .and_then(MediaType::from_extension);
    Ok(from_output.unwrap_or(default))
}

/// Encoded rows of `triples` and everything needed to decode them again.
struct LoadedResult {
    vocabulary: Arc<InMemoryVocabulary>,
    result: QueryResult,
    // ids of the blank nodes in `result` stay reserved while this is alive
    _blank_nodes: resultexport::LocalBlankNodeManager,
}

fn load(triples: &[Triple], config: &ExportConfig) -> Result<LoadedResult> {
    let iris = triples.iter().flat_map(|t| {
        let mut iris = vec![t.predicate.clone()];
        if let NamedOrBlankNode::NamedNode(s) = &t.subject {
            iris.push(s.clone());
        }
        if let Term::NamedNode(o) = &t.object {
            iris.push(o.clone());
        }
        iris
    });
    let vocabulary = Arc::new(InMemoryVocabulary::from_terms(iris.map(LiteralOrIri::Iri)));
    let manager = Arc::new(BlankNodeManager::with_block_size(
        0,
        config.blank_node_block_size,
    ));
    let mut encoder = TermEncoder::new(manager).with_vocabulary(vocabulary.clone());

    let mut rows = Vec::with_capacity(triples.len());
    for t in triples {
        rows.push([
            encoder.encode_term(t.subject.as_ref().into())?,
            encoder.encode_term(t.predicate.as_ref().into())?,
            encoder.encode_term(t.object.as_ref())?,
        ]);
    }
    let (local_vocab, blank_nodes) = encoder.finish();
    debug!(
        "Encoded {} rows, {} vocabulary terms, {} local vocab entries",
        rows.len(),
        vocabulary.len(),
        local_vocab.len()
    );
    let local_vocab = Arc::new(local_vocab);
    let mut blocks = Vec::new();
    for chunk in rows.chunks(config.block_rows) {
        let table = IdTable::from_rows(COLUMNS.len(), chunk)?;
        blocks.push(Ok(Arc::new(ResultBlock::new(table, local_vocab.clone()))));
    }
    info!("Split {} rows into {} blocks", rows.len(), blocks.len());
    Ok(LoadedResult {
        vocabulary,
        result: QueryResult::lazy(blocks),
        _blank_nodes: blank_nodes,
    })
}

fn read_input(args: &ExportArgs) -> Result<Vec<Triple>> {
    let mut triples = read_triples(&args.input)?;
    if let Some(predicate) = &args.predicate {
        let predicate = NamedNode::new(predicate.trim_start_matches('<').trim_end_matches('>'))?;
        triples.retain(|t| t.predicate == predicate);
    }
    info!("Loaded {} triples from {}", triples.len(), args.input.display());
    Ok(triples)
}

fn export(
    form: QueryForm,
    args: &ExportArgs,
    config: &ExportConfig,
    default: MediaType,
) -> Result<()> {
    let media_type = media_type(args, default)?;
    let started = Instant::now();
    let triples = read_input(args)?;
    let loaded = load(&triples, config)?;

    let mut columns = VariableToColumnMap::new();
    for (i, name) in COLUMNS.iter().enumerate() {
        columns.insert(name, i);
        columns.insert(&name[..2], i);
    }
    let cancellation = match args.timeout_ms {
        Some(ms) => CancellationHandle::with_timeout(Duration::from_millis(ms)),
        None => CancellationHandle::new(),
    };
    let mut ctx = ExecutionContext::new(loaded.vocabulary.clone(), columns)
        .with_cancellation(cancellation)
        .with_request_started(started);
    ctx.compute_time = started.elapsed();

    let window = PageWindow::new(args.offset, args.limit, args.export_limit);
    let query = ExportQuery::new(form, window, describe(args));
    let stream = compute_result(&query, loaded.result, &ctx, media_type, config)?;
    let end = match &args.output {
        Some(path) => write_file(stream, path)?,
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            stream.write_to(&mut lock)?
        }
    };
    match end {
        StreamEnd::Complete { bytes } => {
            info!("Exported {} bytes as {}", bytes, media_type);
            Ok(())
        }
        StreamEnd::Failed { bytes, cancelled } => Err(anyhow!(
            "export {} after {} bytes",
            if cancelled { "was cancelled" } else { "failed" },
            bytes
        )),
    }
}

fn write_file(stream: resultexport::ExportStream, path: &Path) -> Result<StreamEnd> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    let end = stream.write_to(&mut file)?;
    file.flush()?;
    Ok(end)
}

/// Query text echoed by the JSON envelope.
fn describe(args: &ExportArgs) -> String {
    match &args.predicate {
        Some(p) => format!("{} (predicate {})", args.input.display(), p),
        None => args.input.display().to_string(),
    }
}
