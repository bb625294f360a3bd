//! slotgraph - build and inspect slotted-page graph databases

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser as ClapParser, Subcommand};
use log::info;
use slotgraph::database::PageDatabase;
use slotgraph::generator::{
    build_page_database, GeneratorConfig, TextEdgeReader, TextVertexReader, VertexSource,
};
use slotgraph::storage::page::{PageId, PageSchema, SlottedPage};
use std::path::PathBuf;

/// slotgraph - an out-of-core graph store laid out in slotted pages
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a page database from a sorted text edge list
    Generate(GenerateArgs),
    /// Print the RID table and the pages of a page database
    Inspect(InspectArgs),
}

#[derive(ClapArgs, Debug)]
struct GenerateArgs {
    /// Edge list, one `src dst [payload]` per line, sorted by source
    #[arg(short, long)]
    edges: PathBuf,

    /// Vertex payloads, one `vid payload` per line, sorted by id
    #[arg(long)]
    vertices: Option<PathBuf>,

    /// Payload of vertices missing from --vertices
    #[arg(long, default_value = "0")]
    default_vertex_payload: u64,

    /// Output prefix; writes PREFIX.pages, PREFIX.rid and PREFIX.info
    #[arg(short, long)]
    out: PathBuf,

    /// Pages buffered before each write
    #[arg(long, default_value = "64")]
    bundle_pages: usize,

    #[command(flatten)]
    schema: SchemaArgs,
}

#[derive(ClapArgs, Debug)]
struct SchemaArgs {
    /// Page size in bytes
    #[arg(long, default_value = "65536")]
    page_size: usize,

    #[arg(long, default_value = "4")]
    vertex_id_width: usize,

    #[arg(long, default_value = "4")]
    page_id_width: usize,

    #[arg(long, default_value = "2")]
    slot_offset_width: usize,

    #[arg(long, default_value = "4")]
    record_offset_width: usize,

    #[arg(long, default_value = "4")]
    record_size_width: usize,

    /// Width of the footer's front and rear cursors
    #[arg(long, default_value = "4")]
    offset_width: usize,

    /// Store a payload of this width with every edge
    #[arg(long)]
    edge_payload_width: Option<usize>,

    /// Store a payload of this width with every vertex
    #[arg(long)]
    vertex_payload_width: Option<usize>,
}

impl SchemaArgs {
    fn to_schema(&self) -> PageSchema {
        PageSchema::default()
            .with_page_size(self.page_size)
            .with_vertex_id_width(self.vertex_id_width)
            .with_page_id_width(self.page_id_width)
            .with_slot_offset_width(self.slot_offset_width)
            .with_record_offset_width(self.record_offset_width)
            .with_record_size_width(self.record_size_width)
            .with_offset_width(self.offset_width)
            .with_edge_payload_width(self.edge_payload_width)
            .with_vertex_payload_width(self.vertex_payload_width)
    }
}

#[derive(ClapArgs, Debug)]
struct InspectArgs {
    /// Prefix the database was generated with
    #[arg(long)]
    db: PathBuf,

    /// Only print this page
    #[arg(short, long)]
    page: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Generate(generate_args) => generate(generate_args),
        Command::Inspect(inspect_args) => inspect(inspect_args),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let schema = args.schema.to_schema();
    schema.validate().context("Invalid page schema")?;
    let config = GeneratorConfig::default()
        .with_schema(schema)
        .with_bundle_pages(args.bundle_pages)
        .with_default_vertex_payload(args.default_vertex_payload);

    let mut vertex_reader = match &args.vertices {
        Some(path) => Some(
            TextVertexReader::open(path)
                .with_context(|| format!("Failed to open vertex list {:?}", path))?,
        ),
        None => None,
    };
    let vertices = vertex_reader
        .as_mut()
        .map(|reader| reader as &mut dyn VertexSource);

    info!("Generating page database {:?} from {:?}", args.out, args.edges);
    let summary = build_page_database(
        &config,
        || TextEdgeReader::open(&args.edges),
        vertices,
        &args.out,
    )
    .with_context(|| format!("Failed to generate page database from {:?}", args.edges))?;

    println!("pages:      {}", summary.num_pages);
    println!("  small:    {}", summary.small_pages);
    println!("  head:     {}", summary.head_pages);
    println!("  extension: {}", summary.extension_pages);
    println!("vertices:   {}", summary.num_vertices);
    println!("edges:      {}", summary.num_edges);
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let mut db = PageDatabase::open(&args.db)
        .with_context(|| format!("Failed to open page database {:?}", args.db))?;

    let info = db.info().clone();
    println!(
        "database {} ({} pages, {} vertices, {} edges)",
        info.name, info.num_pages, info.vertex_count, info.num_edges
    );
    println!("{:?}", info.schema);

    match args.page {
        Some(page_id) => {
            let page = db.page(PageId(page_id))?;
            print_page(&db, PageId(page_id), &page)?;
        }
        None => {
            println!("RID table:");
            for (page_id, tuple) in db.rid_table().tuples().iter().enumerate() {
                println!(
                    "  page {:>6}: start vid {} payload {}",
                    page_id, tuple.start_vid, tuple.payload
                );
            }
            for (page_id, page) in db.pages(64)?.iter().enumerate() {
                print_page(&db, PageId(page_id as u64), page)?;
            }
        }
    }
    Ok(())
}

fn print_page(db: &PageDatabase, page_id: PageId, page: &SlottedPage) -> Result<()> {
    let kind = page
        .kind()
        .map_or_else(|| format!("flags {:#x}", page.flags()), |k| k.to_string());
    println!(
        "page {} [{}] slots {} front {} rear {}",
        page_id,
        kind,
        page.number_of_slots(),
        page.front(),
        page.rear()
    );
    for index in 0..page.number_of_slots() {
        let slot = page.slot(index)?;
        let list = page.list(index)?;
        let neighbors: Vec<String> = list
            .iter()
            .map(|e| match db.rid_table().vertex_at(e.page_id, e.slot_offset) {
                Some(vid) => vid.to_string(),
                None => format!("?{}:{}", e.page_id, e.slot_offset),
            })
            .collect();
        let payload = slot
            .vertex_payload
            .map(|p| format!(" payload {}", p))
            .unwrap_or_default();
        println!(
            "  slot {:>4}: vertex {}{} record {} edges {}/{} -> [{}]",
            index,
            slot.vertex_id,
            payload,
            slot.record_offset,
            list.len(),
            page.record_len(index)?,
            neighbors.join(", ")
        );
    }
    Ok(())
}
