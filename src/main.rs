use anyhow::{Context, bail};
use catalog::{Catalog, CatalogConfig, CompiledDocument};
use clap::{Parser, Subcommand};
use core_types::{DocumentId, Lang};
use directives::IdentityTranslator;
use inherit::{ResolverConfig, UnresolvedPolicy};
use mimalloc::MiMalloc;
use std::io::Write;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "archc")]
#[command(about = "Resolve view inheritance and compile directive templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load fragment files, bootstrap them and print the compiled output.
    Compile {
        /// Files holding `<view>`/`<template>` fragments, optionally wrapped in a container.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Language to compile; repeat for several. Defaults to en_US.
        #[arg(long = "lang")]
        langs: Vec<String>,

        /// Only print this document.
        #[arg(long)]
        id: Option<String>,

        /// Fail when an inherit_id never resolves.
        #[arg(long)]
        strict: bool,

        #[arg(long, default_value_t = inherit::DEFAULT_MAX_PASSES)]
        max_passes: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Compile {
            files,
            langs,
            id,
            strict,
            max_passes,
        } => {
            let config = CatalogConfig {
                resolver: ResolverConfig {
                    max_passes,
                    unresolved: if strict {
                        UnresolvedPolicy::Error
                    } else {
                        UnresolvedPolicy::Warn
                    },
                },
                languages: langs.iter().map(|lang| Lang::new(lang)).collect(),
                ..CatalogConfig::default()
            };
            let catalog = Catalog::new(config);

            for path in &files {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let tree = markup::parse(&source)
                    .with_context(|| format!("parsing {}", path.display()))?;
                let loaded = catalog.load_fragment(&tree)?;
                log::debug!("{}: {} fragment(s)", path.display(), loaded.len());
            }

            let report = catalog.bootstrap(&IdentityTranslator)?;
            for unresolved in &report.unresolved {
                eprintln!("warning: inherit_id `{}` never resolved", unresolved.target);
            }

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            match id {
                Some(id) => {
                    let Some(doc) = catalog.get_by_id(&DocumentId::new(&id)) else {
                        bail!("no document with id `{id}`");
                    };
                    print_document(&mut out, &doc, &report.languages, false)?;
                }
                None => {
                    for doc in catalog.documents() {
                        print_document(&mut out, &doc, &report.languages, true)?;
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_document(
    out: &mut impl Write,
    doc: &CompiledDocument,
    langs: &[Lang],
    with_header: bool,
) -> Result<()> {
    for lang in langs {
        let Some(bytes) = doc.output(lang) else {
            continue;
        };
        if with_header || langs.len() > 1 {
            writeln!(
                out,
                "{{# {} ({}, {}, {}) #}}",
                doc.id, doc.owner, doc.kind, lang
            )?;
        }
        out.write_all(bytes)?;
        writeln!(out)?;
    }
    Ok(())
}
