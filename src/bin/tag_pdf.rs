//! Tag an existing PDF from a classified-elements file
//!
//! Builds the structure tree, links it to page content and writes the tagged
//! document. Linkage failures are reported but do not change the exit code.
//!
//! Usage:
//!   tag_pdf <input.pdf> <elements.json> <output.pdf> [options]
//!
//! Exit codes: 0 success, 1 unrecoverable failure, 2 usage error.

use pdf_tagger::config::{LinkStrategy, McidScope, TaggingConfig};
use pdf_tagger::elements::load_elements;
use pdf_tagger::host::LopdfDocument;
use pdf_tagger::{Tagger, TaggingReport};
use std::fs;
use std::path::PathBuf;
use std::process;

const USAGE: &str = "\
Usage: tag_pdf <input.pdf> <elements.json> <output.pdf> [options]

Options:
  --config <file>          Load tagging options from a JSON file
  --report <file>          Write the tagging report as JSON
  --per-document-mcids     Number marked content across the whole document
  --sections               Group content under heading-driven Sect elements
  --strategy <name>        Content linkage: text (default), blocks or none
  --artifacts              Wrap unclaimed page content as /Artifact
  --lang <tag>             Document language (catalog /Lang)
  --dump                   Print the structure tree
  -v, --verbose            Debug logging";

struct CliArgs {
    input: PathBuf,
    elements: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    report: Option<PathBuf>,
    per_document_mcids: bool,
    sections: bool,
    strategy: Option<LinkStrategy>,
    artifacts: bool,
    lang: Option<String>,
    dump: bool,
    verbose: bool,
}

impl CliArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut config = None;
        let mut report = None;
        let mut per_document_mcids = false;
        let mut sections = false;
        let mut strategy = None;
        let mut artifacts = false;
        let mut lang = None;
        let mut dump = false;
        let mut verbose = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("{} needs a value", flag))
            };
            match arg.as_str() {
                "--config" => config = Some(PathBuf::from(value("--config")?)),
                "--report" => report = Some(PathBuf::from(value("--report")?)),
                "--per-document-mcids" => per_document_mcids = true,
                "--sections" => sections = true,
                "--strategy" => {
                    let name = value("--strategy")?;
                    strategy = Some(
                        LinkStrategy::from_cli(&name)
                            .ok_or_else(|| format!("unknown strategy '{}'", name))?,
                    );
                },
                "--artifacts" => artifacts = true,
                "--lang" => lang = Some(value("--lang")?),
                "--dump" => dump = true,
                "--verbose" | "-v" => verbose = true,
                flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
                _ => positional.push(PathBuf::from(arg)),
            }
        }

        let [input, elements, output]: [PathBuf; 3] = positional
            .try_into()
            .map_err(|_| "expected <input.pdf> <elements.json> <output.pdf>".to_string())?;

        Ok(Self {
            input,
            elements,
            output,
            config,
            report,
            per_document_mcids,
            sections,
            strategy,
            artifacts,
            lang,
            dump,
            verbose,
        })
    }

    /// Options file first, then flags on top.
    fn tagging_config(&self) -> pdf_tagger::Result<TaggingConfig> {
        let mut config = match self.config {
            Some(ref path) => TaggingConfig::from_path(path)?,
            None => TaggingConfig::default(),
        };
        if self.per_document_mcids {
            config = config.with_mcid_scope(McidScope::Document);
        }
        if self.sections {
            config = config.with_sections(true);
        }
        if let Some(strategy) = self.strategy {
            config = config.with_link_strategy(strategy);
        }
        if self.artifacts {
            config = config.with_artifacts(true);
        }
        if let Some(ref lang) = self.lang {
            config = config.with_language(lang.clone());
        }
        Ok(config)
    }
}

fn run(args: &CliArgs) -> pdf_tagger::Result<TaggingReport> {
    let config = args.tagging_config()?;
    let elements = load_elements(&args.elements)?;
    let mut doc = LopdfDocument::load(&args.input)?;

    let outcome = Tagger::new(config).tag(&mut doc, &elements)?;
    if args.dump {
        print!("{}", outcome.tree.dump(Some(&outcome.mcids)));
    }
    doc.save(&args.output)?;

    if let Some(ref path) = args.report {
        fs::write(path, outcome.report.to_json()?)?;
    }
    Ok(outcome.report)
}

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return;
    }
    let args = match CliArgs::parse(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            process::exit(2);
        },
    };

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&args) {
        Ok(report) => {
            println!("Tagged {} -> {}", args.input.display(), args.output.display());
            println!("{}", report.summary());
            for diagnostic in report.diagnostics.iter().filter(|d| !d.code.is_informational()) {
                println!("  {}", diagnostic);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_positional_and_flags() {
        let cli = CliArgs::parse(&args(&[
            "in.pdf",
            "tags.json",
            "out.pdf",
            "--strategy",
            "blocks",
            "--per-document-mcids",
            "--lang",
            "de",
        ]))
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("out.pdf"));
        assert_eq!(cli.strategy, Some(LinkStrategy::TextBlocks));

        let config = cli.tagging_config().unwrap();
        assert_eq!(config.mcid_scope, McidScope::Document);
        assert_eq!(config.document_language.as_deref(), Some("de"));
    }

    #[test]
    fn test_usage_errors() {
        assert!(CliArgs::parse(&args(&["in.pdf", "tags.json"])).is_err());
        assert!(CliArgs::parse(&args(&["a", "b", "c", "--strategy"])).is_err());
        assert!(CliArgs::parse(&args(&["a", "b", "c", "--strategy", "bbox"])).is_err());
        assert!(CliArgs::parse(&args(&["a", "b", "c", "--bogus"])).is_err());
    }
}
