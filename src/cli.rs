use clap::Parser;

use crate::logging::{LogFormat, LogLevel};
use sbom_enricher::application::factories::SourceKind;

/// Enrich CycloneDX and SPDX SBOMs with package, repository and vulnerability metadata
#[derive(Parser, Debug)]
#[command(name = "sbom-enricher")]
#[command(version)]
#[command(
    about = "Enrich CycloneDX and SPDX SBOMs with package, repository and vulnerability metadata",
    long_about = None
)]
pub struct Args {
    /// SBOM to enrich (CycloneDX or SPDX 2.x JSON); use '-' to read stdin
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Metadata source: ecosystems, deps, scorecard, osv or snyk.
    /// Can be specified multiple times; sources run in the given order
    #[arg(short, long = "source", value_name = "SOURCE", default_value = "ecosystems")]
    pub sources: Vec<SourceKind>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to a config file (defaults to ./sbom-enricher.config.yml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Number of lookups in flight at once (overrides the config file)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Stop dispatching lookups after this many seconds and write what was enriched so far
    #[arg(long, value_name = "SECONDS")]
    pub deadline_secs: Option<u64>,

    /// Diagnostic log level: error, warn, info, debug or trace (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    pub log_level: LogLevel,

    /// Diagnostic log format: text or json
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,
}

impl Args {
    /// Parses the command line, returning clap's error instead of exiting
    /// so the caller controls the exit code.
    pub fn try_parse_args() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    /// Sources with repeats removed, first occurrence wins.
    pub fn unique_sources(&self) -> Vec<SourceKind> {
        let mut sources = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            if !sources.contains(source) {
                sources.push(*source);
            }
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("sbom-enricher").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["bom.json"]).unwrap();
        assert_eq!(args.input, "bom.json");
        assert_eq!(args.sources, vec![SourceKind::Ecosystems]);
        assert!(args.output.is_none());
        assert!(args.config.is_none());
        assert!(args.concurrency.is_none());
        assert!(args.deadline_secs.is_none());
        assert_eq!(args.log_level, LogLevel::Warn);
        assert_eq!(args.log_format, LogFormat::Text);
    }

    #[test]
    fn test_repeated_sources_keep_order() {
        let args = parse(&["-s", "osv", "--source", "deps.dev", "-s", "scorecard", "-"]).unwrap();
        assert_eq!(
            args.sources,
            vec![SourceKind::Osv, SourceKind::Deps, SourceKind::Scorecard]
        );
        assert_eq!(args.input, "-");
    }

    #[test]
    fn test_unique_sources_drops_repeats() {
        let args = parse(&["-s", "osv", "-s", "deps", "-s", "osv", "bom.json"]).unwrap();
        assert_eq!(args.unique_sources(), vec![SourceKind::Osv, SourceKind::Deps]);
    }

    #[test]
    fn test_all_options() {
        let args = parse(&[
            "-o",
            "out.json",
            "-c",
            "cfg.yml",
            "--concurrency",
            "4",
            "--deadline-secs",
            "60",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "bom.json",
        ])
        .unwrap();
        assert_eq!(args.output.as_deref(), Some("out.json"));
        assert_eq!(args.config.as_deref(), Some("cfg.yml"));
        assert_eq!(args.concurrency, Some(4));
        assert_eq!(args.deadline_secs, Some(60));
        assert_eq!(args.log_level, LogLevel::Debug);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_source_rejected() {
        let error = parse(&["-s", "npm", "bom.json"]).unwrap_err();
        assert!(error.to_string().contains("Invalid source"));
    }

    #[test]
    fn test_missing_input_rejected() {
        assert!(parse(&[]).is_err());
    }
}
