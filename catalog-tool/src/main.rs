use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::info;

use traveler_common::{compact, from_tz_database, map_catalog, CanonicalTimezone, RawTimezoneEntry, TimezoneRecord};

const DEFAULT_OUTPUT: &str = "timezones.canonical.json";

#[derive(Debug, PartialEq)]
enum Source {
    Export(PathBuf),
    TzDatabase,
}

#[derive(Debug, Parser)]
#[command(name = "traveler-catalog-tool")]
#[command(about = "Build the canonical timezone dataset served to the configurator")]
struct Args {
    /// Generate the dataset from the bundled IANA database
    #[arg(long, conflicts_with = "export")]
    tzdb: bool,

    /// Raw timezone export to compact
    #[arg(required_unless_present = "tzdb")]
    export: Option<PathBuf>,

    /// Output path for the canonical dataset
    #[arg(long, short, default_value = DEFAULT_OUTPUT)]
    out: PathBuf,
}

impl Args {
    fn source(&self) -> Source {
        match &self.export {
            Some(path) if !self.tzdb => Source::Export(path.clone()),
            _ => Source::TzDatabase,
        }
    }
}

fn read_export(path: &Path) -> anyhow::Result<Vec<RawTimezoneEntry>> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("invalid timezone export {}", path.display()))
}

fn build(source: &Source) -> anyhow::Result<Vec<CanonicalTimezone>> {
    match source {
        Source::Export(path) => Ok(compact(&read_export(path)?)),
        Source::TzDatabase => Ok(from_tz_database(Utc::now())),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let dataset = build(&args.source())?;
    let records: Vec<TimezoneRecord> = dataset.iter().map(TimezoneRecord::from).collect();
    let presentable = map_catalog(&records).len();

    let payload = serde_json::to_vec_pretty(&dataset).context("failed to serialize dataset")?;
    std::fs::write(&args.out, payload)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    info!(
        "wrote {} entries={} presentable={}",
        args.out.display(),
        dataset.len(),
        presentable
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_tzdb_source_with_default_output() {
        let args = Args::try_parse_from(["traveler-catalog-tool", "--tzdb"]).unwrap();
        assert_eq!(args.source(), Source::TzDatabase);
        assert_eq!(args.out, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn parses_export_source_and_output() {
        let args =
            Args::try_parse_from(["traveler-catalog-tool", "timezones.json", "--out", "out.json"])
                .unwrap();
        assert_eq!(args.source(), Source::Export(PathBuf::from("timezones.json")));
        assert_eq!(args.out, PathBuf::from("out.json"));
    }

    #[test]
    fn rejects_missing_conflicting_or_extra_arguments() {
        assert!(Args::try_parse_from(["traveler-catalog-tool"]).is_err());
        assert!(Args::try_parse_from(["traveler-catalog-tool", "--tzdb", "a.json"]).is_err());
        assert!(Args::try_parse_from(["traveler-catalog-tool", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn builds_from_export_file() {
        let path = std::env::temp_dir().join(format!("traveler-export-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[
                {"identifier": "Europe/Paris", "abbreviation_sdt": "CET", "offset_sdt": "+01:00", "offset_dst": "+02:00"},
                {"identifier": "Europe/Paris", "offset_sdt": "+09:00"},
                {"identifier": "", "offset_sdt": "+03:00"}
            ]"#,
        )
        .unwrap();

        let dataset = build(&Source::Export(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset[0].identifier, "Europe/Paris");
        assert_eq!(dataset[0].abbr, "CET");
        assert_eq!(dataset[0].offset_minutes, 60);
    }
}
