//! Catalog summary tool.
//!
//! # Responsibility
//! - Open (or create) a catalog database through `biblio_core`.
//! - Print a deterministic plain-text summary for quick local checks.
//!
//! Usage: `biblio_cli [DB_PATH] [--recent N] [--log-dir DIR]`

use biblio_core::{
    AuditTrail, AuthorRepository, BookRepository, Catalog, CatalogConfig, CategoryRepository,
};
use log::info;
use std::process::ExitCode;

const DEFAULT_RECENT: usize = 10;

#[derive(Debug, Default)]
struct Args {
    db_path: Option<String>,
    recent: Option<usize>,
    log_dir: Option<String>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--recent" => {
                let value = raw.next().ok_or("--recent requires a value")?;
                let parsed = value
                    .parse()
                    .map_err(|_| format!("--recent expects a number, got `{value}`"))?;
                args.recent = Some(parsed);
            }
            "--log-dir" => {
                args.log_dir = Some(raw.next().ok_or("--log-dir requires a value")?);
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option `{flag}`")),
            _ if args.db_path.is_none() => args.db_path = Some(arg.clone()),
            _ => return Err(format!("unexpected argument `{arg}`")),
        }
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        biblio_core::init_logging(biblio_core::default_log_level(), log_dir)?;
    }

    let mut config = CatalogConfig::default().with_actor("biblio_cli");
    if let Some(path) = args.db_path.as_deref() {
        config = config.with_db_path(path);
    }
    let catalog = Catalog::open(&config)?;
    info!(
        "event=cli_summary module=cli status=start db={}",
        args.db_path.as_deref().unwrap_or(":memory:")
    );

    let categories = catalog.categories().list()?.snapshot()?;
    let roots = catalog.categories().list_roots()?.snapshot()?;
    let books = catalog.books().list()?.snapshot()?;
    let authors = catalog.authors().list()?.snapshot()?;
    let recent = catalog
        .audit()
        .recent(args.recent.unwrap_or(DEFAULT_RECENT))?
        .snapshot()?;

    println!("biblio_core version={}", biblio_core::core_version());
    println!("categories={}", categories.len());
    println!("books={}", books.len());
    println!("authors={}", authors.len());
    for root in &roots {
        println!("root {}", root.name);
    }
    for entry in &recent {
        println!(
            "audit #{} {} {} {} at={}",
            entry.id,
            entry.timestamp,
            entry.table.as_str(),
            entry.operation.as_str(),
            entry.record_id
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let outcome = parse_args(std::env::args().skip(1))
        .map_err(Into::into)
        .and_then(run);
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_path_and_options() {
        let parsed = parse_args(args(&["catalog.db", "--recent", "3"])).unwrap();
        assert_eq!(parsed.db_path.as_deref(), Some("catalog.db"));
        assert_eq!(parsed.recent, Some(3));
    }

    #[test]
    fn rejects_bad_recent_and_extra_arguments() {
        assert!(parse_args(args(&["--recent", "many"])).is_err());
        assert!(parse_args(args(&["a.db", "b.db"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
    }
}
