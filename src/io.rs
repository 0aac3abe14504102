//! Readers for identifier lists and association tables

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};
use tracing::info;

/// A set of identifiers read from a line-delimited list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdList {
    pub ids: HashSet<String>,
    /// Text of the first comment line, if the list has one
    pub name: Option<String>,
}

/// Parses an identifier list
///
/// Each line contributes its first whitespace-separated token. Lines starting
/// with `#` are comments and the first of them names the list.
pub fn parse_ids<R: BufRead>(reader: R) -> Result<IdList> {
    let mut list = IdList::default();
    for line in reader.lines() {
        let line = line.context("failed to read identifier line")?;
        if let Some(comment) = line.strip_prefix('#') {
            if list.name.is_none() {
                list.name = Some(comment.trim().to_string());
            }
            continue;
        }
        if let Some(id) = line.split_whitespace().next() {
            list.ids.insert(id.to_string());
        }
    }
    Ok(list)
}

pub fn read_ids<P: AsRef<Path>>(path: P) -> Result<IdList> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let list = parse_ids(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    match &list.name {
        Some(name) => info!("{:>6} IDs read from {} ({name})", list.ids.len(), path.display()),
        None => info!("{:>6} IDs read from {}", list.ids.len(), path.display()),
    }
    Ok(list)
}

/// Splits one association row into its identifier and term field
fn split_row(row: &str) -> Option<(&str, &str)> {
    let tokens = row.split_whitespace().collect::<Vec<_>>();
    match tokens.len() {
        2 => Some((tokens[0], tokens[1])),
        n if n > 2 && row.matches('\t').count() == 1 => row
            .split_once('\t')
            .map(|(id, terms)| (id.trim(), terms.trim())),
        _ => None,
    }
}

/// Parses an association table of `ID<ws>TERM;TERM;...` rows
///
/// Rows sharing an identifier are merged and empty terms are dropped. Comment
/// rows and rows of any other shape are skipped.
pub fn parse_associations<R: BufRead>(reader: R) -> Result<HashMap<String, HashSet<String>>> {
    let mut associations: HashMap<String, HashSet<String>> = HashMap::new();
    for row in reader.lines() {
        let row = row.context("failed to read association row")?;
        if row.starts_with('#') {
            continue;
        }
        let Some((id, terms)) = split_row(&row) else {
            continue;
        };
        associations.entry(id.to_string()).or_default().extend(
            terms
                .split(';')
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(String::from),
        );
    }
    Ok(associations)
}

pub fn read_associations<P: AsRef<Path>>(path: P) -> Result<HashMap<String, HashSet<String>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let associations = parse_associations(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        "{:>6} population IDs read from {}",
        associations.len(),
        path.display()
    );
    Ok(associations)
}
