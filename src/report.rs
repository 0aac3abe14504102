//! Writers for enrichment records

use std::{
    fmt::Display,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::info;

use crate::{correction::CorrectionMethod, record::TermResult, run::Label};

const TEXT_HEADER: &str = "TermID     Stu Tot Stu/Tot   Pop   Tot Pop/Tot P-uncorr  ";
const DELIMITED_HEADER: [&str; 9] = [
    "TermID", "Stu", "Tot", "Stu/Tot", "Pop", "Tot", "Pop/Tot", "P-uncorr", "Dir",
];

/// Header of the fixed-width table, one column per method
pub(crate) fn text_header(methods: &[CorrectionMethod]) -> String {
    let columns = methods
        .iter()
        .map(|method| format!("{:8}", method.field_name()))
        .join(" ");
    format!("{TEXT_HEADER}{columns}")
}

pub(crate) fn text_row<I: Label, T: Label>(
    record: &TermResult<I, T>,
    methods: &[CorrectionMethod],
) -> String {
    let pval = record.pval();
    let corrected = methods
        .iter()
        .map(|method| match record.multitest().pvalue(*method) {
            Some(p) => format!("{p:8.2e}"),
            None => format!("{:8}", "."),
        })
        .join(" ");
    format!(
        "{:10} {:>3} {:>3} {:>7.3} {:>5} {:>5} {:>7.3} {:8.2e}  {}",
        record.term().to_string(),
        pval.study_count,
        pval.study_total,
        pval.study_ratio(),
        pval.pop_count,
        pval.pop_total,
        pval.pop_ratio(),
        pval.pvalue,
        corrected
    )
}

/// Writes records as a fixed-width text table
pub fn write_text<W: Write, I: Label, T: Label>(
    mut writer: W,
    records: &[&TermResult<I, T>],
    methods: &[CorrectionMethod],
) -> Result<()> {
    writeln!(writer, "{}", text_header(methods))?;
    for record in records {
        writeln!(writer, "{}", text_row(record, methods))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes records as delimited text, e.g. `b','` for CSV or `b'\t'` for TSV
///
/// Columns are the term counts and ratios, the uncorrected p-value and direction,
/// one corrected p-value per method and the study identifiers joined by `;`.
pub fn write_delimited<W: Write, I: Label, T: Label>(
    writer: W,
    records: &[&TermResult<I, T>],
    methods: &[CorrectionMethod],
    delimiter: u8,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let header = DELIMITED_HEADER
        .iter()
        .map(|column| column.to_string())
        .chain(methods.iter().map(CorrectionMethod::field_name))
        .chain(std::iter::once("StudyItems".to_string()));
    writer.write_record(header)?;

    for record in records {
        let pval = record.pval();
        let row = [
            record.term().to_string(),
            pval.study_count.to_string(),
            pval.study_total.to_string(),
            format!("{:.3}", pval.study_ratio()),
            pval.pop_count.to_string(),
            pval.pop_total.to_string(),
            format!("{:.3}", pval.pop_ratio()),
            format!("{:.6e}", pval.pvalue),
            pval.direction.to_string(),
        ]
        .into_iter()
        .chain(methods.iter().map(|method| {
            record
                .multitest()
                .pvalue(*method)
                .map(|p| format!("{p:.6e}"))
                .unwrap_or_default()
        }))
        .chain(std::iter::once(record.study_items().iter().join(";")));
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes delimited records to `path`
pub fn write_delimited_file<P: AsRef<Path>, I: Label, T: Label>(
    path: P,
    records: &[&TermResult<I, T>],
    methods: &[CorrectionMethod],
    delimiter: u8,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_delimited(BufWriter::new(file), records, methods, delimiter)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("{:>6} terms written to {}", records.len(), path.display());
    Ok(())
}

/// Writes one identifier per line to `path`
pub fn write_ids<P, D>(path: P, ids: &[D]) -> Result<()>
where
    P: AsRef<Path>,
    D: Display,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for id in ids {
        writeln!(writer, "{id}")?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("{:>6} IDs written to {}", ids.len(), path.display());
    Ok(())
}
