use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::PreviewArgs,
    config::ScrubConfig,
    io_utils,
    process::{self, OutputSink, Scrubber},
    schema, table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let config = ScrubConfig::from_args(&args.pipeline)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let reader = io_utils::open_csv_reader_from_path(&args.input, delimiter)?;

    let mut header = Vec::new();
    let mut rows = Vec::new();
    if args.rows > 0 {
        let mut scrubber = Scrubber::new(config);
        process::drive(
            &mut scrubber,
            reader,
            encoding,
            args.lossy_input,
            &mut OutputSink::Table {
                header: &mut header,
                rows: &mut rows,
                limit: args.rows,
            },
        )?;
    }

    let (header, rows) = select_columns(header, rows, &args.columns)?;
    table::print_table(&header, &rows);
    info!("Displayed {} scrubbed row(s) from {:?}", rows.len(), args.input);
    Ok(())
}

fn select_columns(
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: &[String],
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let columns = columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();
    if columns.is_empty() || header.is_empty() {
        return Ok((header, rows));
    }
    let positions = schema::column_positions(&header, &columns)
        .context("Selecting preview columns")?;
    let pick = |row: &[String]| {
        positions
            .iter()
            .map(|&idx| row.get(idx).cloned().unwrap_or_default())
            .collect::<Vec<_>>()
    };
    let selected_rows = rows.iter().map(|row| pick(row.as_slice())).collect();
    Ok((pick(header.as_slice()), selected_rows))
}
