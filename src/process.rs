//! The single-pass scrubbing pipeline.
//!
//! [`Scrubber`] owns all run state: the header, the resolved column layout,
//! and the [`ScrubStats`] counters. It consumes the raw header once, then maps
//! every data row to zero or one output rows:
//!
//! 1. project away the configured columns
//! 2. keep only the configured study type
//! 3. split "Study Designs" into its four sub-fields
//! 4. list the intervention kinds from "Interventions"
//! 5. derive "Duration (yr)" from the start and completion dates
//!
//! Rows that cannot be decoded or split into their sub-fields are dropped and
//! counted, and the run carries on.
//! Missing sub-fields and unusable dates leave the null sentinel in place.

use std::{io::Read, ops::ControlFlow};

use anyhow::{Context, Result, ensure};
use encoding_rs::Encoding;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    cli::ScrubArgs,
    config::ScrubConfig,
    dates,
    error::ScrubError,
    filter::StudyTypeFilter,
    io_utils,
    multivalue,
    rows::{NULL_SENTINEL, insert_field},
    schema::{self, DESIGN_FIELDS, Projection},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    AwaitingHeader,
    SchemaSetup,
    StreamingRows,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    StudyType,
    MalformedStudyDesigns,
    MalformedInterventions,
    WidthMismatch,
    Undecodable,
}

impl DropReason {
    /// The reason recorded for `err`, or `None` when the error must not drop a row.
    fn for_error(err: &ScrubError) -> Option<Self> {
        if !err.drops_row() {
            return None;
        }
        match err {
            ScrubError::MalformedMultiValue { column, .. } if column == schema::STUDY_DESIGNS => {
                Some(DropReason::MalformedStudyDesigns)
            }
            ScrubError::MalformedMultiValue { .. } => Some(DropReason::MalformedInterventions),
            ScrubError::WidthMismatch { .. } => Some(DropReason::WidthMismatch),
            ScrubError::UndecodableRow(_) => Some(DropReason::Undecodable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Emitted(Vec<String>),
    Dropped(DropReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrubStats {
    pub processed: usize,
    pub dropped: usize,
    pub dropped_study_type: usize,
    pub dropped_malformed_study_designs: usize,
    pub dropped_malformed_interventions: usize,
    pub dropped_width_mismatch: usize,
    pub dropped_undecodable: usize,
    /// Design sub-fields left at the null sentinel.
    pub missing_design_keys: usize,
    pub unavailable_durations: usize,
}

impl ScrubStats {
    pub fn remaining(&self) -> usize {
        self.processed - self.dropped
    }

    fn record_drop(&mut self, reason: DropReason) {
        self.dropped += 1;
        match reason {
            DropReason::StudyType => self.dropped_study_type += 1,
            DropReason::MalformedStudyDesigns => self.dropped_malformed_study_designs += 1,
            DropReason::MalformedInterventions => self.dropped_malformed_interventions += 1,
            DropReason::WidthMismatch => self.dropped_width_mismatch += 1,
            DropReason::Undecodable => self.dropped_undecodable += 1,
        }
    }
}

/// Positions resolved once against the projected header, plus the widened header.
#[derive(Debug, Clone)]
struct Layout {
    projection: Projection,
    header: Vec<String>,
    filter: StudyTypeFilter,
    study_designs: usize,
    interventions: usize,
    start_date: usize,
    completion_date: usize,
}

impl Layout {
    fn resolve(raw_header: &[String], config: &ScrubConfig) -> Result<Self, ScrubError> {
        schema::ensure_unique(raw_header)?;
        let projection = Projection::resolve(raw_header, &config.drop_columns)?;
        let header = schema::widen_header(projection.apply(raw_header)?)?;
        let position = |name: &str| schema::column_position(&header, name);
        Ok(Layout {
            filter: StudyTypeFilter::new(&header, &config.study_type)?,
            study_designs: position(schema::STUDY_DESIGNS)?,
            interventions: position(schema::INTERVENTIONS)?,
            start_date: position(schema::START_DATE)?,
            completion_date: position(schema::COMPLETION_DATE)?,
            projection,
            header,
        })
    }

    fn width(&self) -> usize {
        self.header.len()
    }
}

#[derive(Debug)]
pub struct Scrubber {
    config: ScrubConfig,
    state: PipelineState,
    layout: Option<Layout>,
    stats: ScrubStats,
}

impl Scrubber {
    pub fn new(config: ScrubConfig) -> Self {
        Scrubber {
            config,
            state: PipelineState::AwaitingHeader,
            layout: None,
            stats: ScrubStats::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &ScrubStats {
        &self.stats
    }

    /// The widened header, once the schema has been set up.
    pub fn header(&self) -> Option<&[String]> {
        self.layout.as_ref().map(|layout| layout.header.as_slice())
    }

    /// Consumes the raw header and returns the widened output header.
    pub fn accept_header(&mut self, raw_header: &[String]) -> Result<&[String]> {
        ensure!(
            self.state == PipelineState::AwaitingHeader,
            "Header already accepted (pipeline is {:?})",
            self.state
        );
        self.state = PipelineState::SchemaSetup;
        let layout = Layout::resolve(raw_header, &self.config)?;
        info!(
            "Dropping {} column(s); output has {} column(s) including {} derived",
            layout.projection.dropped(),
            layout.width(),
            schema::derived_columns().count()
        );
        self.state = PipelineState::StreamingRows;
        Ok(self.layout.insert(layout).header.as_slice())
    }

    /// Maps one raw data row to its scrubbed form, or records why it was dropped.
    pub fn process_row(&mut self, raw: &[String]) -> Result<RowOutcome> {
        self.ensure_streaming()?;
        let layout = self
            .layout
            .as_ref()
            .context("Schema layout missing while streaming rows")?;
        self.stats.processed += 1;
        let scrubbed = scrub_row(layout, &mut self.stats, raw);
        self.settle(scrubbed)
    }

    /// Counts a data row that failed before its cells could be read.
    pub fn reject_row(&mut self, err: ScrubError) -> Result<RowOutcome> {
        self.ensure_streaming()?;
        self.stats.processed += 1;
        self.settle(Err(err))
    }

    /// Ends the run and hands back the final counters.
    pub fn finish(&mut self) -> ScrubStats {
        self.state = PipelineState::Done;
        self.stats.clone()
    }

    fn ensure_streaming(&self) -> Result<()> {
        ensure!(
            self.state == PipelineState::StreamingRows,
            "Rows can only be processed after the header (pipeline is {:?})",
            self.state
        );
        Ok(())
    }

    fn settle(&mut self, scrubbed: Result<RowOutcome, ScrubError>) -> Result<RowOutcome> {
        let row_number = self.stats.processed;
        let outcome = match scrubbed {
            Ok(outcome) => outcome,
            Err(err) => match DropReason::for_error(&err) {
                Some(reason) => {
                    debug!("Data row {row_number}: {err}");
                    RowOutcome::Dropped(reason)
                }
                None => return Err(err.into()),
            },
        };
        if let RowOutcome::Dropped(reason) = &outcome {
            self.stats.record_drop(*reason);
            debug!("Dropped data row {row_number}: {reason:?}");
        }
        let interval = self.config.progress_interval;
        if interval > 0 && row_number % interval == 0 {
            debug!(
                "...processed {row_number} row(s), {} dropped so far",
                self.stats.dropped
            );
        }
        Ok(outcome)
    }
}

fn scrub_row(
    layout: &Layout,
    stats: &mut ScrubStats,
    raw: &[String],
) -> Result<RowOutcome, ScrubError> {
    let row = layout.projection.apply(raw)?;
    if !layout.filter.retains(&row) {
        return Ok(RowOutcome::Dropped(DropReason::StudyType));
    }

    let designs = multivalue::decode(schema::STUDY_DESIGNS, &row[layout.study_designs])?;
    let interventions = multivalue::decode(schema::INTERVENTIONS, &row[layout.interventions])?;
    let duration = dates::duration_cell(&row[layout.start_date], &row[layout.completion_date]);
    if duration == NULL_SENTINEL {
        stats.unavailable_durations += 1;
    }

    let header = &layout.header;
    let mut row = row;
    for name in DESIGN_FIELDS {
        match designs.joined(name) {
            Ok(value) => row = insert_field(row, header, name, &value)?,
            Err(_) => stats.missing_design_keys += 1,
        }
    }
    let methods = interventions.joined_keys();
    row = insert_field(row, header, schema::INTERVENTION_METHODS, &methods)?;
    row = insert_field(row, header, schema::DURATION, &duration)?;
    Ok(RowOutcome::Emitted(row))
}

pub(crate) enum OutputSink<'a> {
    Csv(&'a mut io_utils::CsvSink<Box<dyn std::io::Write>>),
    Table {
        header: &'a mut Vec<String>,
        rows: &'a mut Vec<Vec<String>>,
        limit: usize,
    },
}

impl OutputSink<'_> {
    fn emit_header(&mut self, header: &[String]) -> Result<()> {
        match self {
            OutputSink::Csv(sink) => sink
                .write_record(header)
                .context("Writing output headers"),
            OutputSink::Table { header: target, .. } => {
                **target = header.to_vec();
                Ok(())
            }
        }
    }

    fn emit_row(&mut self, row: Vec<String>) -> Result<ControlFlow<()>> {
        match self {
            OutputSink::Csv(sink) => {
                sink.write_record(&row).context("Writing output row")?;
                Ok(ControlFlow::Continue(()))
            }
            OutputSink::Table { rows, limit, .. } => {
                rows.push(row);
                if rows.len() >= *limit {
                    Ok(ControlFlow::Break(()))
                } else {
                    Ok(ControlFlow::Continue(()))
                }
            }
        }
    }
}

/// Streams `reader` through `scrubber` into `sink`, stopping early if the sink asks.
pub(crate) fn drive<R: Read>(
    scrubber: &mut Scrubber,
    reader: csv::Reader<R>,
    encoding: &'static Encoding,
    lossy: bool,
    sink: &mut OutputSink<'_>,
) -> Result<ScrubStats> {
    for (ordinal, result) in reader.into_byte_records().enumerate() {
        let line = ordinal + 1;
        let record = result.with_context(|| format!("Reading row {line}"))?;
        let decoded = io_utils::decode_record(&record, encoding, lossy);
        if scrubber.state() == PipelineState::AwaitingHeader {
            let raw_header = decoded.with_context(|| format!("Decoding row {line}"))?;
            let header = scrubber.accept_header(&raw_header)?;
            sink.emit_header(header)?;
            continue;
        }
        let outcome = match decoded {
            Ok(row) => scrubber.process_row(&row)?,
            Err(err) => {
                warn!("Skipping row {line}: {err:#}");
                scrubber.reject_row(ScrubError::UndecodableRow(format!("{err:#}")))?
            }
        };
        if let RowOutcome::Emitted(row) = outcome
            && sink.emit_row(row)?.is_break()
        {
            break;
        }
    }
    if scrubber.state() == PipelineState::AwaitingHeader {
        warn!("Input contained no header row; nothing to scrub");
    }
    Ok(scrubber.finish())
}

#[derive(Debug, Serialize)]
pub struct ScrubReport<'a> {
    pub header: &'a [String],
    #[serde(flatten)]
    pub stats: &'a ScrubStats,
    pub remaining: usize,
}

pub fn execute(args: &ScrubArgs) -> Result<()> {
    let config = ScrubConfig::from_args(&args.pipeline)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_path = args.output.as_deref();
    let output_delimiter =
        io_utils::resolve_output_delimiter(output_path, args.output_delimiter, delimiter);
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    info!(
        "Scrubbing '{}' -> {} (delimiter '{}', output '{}', keeping '{}' studies)",
        args.input.display(),
        output_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        crate::printable_delimiter(delimiter),
        crate::printable_delimiter(output_delimiter),
        config.study_type
    );

    let reader = io_utils::open_csv_reader_from_path(&args.input, delimiter)?;
    let mut writer = io_utils::open_csv_sink(output_path, output_delimiter, output_encoding)?;
    let mut scrubber = Scrubber::new(config);
    let stats = drive(
        &mut scrubber,
        reader,
        input_encoding,
        args.lossy_input,
        &mut OutputSink::Csv(&mut writer),
    )?;
    writer.flush()?;

    info!(
        "Processed {} row(s): {} dropped, {} remaining",
        stats.processed,
        stats.dropped,
        stats.remaining()
    );
    debug!("Run statistics: {stats:?}");

    if let Some(path) = &args.report {
        let report = ScrubReport {
            header: scrubber.header().unwrap_or_default(),
            stats: &stats,
            remaining: stats.remaining(),
        };
        let json = serde_json::to_string_pretty(&report).context("Serializing run report")?;
        std::fs::write(path, json).with_context(|| format!("Writing run report to {path:?}"))?;
        info!("Run report written to {path:?}");
    }
    Ok(())
}
