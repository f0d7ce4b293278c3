//! CSV Output
//!
//! Three row shapes, one per measurement mode. Rows go to whatever the
//! writer wraps (standard output in the binary); the optional header is
//! written once, before the first row.

use opmeter_core::{CollectorSummary, Observation, TraceStep};
use std::io::{self, Write};

/// Stack columns in every trace row: bottom-first, padded or truncated to this width
pub const TRACE_STACK_COLUMNS: usize = 32;

/// Header of the one-row-per-repetition aggregate CSV
pub const AGGREGATE_HEADER: &str = "sample_id,op_count,total_cost,total_ns";

/// Header of the one-row-per-operation CSV
pub const FULL_HEADER: &str = "sample_id,index,pc,op,cost,elapsed_ns";

/// Header of the trace CSV
pub fn trace_header() -> String {
    let mut header = String::from("step,pc,op,stack_depth");
    for i in 0..TRACE_STACK_COLUMNS {
        header.push_str(&format!(",stack_{}", i));
    }
    header
}

/// Row shape written by a [`CsvWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvKind {
    /// `sample_id,op_count,total_cost,total_ns`
    Aggregate,
    /// `sample_id,index,pc,op,cost,elapsed_ns`
    Full,
    /// `step,pc,op,stack_depth,stack_0..stack_31`
    Trace,
}

impl CsvKind {
    fn header(self) -> String {
        match self {
            CsvKind::Aggregate => AGGREGATE_HEADER.to_string(),
            CsvKind::Full => FULL_HEADER.to_string(),
            CsvKind::Trace => trace_header(),
        }
    }
}

/// Row writer with a write-once header
pub struct CsvWriter<W: Write> {
    out: W,
    header: bool,
    header_written: bool,
}

impl<W: Write> CsvWriter<W> {
    /// Wrap `out`; `header` controls whether a header line precedes the first row
    pub fn new(out: W, header: bool) -> Self {
        Self {
            out,
            header,
            header_written: false,
        }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn ensure_header(&mut self, kind: CsvKind) -> io::Result<()> {
        if self.header && !self.header_written {
            writeln!(self.out, "{}", kind.header())?;
            self.header_written = true;
        }
        Ok(())
    }

    /// One row summarizing a repetition
    pub fn write_aggregate(&mut self, sample_id: usize, summary: &CollectorSummary) -> io::Result<()> {
        self.ensure_header(CsvKind::Aggregate)?;
        writeln!(
            self.out,
            "{},{},{},{}",
            sample_id, summary.op_count, summary.total_cost, summary.total_ns
        )
    }

    /// One row per observed operation of a repetition
    pub fn write_observations(
        &mut self,
        sample_id: usize,
        observations: &[Observation],
    ) -> io::Result<()> {
        self.ensure_header(CsvKind::Full)?;
        for o in observations {
            writeln!(
                self.out,
                "{},{},{},{},{},{}",
                sample_id, o.index, o.pc, o.op, o.cost, o.elapsed_ns
            )?;
        }
        Ok(())
    }

    /// One row per traced step
    pub fn write_trace(&mut self, steps: &[TraceStep]) -> io::Result<()> {
        self.ensure_header(CsvKind::Trace)?;
        for step in steps {
            writeln!(self.out, "{}", format_trace_row(step))?;
        }
        Ok(())
    }

    /// Flush the wrapped writer
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// `step,pc,op,stack_depth` followed by exactly [`TRACE_STACK_COLUMNS`] decimal
/// stack cells, bottom first; empty cells when the stack is shallower.
pub(crate) fn format_trace_row(step: &TraceStep) -> String {
    let mut row = format!("{},{},{},{}", step.index, step.pc, step.op, step.stack_depth);
    for i in 0..TRACE_STACK_COLUMNS {
        row.push(',');
        if let Some(value) = step.stack.get(i) {
            row.push_str(&value.to_string());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use opmeter_core::{OpCode, Word};

    fn trace_step(depth: usize) -> TraceStep {
        TraceStep {
            index: 3,
            pc: 7,
            op: OpCode::ADD,
            gas: 100,
            cost: 3,
            depth: 1,
            stack_depth: depth,
            stack: (0..depth as u64).map(|v| Word::from(v + 1)).collect(),
            memory: None,
            return_data: None,
            storage: None,
        }
    }

    fn output(writer: CsvWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_trace_row_pads_shallow_stack() {
        let row = format_trace_row(&trace_step(2));
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), 4 + TRACE_STACK_COLUMNS);
        assert_eq!(&cells[..6], &["3", "7", "ADD", "2", "1", "2"]);
        assert!(cells[6..].iter().all(|c| c.is_empty()));
        assert_eq!(cells[6..].len(), 30);
    }

    #[test]
    fn test_trace_row_truncates_deep_stack() {
        let row = format_trace_row(&trace_step(40));
        let cells: Vec<&str> = row.split(',').collect();
        assert_eq!(cells.len(), 4 + TRACE_STACK_COLUMNS);
        // depth column keeps the real depth
        assert_eq!(cells[3], "40");
        assert_eq!(cells[4], "1");
        assert_eq!(cells[35], "32");
    }

    #[test]
    fn test_trace_row_decimal_words() {
        let mut step = trace_step(1);
        step.stack = vec![Word::MAX];
        let row = format_trace_row(&step);
        assert!(row.contains(
            ",115792089237316195423570985008687907853269984665640564039457584007913129639935,"
        ));
    }

    #[test]
    fn test_aggregate_rows_with_header_once() {
        let mut writer = CsvWriter::new(Vec::new(), true);
        let summary = CollectorSummary {
            op_count: 4,
            total_cost: 11,
            total_ns: 900,
        };
        writer.write_aggregate(0, &summary).unwrap();
        writer.write_aggregate(1, &summary).unwrap();
        assert_eq!(
            output(writer),
            "sample_id,op_count,total_cost,total_ns\n0,4,11,900\n1,4,11,900\n"
        );
    }

    #[test]
    fn test_observation_rows_without_header() {
        let mut writer = CsvWriter::new(Vec::new(), false);
        let observations = [
            Observation {
                index: 0,
                pc: 0,
                op: OpCode::PUSH1,
                cost: 3,
                elapsed_ns: 40,
            },
            Observation {
                index: 1,
                pc: 2,
                op: OpCode::STOP,
                cost: 0,
                elapsed_ns: 10,
            },
        ];
        writer.write_observations(5, &observations).unwrap();
        assert_eq!(output(writer), "5,0,0,PUSH1,3,40\n5,1,2,STOP,0,10\n");
    }

    #[test]
    fn test_trace_header_width() {
        let header = trace_header();
        assert_eq!(header.split(',').count(), 4 + TRACE_STACK_COLUMNS);
        assert!(header.ends_with(",stack_31"));
    }
}
