//! Variance programs.
//!
//! A program is an ordered list of load-shape instructions, usually read
//! from a tab-delimited file: `delay_before_seconds`, `duration_seconds`,
//! `algorithm_name`, then the algorithm's arguments. Blank lines are
//! skipped; anything else malformed is fatal, reported with its 1-based
//! line number. Compilation flattens the program into a single event list
//! by accumulating delays and durations into each event's offset.

use super::{algorithm_for_name, VarianceAlgorithm, VarianceEvent};
use crate::error::{LoadError, LoadResult};
use std::path::Path;

/// One load-shape directive.
pub struct VarianceInstruction {
    pub delay_before_secs: u64,
    pub duration_secs: u64,
    pub algorithm: Box<dyn VarianceAlgorithm>,
}

/// An ordered list of load-shape directives.
pub struct VarianceProgram {
    instructions: Vec<VarianceInstruction>,
}

impl VarianceProgram {
    /// An empty program: the scheduler activates every worker immediately.
    pub fn empty() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Builds a program from pre-parsed instructions.
    pub fn new(instructions: Vec<VarianceInstruction>) -> Self {
        Self { instructions }
    }

    /// Parses tab-delimited program text.
    pub fn parse(text: &str) -> LoadResult<Self> {
        let mut instructions = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            if raw_line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = raw_line.split('\t').map(str::trim).collect();
            if fields.len() < 3 {
                return Err(LoadError::program_line(
                    line,
                    "expected delay, duration, and algorithm fields",
                ));
            }

            let delay_before_secs: u64 = fields[0].parse().map_err(|_| {
                LoadError::program_line(line, format!("bad delay '{}'", fields[0]))
            })?;
            let duration_secs: u64 = fields[1].parse().map_err(|_| {
                LoadError::program_line(line, format!("bad duration '{}'", fields[1]))
            })?;

            let mut algorithm =
                algorithm_for_name(fields[2]).map_err(|e| e.at_line(line))?;
            algorithm
                .configure(&fields[3..])
                .map_err(|e| e.at_line(line))?;

            instructions.push(VarianceInstruction {
                delay_before_secs,
                duration_secs,
                algorithm,
            });
        }
        Ok(Self { instructions })
    }

    /// Reads and parses a program file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> LoadResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| LoadError::Io {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text)
    }

    /// True when the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Flattens the program into one ordered event list. Each instruction
    /// sees the active count its predecessors leave behind; delays and
    /// durations accumulate into the offsets.
    pub fn compile(&self, total_workers: usize, initially_active: usize) -> Vec<VarianceEvent> {
        let mut events = Vec::new();
        let mut offset_cursor: u64 = 0;
        let mut projected_active = initially_active as i64;

        for instruction in &self.instructions {
            let instruction_events = instruction.algorithm.calculate(
                instruction.duration_secs,
                total_workers,
                projected_active.max(0) as usize,
            );

            offset_cursor += instruction.delay_before_secs * 1000;
            for event in &instruction_events {
                events.push(VarianceEvent::new(
                    event.offset_ms + offset_cursor,
                    event.delta,
                ));
                projected_active =
                    (projected_active + event.delta).clamp(0, total_workers as i64);
            }
            offset_cursor += instruction.duration_secs * 1000;
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_text() {
        let program = VarianceProgram::parse(
            "0\t10\tlinear\t+10\n\n30\t0\tstairstep\t-50%\n",
        )
        .unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn test_bad_integer_reports_line() {
        let result = VarianceProgram::parse("0\t10\tlinear\t+10\nten\t0\tstairstep\t+1\n");
        assert_eq!(
            result.err().and_then(|e| match e {
                LoadError::ProgramLine { line, .. } => Some(line),
                _ => None,
            }),
            Some(2)
        );
    }

    #[test]
    fn test_unknown_algorithm_reports_line() {
        let result = VarianceProgram::parse("0\t10\tsawtooth\t+10\n");
        let Err(LoadError::ProgramLine { line, reason }) = result else {
            panic!("expected a program-line error");
        };
        assert_eq!(line, 1);
        assert!(reason.contains("sawtooth"));
    }

    #[test]
    fn test_bad_argument_reports_line() {
        let result = VarianceProgram::parse("0\t10\tlinear\t+200%\n");
        assert!(matches!(
            result,
            Err(LoadError::ProgramLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_compile_accumulates_offsets() {
        // Ten seconds of +2 linear, a 5s gap, then a stair-step down to 0.
        let program = VarianceProgram::parse(
            "0\t10\tlinear\t+2\n5\t0\tstairstep\t=0\n",
        )
        .unwrap();
        let events = program.compile(10, 0);
        assert_eq!(
            events,
            vec![
                VarianceEvent::new(5000, 1),
                VarianceEvent::new(10000, 1),
                VarianceEvent::new(15000, -2),
            ]
        );
    }

    #[test]
    fn test_compile_offsets_non_decreasing() {
        let program = VarianceProgram::parse(
            "1\t10\tsine\tconcave\t+50%\n2\t10\tlinear\t-3\n0\t0\tstairstep\t=100%\n",
        )
        .unwrap();
        let events = program.compile(20, 0);
        let mut last = 0;
        for event in &events {
            assert!(event.offset_ms >= last);
            last = event.offset_ms;
        }
        // Net effect: +10, then -3, then up to 20.
        let sum: i64 = events.iter().map(|event| event.delta).sum();
        assert_eq!(sum, 20);
    }

    #[test]
    fn test_projected_active_feeds_next_instruction() {
        // The second stair-step sees 4 active, so "=4" is a no-op.
        let program = VarianceProgram::parse(
            "0\t0\tstairstep\t+4\n1\t0\tstairstep\t=4\n",
        )
        .unwrap();
        let events = program.compile(10, 0);
        assert_eq!(events, vec![VarianceEvent::new(0, 4)]);
    }
}
