use crate::deltas::{PullRequestOutcome, RunOutcome};
use colored::{ColoredString, Colorize};
use std::io::{self, Result};

const INDENT_STR: &str = " ";

pub trait ConsoleDisplay {
    fn display(&self, f: &mut Box<dyn io::Write>, depth: usize) -> Result<()>;
}

fn outcome_glyph(outcome: &RunOutcome) -> ColoredString {
    match outcome {
        RunOutcome::Reported | RunOutcome::DryRun => "✓".green(),
        RunOutcome::Inconsistent | RunOutcome::HeadMismatch => "!".yellow(),
        RunOutcome::Failed(_) => "✗".red(),
        _ => "↪".blue(),
    }
}

impl ConsoleDisplay for PullRequestOutcome {
    fn display(&self, f: &mut Box<dyn io::Write>, depth: usize) -> Result<()> {
        writeln!(
            f,
            "{}{} #{:<6} {}",
            INDENT_STR.repeat(depth),
            outcome_glyph(&self.outcome),
            self.number,
            self.outcome
        )
    }
}

/// One line per pull request visited by a `deltas` run.
pub struct RunSummary {
    sink: Box<dyn io::Write>,
}

impl RunSummary {
    pub fn sink_to(sink: Box<dyn io::Write>) -> Self {
        RunSummary { sink }
    }

    pub fn stdout() -> Self {
        RunSummary::sink_to(Box::new(io::stdout()))
    }

    pub fn render(&mut self, outcomes: &[PullRequestOutcome]) -> Result<()> {
        let reported = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, RunOutcome::Reported | RunOutcome::DryRun))
            .count();
        writeln!(
            self.sink,
            "> {:<11}: {}",
            "PRs",
            outcomes.len()
        )?;
        writeln!(self.sink, "> {:<11}: {}", "Reported", reported)?;
        for outcome in outcomes {
            outcome.display(&mut self.sink, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn renders_one_line_per_pull_request() {
        colored::control::set_override(false);
        let captured = Captured::default();
        RunSummary::sink_to(Box::new(captured.clone()))
            .render(&[
                PullRequestOutcome {
                    number: 7,
                    outcome: RunOutcome::Locked,
                },
                PullRequestOutcome {
                    number: 42,
                    outcome: RunOutcome::Reported,
                },
            ])
            .unwrap();
        let text = String::from_utf8(captured.0.borrow().clone()).unwrap();
        assert_eq!(
            text,
            "> PRs        : 2\n\
             > Reported   : 1\n \
             ↪ #7      locked, skipped\n \
             ✓ #42     report commented\n"
        );
    }
}
