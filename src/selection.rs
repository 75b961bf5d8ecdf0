//! Interactive selection of city and filter.
//!
//! [`Selection`] is a finite-state machine fed one line of input at a time.
//! [`run_session`] drives it from a [`Prompt`], shows menus on a writer and
//! hands each finished [`Configuration`] to a callback.

use std::io::{self, BufRead, ErrorKind, Write};

use anyhow::Result;
use chrono::{Month, Weekday};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Catalog, Configuration};
use crate::filter::{FilterKind, weekday_from_index, weekday_name};

/// Where the machine is waiting for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Menu,
    SelectCity,
    SelectFilterType,
    /// `then_day` is set while picking both month and weekday.
    SelectMonth { then_day: bool },
    SelectDay,
    Ready,
}

/// Rejected menu input; the state does not change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChoiceError {
    #[error("Please enter a number!")]
    NotANumber,
    #[error("Please enter a valid number shown above!")]
    OutOfRange,
}

/// Draft choices plus the current state.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    catalog: &'a Catalog,
    city: usize,
    kind: FilterKind,
    month: Month,
    weekday: Weekday,
    state: State,
}

impl<'a> Selection<'a> {
    /// Starts at the top menu with the first city and no filter.
    pub fn new(catalog: &'a Catalog) -> Self {
        Selection {
            catalog,
            city: 0,
            kind: FilterKind::None,
            month: catalog.months().first().copied().unwrap_or(Month::January),
            weekday: Weekday::Mon,
            state: State::Menu,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// A fresh configuration built from the current choices.
    pub fn configuration(&self) -> Configuration {
        Configuration {
            city: self.catalog.cities()[self.city].clone(),
            filter: self.kind.with_values(self.month, self.weekday),
            interactive: true,
        }
    }

    /// Back to the top menu, keeping the previous choices.
    pub fn restart(&mut self) {
        self.state = State::Menu;
    }

    /// Applies one line of input. Empty input means "continue" at the top
    /// menu and "keep the current value" everywhere else.
    pub fn handle(&mut self, input: &str) -> Result<State, ChoiceError> {
        let input = input.trim();
        let next = if input.is_empty() {
            self.on_empty()
        } else {
            let choice: usize = input.parse().map_err(|_| ChoiceError::NotANumber)?;
            self.on_choice(choice)?
        };
        debug!(from = ?self.state, to = ?next, input, "Selection transition");
        self.state = next;
        Ok(next)
    }

    fn on_empty(&self) -> State {
        match self.state {
            State::Menu => State::Ready,
            State::SelectMonth { then_day: true } => State::SelectDay,
            State::Ready => State::Ready,
            _ => State::Menu,
        }
    }

    fn on_choice(&mut self, choice: usize) -> Result<State, ChoiceError> {
        match self.state {
            State::Menu => self.menu_choice(choice),
            State::SelectCity => {
                if choice == 0 || choice > self.catalog.cities().len() {
                    return Err(ChoiceError::OutOfRange);
                }
                self.city = choice - 1;
                Ok(State::Menu)
            }
            State::SelectFilterType => {
                let kind = choice
                    .checked_sub(1)
                    .and_then(|i| FilterKind::ALL.get(i))
                    .copied()
                    .ok_or(ChoiceError::OutOfRange)?;
                self.kind = kind;
                Ok(match kind {
                    FilterKind::None => State::Menu,
                    FilterKind::Month => State::SelectMonth { then_day: false },
                    FilterKind::Day => State::SelectDay,
                    FilterKind::Both => State::SelectMonth { then_day: true },
                })
            }
            State::SelectMonth { then_day } => {
                let month = self
                    .catalog
                    .months()
                    .iter()
                    .find(|m| m.number_from_month() as usize == choice)
                    .copied()
                    .ok_or(ChoiceError::OutOfRange)?;
                self.month = month;
                Ok(if then_day {
                    State::SelectDay
                } else {
                    State::Menu
                })
            }
            State::SelectDay => {
                let weekday = choice
                    .checked_sub(1)
                    .and_then(|i| u32::try_from(i).ok())
                    .and_then(weekday_from_index)
                    .filter(|d| self.catalog.weekdays().contains(d))
                    .ok_or(ChoiceError::OutOfRange)?;
                self.weekday = weekday;
                Ok(State::Menu)
            }
            State::Ready => Ok(State::Ready),
        }
    }

    fn menu_choice(&self, choice: usize) -> Result<State, ChoiceError> {
        match (choice, self.kind) {
            (1, _) => Ok(State::SelectCity),
            (2, _) => Ok(State::SelectFilterType),
            (3, FilterKind::Month | FilterKind::Both) => Ok(State::SelectMonth { then_day: false }),
            (3, FilterKind::Day) | (4, FilterKind::Both) => Ok(State::SelectDay),
            _ => Err(ChoiceError::OutOfRange),
        }
    }

    /// Menu text for the current state.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        match self.state {
            State::Menu => {
                let city = &self.catalog.cities()[self.city];
                lines.push("Hello! Let's explore some US bikeshare data!".to_string());
                lines.push("--------------------------------------------".to_string());
                lines.push(format!("(1) City: {} (File: {})", city.name, city.file));
                lines.push(format!("(2) Filter: {}", self.kind.label()));
                match self.kind {
                    FilterKind::None => {}
                    FilterKind::Month => lines.push(format!("(3) Month: {}", self.month.name())),
                    FilterKind::Day => {
                        lines.push(format!("(3) Day: {}", weekday_name(self.weekday)))
                    }
                    FilterKind::Both => {
                        lines.push(format!("(3) Month: {}", self.month.name()));
                        lines.push(format!("(4) Day: {}", weekday_name(self.weekday)));
                    }
                }
                lines.push("------------------".to_string());
                lines.push(
                    "Press 'Enter' to analyze the shown city using the given filter, or \
                     select an option to change its value. Use Ctrl-C to quit."
                        .to_string(),
                );
            }
            State::SelectCity => {
                lines.push("Please choose a city or press return to discard the change:".into());
                for (i, city) in self.catalog.cities().iter().enumerate() {
                    lines.push(format!("({}) {}", i + 1, city.name));
                }
            }
            State::SelectFilterType => {
                lines.push("Please choose a filter or press return to discard the change:".into());
                for (i, kind) in FilterKind::ALL.iter().enumerate() {
                    lines.push(format!("({}) {}", i + 1, kind.label()));
                }
            }
            State::SelectMonth { .. } => {
                lines.push(format!(
                    "Please choose a month or press return to choose {}:",
                    self.month.name()
                ));
                for month in self.catalog.months() {
                    lines.push(format!("({}) {}", month.number_from_month(), month.name()));
                }
            }
            State::SelectDay => {
                lines.push(format!(
                    "Please choose a day or press return to choose {}:",
                    weekday_name(self.weekday)
                ));
                for day in self.catalog.weekdays() {
                    lines.push(format!(
                        "({}) {}",
                        day.num_days_from_monday() + 1,
                        weekday_name(*day)
                    ));
                }
            }
            State::Ready => lines.push("Start analyzing your data ...".into()),
        }
        lines.join("\n")
    }
}

const PROMPT: &str = "Your choice";

/// Source of answers for the interactive session.
pub trait Prompt {
    /// Asks for one answer. `Ok(None)` means the input is exhausted; an
    /// `Interrupted` error means the user pressed Ctrl-C.
    fn read_answer(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads answers line by line, for piped input and tests.
pub struct LinePrompt<R> {
    input: R,
}

impl<R: BufRead> LinePrompt<R> {
    pub fn new(input: R) -> Self {
        LinePrompt { input }
    }
}

impl<R: BufRead> Prompt for LinePrompt<R> {
    fn read_answer(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Asks for one answer; `None` once the user has closed or interrupted the
/// prompt, which ends the session.
fn next_answer<P: Prompt>(prompt: &mut P) -> Result<Option<String>> {
    match prompt.read_answer(PROMPT) {
        Ok(answer) => Ok(answer),
        Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::UnexpectedEof) => {
            debug!(error = %e, "Prompt interrupted");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs the interactive loop until the input is closed or interrupted.
///
/// Each time the user continues from the top menu, `on_ready` is called with
/// a newly built configuration. A failed run is reported on `out` and the
/// session carries on to the restart prompt.
pub fn run_session<P, W, F>(
    catalog: &Catalog,
    prompt: &mut P,
    out: &mut W,
    mut on_ready: F,
) -> Result<()>
where
    P: Prompt,
    W: Write,
    F: FnMut(&Configuration, &mut W) -> Result<()>,
{
    let mut selection = Selection::new(catalog);
    info!("Interactive session started");

    loop {
        writeln!(out, "{}", selection.render())?;
        out.flush()?;

        let Some(line) = next_answer(prompt)? else {
            break;
        };
        if let Err(e) = selection.handle(&line) {
            writeln!(out, "{e}")?;
            continue;
        }
        if selection.state() != State::Ready {
            continue;
        }

        let config = selection.configuration();
        writeln!(out, "{}", selection.render())?;
        if let Err(e) = on_ready(&config, out) {
            warn!(error = %e, config = %config.describe(), "Analysis failed");
            writeln!(out, "Analysis failed: {e:#}")?;
        }

        if config.interactive {
            writeln!(out, "\nTo restart, press enter. To quit, press Ctrl-C.")?;
            out.flush()?;
            if next_answer(prompt)?.is_none() {
                break;
            }
        }
        selection.restart();
    }

    writeln!(out, "\nGoodbye ...")?;
    info!("Interactive session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;
    use std::io::Cursor;

    fn feed(selection: &mut Selection<'_>, inputs: &[&str]) {
        for input in inputs {
            selection.handle(input).unwrap();
        }
    }

    #[test]
    fn test_defaults() {
        let catalog = Catalog::default();
        let selection = Selection::new(&catalog);
        assert_eq!(selection.state(), State::Menu);
        let config = selection.configuration();
        assert_eq!(config.city.name, "Chicago");
        assert_eq!(config.filter, FilterSpec::None);
        assert!(config.interactive);
    }

    #[test]
    fn test_empty_input_at_menu_is_ready() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        assert_eq!(selection.handle("").unwrap(), State::Ready);
    }

    #[test]
    fn test_change_city() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        assert_eq!(selection.handle("1").unwrap(), State::SelectCity);
        assert_eq!(selection.handle("3").unwrap(), State::Menu);
        assert_eq!(selection.configuration().city.name, "Washington");
    }

    #[test]
    fn test_empty_city_choice_keeps_city() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        feed(&mut selection, &["1", "2", "1", ""]);
        assert_eq!(selection.state(), State::Menu);
        assert_eq!(selection.configuration().city.name, "New York City");
    }

    #[test]
    fn test_invalid_input_does_not_transition() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        selection.handle("1").unwrap();
        assert_eq!(selection.handle("abc"), Err(ChoiceError::NotANumber));
        assert_eq!(selection.handle("0"), Err(ChoiceError::OutOfRange));
        assert_eq!(selection.handle("4"), Err(ChoiceError::OutOfRange));
        assert_eq!(selection.state(), State::SelectCity);
    }

    #[test]
    fn test_month_filter() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        assert_eq!(selection.handle("2").unwrap(), State::SelectFilterType);
        assert_eq!(
            selection.handle("2").unwrap(),
            State::SelectMonth { then_day: false }
        );
        // outside the offered months
        assert_eq!(selection.handle("9"), Err(ChoiceError::OutOfRange));
        assert_eq!(selection.handle("3").unwrap(), State::Menu);
        assert_eq!(
            selection.configuration().filter,
            FilterSpec::Month(Month::March)
        );
    }

    #[test]
    fn test_day_filter() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        feed(&mut selection, &["2", "3"]);
        assert_eq!(selection.state(), State::SelectDay);
        assert_eq!(selection.handle("8"), Err(ChoiceError::OutOfRange));
        selection.handle("7").unwrap();
        assert_eq!(
            selection.configuration().filter,
            FilterSpec::Weekday(Weekday::Sun)
        );
    }

    #[test]
    fn test_both_walks_month_then_day() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        feed(&mut selection, &["2", "4"]);
        assert_eq!(selection.state(), State::SelectMonth { then_day: true });
        assert_eq!(selection.handle("5").unwrap(), State::SelectDay);
        assert_eq!(selection.handle("3").unwrap(), State::Menu);
        assert_eq!(
            selection.configuration().filter,
            FilterSpec::Both(Month::May, Weekday::Wed)
        );
    }

    #[test]
    fn test_both_keeps_defaults_on_empty_input() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        feed(&mut selection, &["2", "4", "", ""]);
        assert_eq!(selection.state(), State::Menu);
        assert_eq!(
            selection.configuration().filter,
            FilterSpec::Both(Month::January, Weekday::Mon)
        );
    }

    #[test]
    fn test_none_clears_filter() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        feed(&mut selection, &["2", "2", "4", "2", "1"]);
        assert_eq!(selection.configuration().filter, FilterSpec::None);
    }

    #[test]
    fn test_menu_shortcuts_depend_on_filter() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        assert_eq!(selection.handle("3"), Err(ChoiceError::OutOfRange));

        feed(&mut selection, &["2", "4", "", ""]);
        assert_eq!(
            selection.handle("3").unwrap(),
            State::SelectMonth { then_day: false }
        );
        selection.handle("").unwrap();
        assert_eq!(selection.handle("4").unwrap(), State::SelectDay);
    }

    #[test]
    fn test_render_menu_lists_filter_values() {
        let catalog = Catalog::default();
        let mut selection = Selection::new(&catalog);
        feed(&mut selection, &["2", "4", "6", "5"]);
        let menu = selection.render();
        assert!(menu.contains("(1) City: Chicago (File: chicago.csv)"));
        assert!(menu.contains("(2) Filter: Both"));
        assert!(menu.contains("(3) Month: June"));
        assert!(menu.contains("(4) Day: Friday"));
    }

    #[test]
    fn test_session_runs_and_restarts_until_end_of_input() {
        let catalog = Catalog::default();
        // analyze defaults, restart, pick Washington + Day(Tuesday), analyze, quit
        let mut input = LinePrompt::new(Cursor::new("\n\n1\n3\n2\n3\n2\n\n"));
        let mut out = Vec::new();
        let mut seen = Vec::new();

        run_session(&catalog, &mut input, &mut out, |config, _| {
            seen.push(config.clone());
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].city.name, "Chicago");
        assert_eq!(seen[1].city.name, "Washington");
        assert_eq!(seen[1].filter, FilterSpec::Weekday(Weekday::Tue));
        let text = String::from_utf8(out).unwrap();
        assert!(text.trim_end().ends_with("Goodbye ..."));
    }

    #[test]
    fn test_session_reports_bad_input_and_failures() {
        let catalog = Catalog::default();
        let mut input = LinePrompt::new(Cursor::new("x\n\n"));
        let mut out = Vec::new();

        run_session(&catalog, &mut input, &mut out, |_, _| {
            anyhow::bail!("no rows left")
        })
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Please enter a number!"));
        assert!(text.contains("Analysis failed: no rows left"));
        assert!(text.contains("Goodbye"));
    }

    #[test]
    fn test_session_ends_immediately_on_end_of_input() {
        let catalog = Catalog::default();
        let mut input = LinePrompt::new(Cursor::new(""));
        let mut out = Vec::new();
        let mut calls = 0;
        run_session(&catalog, &mut input, &mut out, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_interrupt_at_menu_ends_session() {
        let catalog = Catalog::default();
        let mut prompt = Scripted::new(&["1"], ErrorKind::Interrupted);
        let mut out = Vec::new();
        let mut calls = 0;

        run_session(&catalog, &mut prompt, &mut out, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Please choose a city"));
        assert!(text.trim_end().ends_with("Goodbye ..."));
    }

    #[test]
    fn test_interrupt_at_restart_prompt_ends_session() {
        let catalog = Catalog::default();
        let mut prompt = Scripted::new(&[""], ErrorKind::Interrupted);
        let mut out = Vec::new();
        let mut calls = 0;

        run_session(&catalog, &mut prompt, &mut out, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("To restart, press enter. To quit, press Ctrl-C."));
        assert!(text.trim_end().ends_with("Goodbye ..."));
    }

    #[test]
    fn test_other_prompt_errors_are_returned() {
        let catalog = Catalog::default();
        let mut prompt = Scripted::new(&[], ErrorKind::PermissionDenied);
        let mut out = Vec::new();

        let result = run_session(&catalog, &mut prompt, &mut out, |_, _| Ok(()));

        assert!(result.is_err());
        assert!(!String::from_utf8(out).unwrap().contains("Goodbye"));
    }

    /// Replays fixed answers, then fails with `end`.
    struct Scripted {
        answers: Vec<&'static str>,
        end: ErrorKind,
    }

    impl Scripted {
        fn new(answers: &[&'static str], end: ErrorKind) -> Self {
            Scripted {
                answers: answers.iter().rev().copied().collect(),
                end,
            }
        }
    }

    impl Prompt for Scripted {
        fn read_answer(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            match self.answers.pop() {
                Some(answer) => Ok(Some(answer.to_string())),
                None => Err(io::Error::new(self.end, "prompt closed")),
            }
        }
    }
}
