//! Line-oriented chat front end.
//!
//! Each line is either a command (`book`, `calendar`, `status`, ...) or free
//! text answering the current step's prompt.

use crate::calendar::{CalendarAggregator, DayCell, MonthView, YearMonth};
use crate::session::{BookingSession, SessionAction, SessionStep};
use crate::status::StatusLookup;
use museum_tickets_core::environment::Clock;
use museum_tickets_runtime::StoreError;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::broadcast;

/// Signed and fractional numbers are matched whole so they can be refused
#[allow(clippy::expect_used)]
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern is a valid regex")
});

const VISITORS_HINT: &str = "Please enter the number of adults and children, e.g. \"2 1\".";

/// Commands understood by the chat
pub const HELP: &[&str] = &[
    "Commands:",
    "  book               start a new booking",
    "  calendar [YYYY-MM] show availability for a month",
    "  status <id>        look up a booking",
    "  summary            show the booking summary",
    "  pay                confirm and pay",
    "  retry              retry the price lookup or a failed submission",
    "  cancel             discard the current booking",
    "  quit               leave",
    "Anything else answers the current question.",
];

/// One parsed line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Input for the booking session
    Session(SessionAction),
    /// Show a month's availability; the current month when `None`
    Calendar(Option<YearMonth>),
    /// Look up a booking by id
    Status(String),
    /// Show the command list
    Help,
    /// Leave the chat
    Quit,
    /// Input that could not be used, with a hint
    Invalid(String),
    /// Blank line
    Empty,
}

/// Parse `line` in the context of the session's current `step`
#[must_use]
pub fn parse_command(step: SessionStep, line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    match word.to_ascii_lowercase().as_str() {
        "book" if rest.is_empty() || rest.eq_ignore_ascii_case("tickets") => {
            ChatCommand::Session(SessionAction::StartBooking)
        },
        "calendar" if rest.is_empty() => ChatCommand::Calendar(None),
        "calendar" => match rest.parse() {
            Ok(month) => ChatCommand::Calendar(Some(month)),
            Err(error) => ChatCommand::Invalid(format!("{error}.")),
        },
        "status" if rest.is_empty() => {
            ChatCommand::Invalid("Please give a booking ID, e.g. \"status BK-1\".".to_string())
        },
        "status" => ChatCommand::Status(rest.to_string()),
        "cancel" if rest.is_empty() => ChatCommand::Session(SessionAction::Cancel),
        "retry" if rest.is_empty() => ChatCommand::Session(if step == SessionStep::Failed {
            SessionAction::RetrySubmission
        } else {
            SessionAction::RetryPricing
        }),
        "pay" if rest.is_empty() => ChatCommand::Session(SessionAction::ConfirmAndPay),
        "confirm" => ChatCommand::Session(SessionAction::ConfirmAndPay),
        "summary" if rest.is_empty() => ChatCommand::Session(SessionAction::ShowSummary),
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" => ChatCommand::Quit,
        _ => answer(step, line),
    }
}

/// Free text answering the prompt of `step`
fn answer(step: SessionStep, line: &str) -> ChatCommand {
    let value = line.to_string();
    match step {
        SessionStep::DateSelection => ChatCommand::Session(SessionAction::SelectDate { date: value }),
        SessionStep::NationalitySelection => {
            ChatCommand::Session(SessionAction::SelectNationality { value })
        },
        SessionStep::TicketTypeSelection => {
            ChatCommand::Session(SessionAction::SelectTicketType { value })
        },
        SessionStep::TimeSlotSelection => ChatCommand::Session(SessionAction::SelectTimeSlot { value }),
        SessionStep::VisitorCountEntry => parse_visitors(line).map_or_else(
            || ChatCommand::Invalid(VISITORS_HINT.to_string()),
            |(adults, children)| ChatCommand::Session(SessionAction::EnterVisitors { adults, children }),
        ),
        SessionStep::EmailEntry => ChatCommand::Session(SessionAction::EnterEmail { email: value }),
        SessionStep::Idle
        | SessionStep::ReviewAndPay
        | SessionStep::Submitting
        | SessionStep::Completed
        | SessionStep::Failed => ChatCommand::Help,
    }
}

/// Adults then children; a single number means no children. Negative or
/// fractional counts are refused.
fn parse_visitors(line: &str) -> Option<(u32, u32)> {
    let numbers = NUMBER
        .find_iter(line)
        .map(|m| m.as_str().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match numbers.as_slice() {
        [adults] => Some((*adults, 0)),
        [adults, children] => Some((*adults, *children)),
        _ => None,
    }
}

/// What to print after a line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    /// Lines to show
    pub lines: Vec<String>,
    /// The visitor asked to leave
    pub quit: bool,
}

impl ChatReply {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }
}

/// A chat with one visitor
///
/// Submissions are not awaited by [`Chat::handle`], so a cancel can be typed
/// while one is in flight. Their outcome is picked up by [`Chat::updates`]
/// once [`Chat::subscribe`] reports a result.
pub struct Chat {
    session: BookingSession,
    calendar: CalendarAggregator,
    status: StatusLookup,
    clock: Arc<dyn Clock>,
    /// Session notices already shown
    shown: usize,
}

impl Chat {
    /// Create a chat over a session and the read-only lookups
    #[must_use]
    pub fn new(
        session: BookingSession,
        calendar: CalendarAggregator,
        status: StatusLookup,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            session,
            calendar,
            status,
            clock,
            shown: 0,
        }
    }

    /// The booking session behind the chat
    #[must_use]
    pub const fn session(&self) -> &BookingSession {
        &self.session
    }

    /// Results of calls running behind the chat, broadcast once applied
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionAction> {
        self.session.subscribe()
    }

    /// Session notices not shown yet, such as the outcome of a submission
    /// that finished after its reply
    pub async fn updates(&mut self) -> Vec<String> {
        let (notices, emitted) = self.session.notices_since(self.shown).await;
        self.shown = emitted;
        notices.iter().map(ToString::to_string).collect()
    }

    /// Opening lines
    #[must_use]
    pub fn greeting() -> Vec<String> {
        let mut lines = vec!["Welcome to the museum ticket desk.".to_string()];
        lines.extend(HELP.iter().map(|line| (*line).to_string()));
        lines.push(SessionStep::Idle.prompt().to_string());
        lines
    }

    /// Handle one line of input
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the session has been shut down.
    pub async fn handle(&mut self, line: &str) -> Result<ChatReply, StoreError> {
        let step = self.session.step().await;
        let command = parse_command(step, line);
        tracing::debug!(?step, ?command, "Chat input");

        let reply = match command {
            ChatCommand::Session(action) => {
                let submits = matches!(
                    action,
                    SessionAction::ConfirmAndPay | SessionAction::RetrySubmission
                );
                let mut handle = self.session.send(action).await?;
                if !submits {
                    handle.wait().await;
                }
                ChatReply::lines(self.updates().await)
            },
            ChatCommand::Calendar(month) => {
                let today = self.clock.today();
                let view = self
                    .calendar
                    .load(month.unwrap_or_else(|| YearMonth::containing(today)))
                    .await;
                ChatReply::lines(render_month(&view, today))
            },
            ChatCommand::Status(id) => ChatReply::lines(vec![match self.status.lookup(&id).await {
                Ok(record) => record.to_string(),
                Err(error) => error.user_message(),
            }]),
            ChatCommand::Help => ChatReply::lines(HELP.iter().map(|line| (*line).to_string()).collect()),
            ChatCommand::Quit => ChatReply {
                lines: vec!["Goodbye.".to_string()],
                quit: true,
            },
            ChatCommand::Invalid(hint) => ChatReply::lines(vec![hint]),
            ChatCommand::Empty => ChatReply::default(),
        };
        Ok(reply)
    }
}

/// One line per day of the month, or the month's load failure
#[must_use]
pub fn render_month(view: &MonthView, today: chrono::NaiveDate) -> Vec<String> {
    if let Some(error) = view.error() {
        return vec![error.user_message()];
    }

    let mut lines = vec![format!("Availability for {}", view.month())];
    for (day, cell) in view.cells() {
        let line = match cell {
            DayCell::Classified(availability) => {
                let mut line = format!("{day}  {}", availability.status);
                if day < today {
                    line.push_str(" (past)");
                } else if view.is_selectable(day, today) {
                    line.push_str(&format!("  {}", view.slot_summary(day).join(", ")));
                }
                line
            },
            DayCell::Unclassified => format!("{day}  -"),
            DayCell::Error => format!("{day}  error"),
        };
        lines.push(line);
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::calendar::{aggregate, CalendarPolicy};
    use crate::error::AggregationError;
    use crate::services::{DayEntry, MonthlyCalendarResponse, SlotEntry};
    use chrono::NaiveDate;

    #[test]
    fn commands_take_precedence_over_answers() {
        let step = SessionStep::DateSelection;
        assert_eq!(parse_command(step, "book"), ChatCommand::Session(SessionAction::StartBooking));
        assert_eq!(parse_command(step, "  CANCEL "), ChatCommand::Session(SessionAction::Cancel));
        assert_eq!(parse_command(step, "help"), ChatCommand::Help);
        assert_eq!(parse_command(step, "exit"), ChatCommand::Quit);
        assert_eq!(parse_command(step, "   "), ChatCommand::Empty);
        assert_eq!(
            parse_command(step, "2025-06-02"),
            ChatCommand::Session(SessionAction::SelectDate {
                date: "2025-06-02".into()
            })
        );
    }

    #[test]
    fn calendar_takes_optional_month() {
        assert_eq!(parse_command(SessionStep::Idle, "calendar"), ChatCommand::Calendar(None));
        assert_eq!(
            parse_command(SessionStep::Idle, "calendar 2025-07"),
            ChatCommand::Calendar(YearMonth::new(2025, 7))
        );
        assert!(matches!(
            parse_command(SessionStep::Idle, "calendar July"),
            ChatCommand::Invalid(_)
        ));
    }

    #[test]
    fn status_requires_an_id() {
        assert_eq!(
            parse_command(SessionStep::Idle, "status BK-42"),
            ChatCommand::Status("BK-42".into())
        );
        assert!(matches!(parse_command(SessionStep::Idle, "status"), ChatCommand::Invalid(_)));
    }

    #[test]
    fn retry_depends_on_step() {
        assert_eq!(
            parse_command(SessionStep::Failed, "retry"),
            ChatCommand::Session(SessionAction::RetrySubmission)
        );
        assert_eq!(
            parse_command(SessionStep::VisitorCountEntry, "retry"),
            ChatCommand::Session(SessionAction::RetryPricing)
        );
    }

    #[test]
    fn free_text_is_routed_by_step() {
        assert_eq!(
            parse_command(SessionStep::TimeSlotSelection, "10:00 AM"),
            ChatCommand::Session(SessionAction::SelectTimeSlot {
                value: "10:00 AM".into()
            })
        );
        assert_eq!(
            parse_command(SessionStep::EmailEntry, "a@b.co"),
            ChatCommand::Session(SessionAction::EnterEmail {
                email: "a@b.co".into()
            })
        );
        assert_eq!(parse_command(SessionStep::Idle, "hello"), ChatCommand::Help);
    }

    #[test]
    fn visitor_counts_are_parsed() {
        let step = SessionStep::VisitorCountEntry;
        assert_eq!(
            parse_command(step, "2 adults, 1 child"),
            ChatCommand::Session(SessionAction::EnterVisitors {
                adults: 2,
                children: 1
            })
        );
        assert_eq!(
            parse_command(step, "3"),
            ChatCommand::Session(SessionAction::EnterVisitors {
                adults: 3,
                children: 0
            })
        );
        assert!(matches!(parse_command(step, "two"), ChatCommand::Invalid(_)));
        assert!(matches!(parse_command(step, "1 2 3"), ChatCommand::Invalid(_)));
        assert!(matches!(parse_command(step, "99999999999 1"), ChatCommand::Invalid(_)));
    }

    #[test]
    fn negative_and_fractional_visitor_counts_are_invalid() {
        let step = SessionStep::VisitorCountEntry;
        for line in ["-1 2", "-3", "2 -1", "1.5", "2 adults, 0.5 children"] {
            assert!(
                matches!(parse_command(step, line), ChatCommand::Invalid(_)),
                "{line:?} should be refused"
            );
        }
        assert_eq!(
            parse_command(step, "2. 1"),
            ChatCommand::Session(SessionAction::EnterVisitors {
                adults: 2,
                children: 1
            })
        );
    }

    #[test]
    fn month_rendering_lists_every_day() {
        let month = YearMonth::new(2025, 6).unwrap();
        let mut response = MonthlyCalendarResponse::new();
        response.insert(
            "2025-06-02".into(),
            DayEntry {
                status: "available".into(),
                slots: vec![SlotEntry {
                    time: "10:00 AM".into(),
                    available: 48,
                    capacity: None,
                    booked: None,
                }],
            },
        );
        let view = aggregate(month, &response, CalendarPolicy::default());

        let lines = render_month(&view, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());

        assert_eq!(lines.len(), 31);
        assert_eq!(lines[0], "Availability for 2025-06");
        assert_eq!(lines[1], "2025-06-01  -");
        assert_eq!(lines[2], "2025-06-02  Available  10:00 AM: 48 available");
    }

    #[test]
    fn failed_month_renders_one_message() {
        let month = YearMonth::new(2025, 6).unwrap();
        let view = MonthView::failed(
            month,
            AggregationError {
                month: "2025-06".into(),
                detail: "timeout".into(),
            },
        );
        let lines = render_month(&view, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(
            lines,
            vec!["Availability for 2025-06 could not be loaded. Please try again later.".to_string()]
        );
    }
}
