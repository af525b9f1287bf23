use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use insight_diary::diary_entry::{parse_tags, DiaryEntry, EntryDraft, EntryPatch};
use insight_diary::orchestrator::{AnalysisStatus, RequestOutcome, RequestState};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::{Duration, Instant},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const BLINK_INTERVAL: Duration = Duration::from_millis(500);

pub enum Action {
    Write,
    View,
    Edit,
    Delete,
    Search,
    Analyze,
    Quit,
}

const TITLE: usize = 0;
const MOOD: usize = 1;
const CONTENT: usize = 2;
const TAGS: usize = 3;
const FIELD_LABELS: [&str; 4] = ["Title", "Mood", "Content", "Tags (comma-separated)"];

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    cursor_visible: bool,
    last_cursor_update: Instant,
    notice: Notice,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            cursor_visible: true,
            last_cursor_update: Instant::now(),
            notice: Notice::default(),
        })
    }

    /// Shows `message` in the status bar until the next key press.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice.set(message);
    }

    pub fn display(&mut self, entries: &[DiaryEntry], status: &AnalysisStatus) -> Result<()> {
        let status_line = self.notice.status_line(status, entries);

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(1),
                    Constraint::Length(3),
                ])
                .split(f.area());

            render_heading(f, chunks[0], "Personal Diary");

            let width = chunks[1].width.saturating_sub(2) as usize;
            let items: Vec<ListItem> = entries.iter().map(|e| entry_item(e, width)).collect();
            let entries_list =
                List::new(items).block(Block::default().borders(Borders::ALL).title("Entries"));
            f.render_widget(entries_list, chunks[1]);

            let status_style = if status.is_running() {
                Style::default().fg(Color::Magenta)
            } else if status.failure_message().is_some() {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            };
            f.render_widget(Paragraph::new(status_line).style(status_style), chunks[2]);

            let mut keys = vec![("w", "write")];
            if !entries.is_empty() {
                keys.extend([
                    ("v", "view"),
                    ("e", "edit"),
                    ("d", "delete"),
                    ("s", "search"),
                    ("a", "analyze"),
                ]);
            }
            keys.push(("q", "quit"));
            let controls = Paragraph::new(controls_line(&keys))
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(controls, chunks[3]);
        })?;

        Ok(())
    }

    /// Returns `None` when no key arrived within the poll interval, so the
    /// caller can redraw analysis progress. Any key press dismisses the notice.
    pub fn handle_input(&mut self, entries: &[DiaryEntry]) -> Result<Option<Action>> {
        if !event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        self.notice.dismiss();

        let has_entries = !entries.is_empty();
        let action = match key.code {
            KeyCode::Char('w') => Some(Action::Write),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('v') if has_entries => Some(Action::View),
            KeyCode::Char('e') if has_entries => Some(Action::Edit),
            KeyCode::Char('d') if has_entries => Some(Action::Delete),
            KeyCode::Char('s') if has_entries => Some(Action::Search),
            KeyCode::Char('a') if has_entries => Some(Action::Analyze),
            _ => None,
        };
        Ok(action)
    }

    /// Collects a new entry. `None` when every field was left blank.
    pub fn get_new_entry(&mut self) -> Result<Option<EntryDraft>> {
        let fields = self.fill_form("New Diary Entry", Default::default())?;
        if fields.iter().all(|f| f.trim().is_empty()) {
            return Ok(None);
        }

        let [title, mood, content, tags] = fields;
        let mut draft = EntryDraft::new(title, content).with_tags(parse_tags(&tags));
        if !mood.trim().is_empty() {
            draft = draft.with_mood(mood);
        }
        Ok(Some(draft))
    }

    /// Returns only the fields the user changed.
    pub fn edit_entry(&mut self, entry: &DiaryEntry) -> Result<EntryPatch> {
        let original = [
            entry.title.clone(),
            entry.mood.clone().unwrap_or_default(),
            entry.content.clone(),
            entry.tags.join(", "),
        ];
        let [title, mood, content, tags] = self.fill_form("Edit Diary Entry", original.clone())?;

        Ok(EntryPatch {
            title: (title != original[TITLE]).then_some(title),
            mood: (mood != original[MOOD]).then(|| Some(mood).filter(|m| !m.trim().is_empty())),
            content: (content != original[CONTENT]).then_some(content),
            tags: (tags != original[TAGS]).then(|| parse_tags(&tags)),
        })
    }

    /// Edits the four entry fields in order; Esc moves to the next field.
    fn fill_form(&mut self, heading: &str, mut fields: [String; 4]) -> Result<[String; 4]> {
        for active in 0..fields.len() {
            loop {
                let now = Instant::now();
                if now.duration_since(self.last_cursor_update) >= BLINK_INTERVAL {
                    self.cursor_visible = !self.cursor_visible;
                    self.last_cursor_update = now;
                }
                let cursor_visible = self.cursor_visible;

                self.terminal.draw(|f| {
                    let chunks = Layout::default()
                        .direction(Direction::Vertical)
                        .margin(1)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Length(3),
                            Constraint::Length(3),
                            Constraint::Min(6),
                            Constraint::Length(3),
                            Constraint::Length(3),
                        ])
                        .split(f.area());

                    render_heading(f, chunks[0], heading);

                    for (i, value) in fields.iter().enumerate() {
                        let mut text = value.clone();
                        let mut border = Style::default();
                        if i == active {
                            border = border.fg(Color::Yellow);
                            if cursor_visible {
                                text.push('|');
                            }
                        }
                        let input = Paragraph::new(text).wrap(Wrap { trim: false }).block(
                            Block::default()
                                .borders(Borders::ALL)
                                .border_style(border)
                                .title(FIELD_LABELS[i]),
                        );
                        f.render_widget(input, chunks[i + 1]);
                    }

                    let hint = if active == CONTENT {
                        "Enter: New line, Esc: Next field"
                    } else if active == TAGS {
                        "Esc: Finish"
                    } else {
                        "Esc: Next field"
                    };
                    let instructions = Paragraph::new(hint)
                        .style(Style::default().fg(Color::Yellow))
                        .alignment(Alignment::Center);
                    f.render_widget(instructions, chunks[5]);
                })?;

                if !event::poll(Duration::from_millis(50))? {
                    continue;
                }
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Esc => break,
                        KeyCode::Enter if active == CONTENT => fields[active].push('\n'),
                        KeyCode::Enter => break,
                        KeyCode::Char(c) => fields[active].push(c),
                        KeyCode::Backspace => {
                            fields[active].pop();
                        }
                        _ => {}
                    }
                    self.cursor_visible = true;
                    self.last_cursor_update = Instant::now();
                }
            }
        }

        Ok(fields)
    }

    pub fn view_entries(&mut self, entries: &[DiaryEntry]) -> Result<()> {
        while let Some(entry) =
            self.pick_entry(entries, "View Entries", "Up/Down: Navigate, Enter: View full entry, Esc: Back")?
        {
            self.view_full_entry(&entry)?;
        }
        Ok(())
    }

    pub fn select_entry(&mut self, entries: &[DiaryEntry], heading: &str) -> Result<Option<DiaryEntry>> {
        self.pick_entry(entries, heading, "Up/Down: Navigate, Enter: Select, Esc: Cancel")
    }

    fn pick_entry(
        &mut self,
        entries: &[DiaryEntry],
        heading: &str,
        hint: &str,
    ) -> Result<Option<DiaryEntry>> {
        if entries.is_empty() {
            return Ok(None);
        }
        let mut selected_index = 0;

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Min(10),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                render_heading(f, chunks[0], heading);

                let width = chunks[1].width.saturating_sub(4) as usize;
                let items: Vec<ListItem> = entries.iter().map(|e| entry_item(e, width)).collect();
                let entries_list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Entries"))
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");

                f.render_stateful_widget(
                    entries_list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                let instructions = Paragraph::new(hint)
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[2]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Up => selected_index = selected_index.saturating_sub(1),
                    KeyCode::Down => {
                        if selected_index + 1 < entries.len() {
                            selected_index += 1;
                        }
                    }
                    KeyCode::Enter => return Ok(Some(entries[selected_index].clone())),
                    KeyCode::Esc => return Ok(None),
                    _ => {}
                }
            }
        }
    }

    fn view_full_entry(&mut self, entry: &DiaryEntry) -> Result<()> {
        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Percentage(45),
                        Constraint::Min(8),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                let mut heading = format!(
                    "{} ({})",
                    entry.title,
                    entry.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                );
                if let Some(mood) = &entry.mood {
                    heading.push_str(&format!(" - {mood}"));
                }
                render_heading(f, chunks[0], &heading);

                let mut body = entry.content.clone();
                if !entry.tags.is_empty() {
                    body.push_str(&format!("\n\nTags: {}", entry.tags.join(", ")));
                }
                let content = Paragraph::new(body)
                    .wrap(Wrap { trim: false })
                    .block(Block::default().borders(Borders::ALL).title("Content"));
                f.render_widget(content, chunks[1]);

                let analysis = Paragraph::new(analysis_lines(entry))
                    .wrap(Wrap { trim: true })
                    .block(Block::default().borders(Borders::ALL).title("AI Analysis"));
                f.render_widget(analysis, chunks[2]);

                let instructions = Paragraph::new("Esc: Back")
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[3]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }

        Ok(())
    }

    pub fn get_search_query(&mut self) -> Result<String> {
        let mut query = String::new();

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(0),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                render_heading(f, chunks[0], "Search Entries");

                let input = Paragraph::new(format!("{query}|"))
                    .block(Block::default().borders(Borders::ALL).title("Query"));
                f.render_widget(input, chunks[1]);

                let instructions = Paragraph::new("Enter: Search, Esc: Cancel")
                    .style(Style::default().fg(Color::Yellow))
                    .alignment(Alignment::Center);
                f.render_widget(instructions, chunks[3]);
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Enter => break,
                    KeyCode::Esc => return Ok(String::new()),
                    KeyCode::Char(c) => query.push(c),
                    KeyCode::Backspace => {
                        query.pop();
                    }
                    _ => {}
                }
            }
        }

        Ok(query)
    }

    pub fn display_search_results(&mut self, results: &[DiaryEntry]) -> Result<()> {
        if results.is_empty() {
            self.notify("No entries matched your search");
            return Ok(());
        }
        self.view_entries(results)
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

fn render_heading(f: &mut Frame, area: Rect, text: &str) {
    let title = Paragraph::new(text.to_string())
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, area);
}

fn controls_line(keys: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("Press ")];
    for (i, (key, label)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(", "));
        }
        spans.push(Span::styled(*key, Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(format!(" to {label}")));
    }
    Line::from(spans)
}

fn entry_item(entry: &DiaryEntry, width: usize) -> ListItem<'static> {
    let mut headline = format!(
        "[{}] {}",
        entry.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
        entry.title
    );
    if let Some(mood) = &entry.mood {
        headline.push_str(&format!(" ({mood})"));
    }

    let mut first = vec![Span::raw(truncate(&headline, width.saturating_sub(12)))];
    if let Some(sentiment) = entry.sentiment() {
        first.push(Span::styled(
            format!(" [{sentiment}]"),
            Style::default().fg(Color::Magenta),
        ));
    }

    let preview = entry.content.lines().next().unwrap_or("");
    ListItem::new(vec![
        Line::from(first),
        Line::from(Span::raw(truncate(preview, width))),
        Line::from(Span::styled(
            truncate(&format!("Tags: {}", entry.tags.join(", ")), width),
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

fn analysis_lines(entry: &DiaryEntry) -> Vec<Line<'static>> {
    let Some(analysis) = &entry.ai_analysis else {
        return vec![Line::from("No analysis yet. Press 'a' on the main screen to analyze this entry.")];
    };

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Sentiment: ", bold),
            Span::raw(analysis.sentiment.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Summary: ", bold),
            Span::raw(analysis.summary.clone()),
        ]),
        Line::from(Span::styled("Insights:", bold)),
    ];
    lines.extend(analysis.insights.iter().map(|i| Line::from(format!("  - {i}"))));
    lines.push(Line::from(Span::styled("Recommendations:", bold)));
    lines.extend(
        analysis
            .recommendations
            .iter()
            .map(|r| Line::from(format!("  - {r}"))),
    );
    lines.push(Line::from(Span::styled(
        format!(
            "Generated {}",
            analysis
                .generated_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
        ),
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

/// Status bar message set by the main loop; outlives redraws until dismissed.
#[derive(Debug, Default)]
struct Notice {
    message: Option<String>,
}

impl Notice {
    fn set(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    fn dismiss(&mut self) {
        self.message = None;
    }

    fn status_line(&self, status: &AnalysisStatus, entries: &[DiaryEntry]) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => describe_status(status, entries),
        }
    }
}

fn describe_status(status: &AnalysisStatus, entries: &[DiaryEntry]) -> String {
    let title_of = |id: uuid::Uuid| {
        entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.title.clone())
            .unwrap_or_else(|| "entry".to_string())
    };

    match (&status.state, &status.last_outcome) {
        (RequestState::Running { entry_id }, _) => format!("Analyzing \"{}\"...", title_of(*entry_id)),
        (RequestState::Idle, Some(RequestOutcome::Succeeded { entry_id })) => {
            format!("Analysis ready for \"{}\"", title_of(*entry_id))
        }
        (RequestState::Idle, Some(RequestOutcome::Failed { message, .. })) => {
            format!("Analysis failed: {message}")
        }
        (RequestState::Idle, None) => String::new(),
    }
}

/// Cuts `text` to at most `width` terminal columns, marking the cut with `~`.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_diary::error::ErrorKind;

    #[test]
    fn notice_survives_redraws_until_dismissed() {
        let status = AnalysisStatus::default();
        let mut notice = Notice::default();
        notice.set(ErrorKind::StorageFailure.user_message());

        for _ in 0..10 {
            assert_eq!(
                notice.status_line(&status, &[]),
                ErrorKind::StorageFailure.user_message()
            );
        }

        notice.dismiss();
        assert_eq!(notice.status_line(&status, &[]), "");
    }

    #[test]
    fn notice_takes_precedence_over_analysis_outcome() {
        let entry = DiaryEntry::new(EntryDraft::new("Weekend Plans", "beach"));
        let status = AnalysisStatus {
            last_outcome: Some(RequestOutcome::Succeeded { entry_id: entry.id }),
            ..Default::default()
        };
        let entries = vec![entry];
        let mut notice = Notice::default();
        assert_eq!(
            notice.status_line(&status, &entries),
            "Analysis ready for \"Weekend Plans\""
        );

        notice.set("No entries matched your search");
        assert_eq!(notice.status_line(&status, &entries), "No entries matched your search");
    }

    #[test]
    fn truncate_respects_column_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer line", 6), "a lon~");
    }
}
