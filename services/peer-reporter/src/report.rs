//! Report assembly and rendering
//!
//! `build_report` is a pure function from a subscriber's watchlist and the
//! cycle deltas to a structured `Report`. Turning a report into text is the
//! job of a `ReportRenderer`.

use crate::engine::CycleDeltas;
use crate::registry::dedup_first_seen;
use crate::types::{Cadence, DeltaRecord, MetricSample, PeerId};

const SEPARATOR: &str = "\n\n—————————————————\n\n";

/// Which report is being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Short,
    Daily,
    Status,
}

impl From<Cadence> for ReportKind {
    fn from(cadence: Cadence) -> Self {
        match cadence {
            Cadence::Short => Self::Short,
            Cadence::Daily => Self::Daily,
        }
    }
}

/// Signed changes shown next to the absolute values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changes {
    pub reward: i64,
    pub wins: i64,
}

/// One peer block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub identifier: PeerId,
    pub display_id: String,
    pub display_name: String,
    pub rewards: i64,
    pub wins: i64,
    pub online: bool,
    pub changes: Option<Changes>,
    pub is_top: bool,
}

impl ReportEntry {
    pub fn from_sample(
        identifier: &PeerId,
        sample: &MetricSample,
        changes: Option<Changes>,
        is_top: bool,
    ) -> Self {
        Self {
            identifier: identifier.clone(),
            display_id: sample.display_id.clone(),
            display_name: sample.display_name.clone(),
            rewards: sample.reward,
            wins: sample.wins,
            online: sample.online,
            changes,
            is_top,
        }
    }

    fn from_record(record: &DeltaRecord, is_top: bool) -> Self {
        Self::from_sample(
            &record.identifier,
            &record.sample,
            Some(Changes {
                reward: record.reward_change,
                wins: record.wins_change,
            }),
            is_top,
        )
    }
}

/// A block of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Peer(ReportEntry),
    /// Identifier that could not be fetched
    Missing(PeerId),
}

/// Trailing summary line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    /// Sum of changes across every tracked peer fetched this cycle
    ChangeTotals(Changes),
    /// Sum of absolute values across every found peer
    OverallTotals { rewards: i64, wins: i64 },
}

/// Structured report for one subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub kind: ReportKind,
    pub sections: Vec<Section>,
    pub summary: Option<Summary>,
}

impl Report {
    pub fn entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.sections.iter().filter_map(|section| match section {
            Section::Peer(entry) => Some(entry),
            Section::Missing(_) => None,
        })
    }
}

/// Whether a record belongs in a report of the given cadence
pub fn qualifies(cadence: Cadence, record: &DeltaRecord) -> bool {
    match cadence {
        Cadence::Short => record.reward_change != 0 || record.wins_change != 0,
        Cadence::Daily => record.reward_change > 0 || record.wins_change > 0,
    }
}

/// Build one subscriber's report, `None` when nothing qualifies
pub fn build_report(
    watchlist: &[PeerId],
    deltas: &CycleDeltas,
    cadence: Cadence,
) -> Option<Report> {
    let mut sections = Vec::new();
    let mut totals = Changes { reward: 0, wins: 0 };

    for identifier in dedup_first_seen(watchlist) {
        let Some(record) = deltas.get(&identifier) else {
            continue;
        };

        totals.reward = totals.reward.saturating_add(record.reward_change);
        totals.wins = totals.wins.saturating_add(record.wins_change);

        if qualifies(cadence, record) {
            sections.push(Section::Peer(ReportEntry::from_record(
                record,
                deltas.is_top(&identifier),
            )));
        }
    }

    if sections.is_empty() {
        return None;
    }

    let summary = match cadence {
        Cadence::Short => None,
        Cadence::Daily => Some(Summary::ChangeTotals(totals)),
    };

    Some(Report {
        kind: cadence.into(),
        sections,
        summary,
    })
}

/// Turns a structured report into deliverable text
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &Report) -> String;
}

/// Telegram HTML renderer
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    footer: Option<String>,
}

impl HtmlRenderer {
    pub fn new(footer: Option<String>) -> Self {
        Self { footer }
    }

    fn header(kind: ReportKind) -> &'static str {
        match kind {
            ReportKind::Short => "📈<b>Hourly Peer Update!</b>",
            ReportKind::Daily => "📈 <b>24-Hour Summary Report!</b>",
            ReportKind::Status => "📊 <b>Live Node Status</b>",
        }
    }

    fn render_entry(kind: ReportKind, entry: &ReportEntry) -> String {
        let mut lines = Vec::with_capacity(6);

        if entry.is_top {
            lines.push(match kind {
                ReportKind::Daily => "👑 <b>Daily Top Performer!</b>".to_string(),
                _ => "👑 <b>Top Performer!</b>".to_string(),
            });
        }

        let (reward_delta, wins_delta) = match entry.changes {
            Some(changes) => (
                format!(" <code>{}</code>", signed_delta(changes.reward)),
                format!(" <code>{}</code>", signed_delta(changes.wins)),
            ),
            None => (String::new(), String::new()),
        };

        lines.push(format!(
            "🪪 <b>Peer ID:</b> <code>{}</code>",
            escape_html(&short_id(&entry.display_id))
        ));
        lines.push(format!("📝 <b>Name:</b> {}", escape_html(&entry.display_name)));
        lines.push(format!("💰 <b>Rewards:</b> {}{}", entry.rewards, reward_delta));
        lines.push(format!("🏆 <b>Wins:</b> {}{}", entry.wins, wins_delta));
        lines.push(if entry.online { "🟢 Online" } else { "🔴 Offline" }.to_string());

        lines.join("\n")
    }

    fn render_missing(identifier: &PeerId) -> String {
        let shown: String = identifier.as_str().chars().take(20).collect();
        format!("<b>{}</b>\nCould not be found.", escape_html(&shown))
    }
}

impl ReportRenderer for HtmlRenderer {
    fn render(&self, report: &Report) -> String {
        let blocks: Vec<String> = report
            .sections
            .iter()
            .map(|section| match section {
                Section::Peer(entry) => Self::render_entry(report.kind, entry),
                Section::Missing(identifier) => Self::render_missing(identifier),
            })
            .collect();

        let mut text = format!("{}\n\n{}", Self::header(report.kind), blocks.join(SEPARATOR));

        match report.summary {
            Some(Summary::ChangeTotals(totals)) => text.push_str(&format!(
                "\n\n<b>24h Change Totals:</b>\n💰 Rewards: {} | 🏆 Wins: {}",
                signed_delta(totals.reward),
                signed_delta(totals.wins)
            )),
            Some(Summary::OverallTotals { rewards, wins }) => text.push_str(&format!(
                "\n\n<b>Overall Totals:</b>\n💰 Rewards: {rewards} | 🏆 Wins: {wins}"
            )),
            None => {}
        }

        if report.kind != ReportKind::Short {
            if let Some(footer) = &self.footer {
                text.push_str("\n\n\n");
                text.push_str(footer);
            }
        }

        text
    }
}

/// `🔺+N` for gains, `🔻-N` for losses, `➖` for no change
pub fn signed_delta(value: i64) -> String {
    match value {
        v if v > 0 => format!("🔺+{v}"),
        v if v < 0 => format!("🔻{v}"),
        _ => "➖".to_string(),
    }
}

/// Long peer IDs are shown as the first 6 and last 4 characters
pub fn short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() > 10 {
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        id.to_string()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
