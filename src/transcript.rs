use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
    Error,
}

/// A citation attached to an assistant answer. The backend sends either a
/// bare label string or a structured record; both render, so the renderer
/// can match exhaustively instead of sniffing shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Label(String),
    Citation {
        file: String,
        page: Option<u32>,
        kind: Option<String>,
        excerpt: Option<String>,
    },
}

impl Source {
    /// Single-line heading for the citation (excerpt is rendered separately).
    pub fn heading(&self) -> String {
        match self {
            Source::Label(label) => label.clone(),
            Source::Citation { file, page, kind, .. } => {
                let mut heading = match page {
                    Some(page) => format!("{} (p.{})", file, page),
                    None => file.clone(),
                };
                if let Some(kind) = kind {
                    heading.push_str(&format!(" [{}]", kind));
                }
                heading
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Local>,
}

/// Append-only conversation log. Entries are never mutated, removed, or
/// reordered for the lifetime of the session; insertion order is display
/// order.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns its assigned id. Ids are time-derived
    /// (epoch millis) and strictly monotonic even for appends landing in the
    /// same millisecond.
    pub fn push(&mut self, role: Role, content: impl Into<String>, sources: Vec<Source>) -> u64 {
        let now = Local::now();
        let mut id = now.timestamp_millis().max(0) as u64;
        if let Some(last) = self.entries.last() {
            if id <= last.id {
                id = last.id + 1;
            }
        }
        self.entries.push(Message {
            id,
            role,
            content: content.into(),
            sources,
            timestamp: now,
        });
        id
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
