use async_trait::async_trait;
use parking_lot::Mutex;

use crate::frontend::{Frontend, Notice, NoticeKind, Page};
use crate::report::ErrorReport;

/// Terminal frontend: notices and error summaries go to stderr, navigation
/// is remembered so the command can report where the flow ended up.
#[derive(Debug, Default)]
pub struct ConsoleFrontend {
    verbose: bool,
    last_page: Mutex<Option<Page>>,
}

impl ConsoleFrontend {
    /// `verbose` also prints the full diagnostic report for errors.
    pub fn new(verbose: bool) -> Self { Self { verbose, last_page: Mutex::new(None) } }

    pub fn last_page(&self) -> Option<Page> { self.last_page.lock().clone() }
}

fn badge(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Info => "info",
        NoticeKind::Success => "ok",
        NoticeKind::Warning => "warning",
        NoticeKind::Error => "error",
    }
}

#[async_trait]
impl Frontend for ConsoleFrontend {
    async fn acknowledge(&self, notice: Notice) {
        eprintln!("[{}] {}: {}", badge(notice.kind), notice.title, notice.text);
    }

    async fn show_error(&self, report: &ErrorReport) {
        eprintln!("[error] {}: {}", report.context, report.summary().trim_end());
        if self.verbose {
            eprintln!("{}", report.details());
        }
    }

    fn navigate(&self, page: Page) {
        eprintln!("-> {}", page.path());
        *self.last_page.lock() = Some(page);
    }
}
