use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use hostpack_core::Package;
use hostpack_operation::{render_preview_lines, OperationInteraction, Preview};

use crate::render::{render_section_header, render_status_line, OutputStyle, TerminalProgress};

pub(crate) struct TerminalInteraction {
    style: OutputStyle,
    assume_yes: bool,
    progress: Mutex<Option<TerminalProgress>>,
}

impl TerminalInteraction {
    pub(crate) fn new(style: OutputStyle, assume_yes: bool) -> Self {
        Self {
            style,
            assume_yes,
            progress: Mutex::new(None),
        }
    }

    pub(crate) fn finish_progress(&self) {
        if let Some(progress) = self.progress_slot().take() {
            progress.finish();
        }
    }

    fn progress_slot(&self) -> std::sync::MutexGuard<'_, Option<TerminalProgress>> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ask(&self, question: &str) -> bool {
        if self.assume_yes {
            println!("{question} [y/N] y");
            return true;
        }

        print!("{question} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => parse_confirmation(&answer),
            Err(_) => false,
        }
    }
}

impl OperationInteraction for TerminalInteraction {
    fn confirm_changes(&self, preview: &Preview) -> bool {
        if let Some(header) = render_section_header(self.style, "plan") {
            println!("{header}");
        }
        for line in render_preview_lines(preview) {
            println!("{line}");
        }
        if preview.has_warnings() {
            println!(
                "{}",
                render_status_line(self.style, "warn", "review the warnings above before continuing")
            );
        }
        self.ask("proceed?")
    }

    fn accept_license(&self, package: &Package, license_url: Option<&str>) -> bool {
        let url = license_url.unwrap_or("no license url published");
        println!(
            "{}",
            render_status_line(
                self.style,
                "warn",
                &format!("{package} requires license acceptance: {url}")
            )
        );
        self.ask("accept license?")
    }

    fn report_progress(&self, step: &str, done: usize, total: usize) {
        let mut slot = self.progress_slot();
        let progress = slot.get_or_insert_with(|| {
            TerminalProgress::start(self.style, "apply", total as u64)
        });
        progress.set(done as u64, step);
        if self.style == OutputStyle::Plain && done < total {
            println!("{step}");
        }
        if done >= total {
            if let Some(progress) = slot.take() {
                progress.finish();
            }
        }
    }
}

pub(crate) fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
