//! Human-readable progress and diagnostics
//!
//! Reporters are a write-only side channel. Nothing they do feeds back into
//! the scan or the repair, and output errors are swallowed.

use std::io::{self, Write};
use std::path::Path;

use super::classification::{Classification, RepairTarget, ScanReport, KEY_WIDTH};

/// Receives scan and repair notifications as they happen.
///
/// Every method has an empty default so sinks only implement what they show.
pub trait CheckReporter {
    /// Called when the integer scan percentage increases.
    fn progress(&mut self, _visited: u64, _total: u64, _percent: u8) {}

    /// Called once for every record not classified `Valid`.
    fn flagged(&mut self, _index: u64, _classification: &Classification) {}

    fn scan_finished(&mut self, _report: &ScanReport) {}

    fn repairing(&mut self, _target: &RepairTarget) {}

    fn quarantined(&mut self, _target: &RepairTarget, _path: &Path, _bytes: usize) {}

    fn deleted(&mut self, _target: &RepairTarget) {}

    fn already_removed(&mut self, _target: &RepairTarget) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl CheckReporter for SilentReporter {}

/// Writes progress and diagnostics to one stream and repair actions to
/// another.
pub struct TextReporter<D: Write, A: Write> {
    label: String,
    diagnostics: D,
    actions: A,
    actions_on_diagnostics: bool,
    progress_open: bool,
}

impl<D: Write> TextReporter<D, io::Sink> {
    /// Everything, repair actions included, goes to `diagnostics`.
    ///
    /// Used when stdout is reserved for a machine-readable summary.
    pub fn diagnostics_only(label: impl Into<String>, diagnostics: D) -> Self {
        let mut reporter = Self::new(label, diagnostics, io::sink());
        reporter.actions_on_diagnostics = true;
        reporter
    }
}

impl<D: Write, A: Write> TextReporter<D, A> {
    pub fn new(label: impl Into<String>, diagnostics: D, actions: A) -> Self {
        Self {
            label: label.into(),
            diagnostics,
            actions,
            actions_on_diagnostics: false,
            progress_open: false,
        }
    }

    pub fn into_inner(self) -> (D, A) {
        (self.diagnostics, self.actions)
    }

    fn end_progress_line(&mut self) {
        if self.progress_open {
            let _ = writeln!(self.diagnostics);
            self.progress_open = false;
        }
    }

    fn action_stream(&mut self) -> &mut dyn Write {
        if self.actions_on_diagnostics {
            &mut self.diagnostics
        } else {
            &mut self.actions
        }
    }
}

impl<D: Write, A: Write> CheckReporter for TextReporter<D, A> {
    fn progress(&mut self, visited: u64, total: u64, percent: u8) {
        let _ = write!(
            self.diagnostics,
            "\rchecking {}: {}/{} {}%",
            self.label, visited, total, percent
        );
        let _ = self.diagnostics.flush();
        self.progress_open = true;
    }

    fn flagged(&mut self, index: u64, classification: &Classification) {
        self.end_progress_line();
        let _ = match classification {
            Classification::Valid => return,
            Classification::Damaged {
                instance, message, ..
            } => writeln!(self.diagnostics, "{} ({}): {}", index, instance, message),
            Classification::MalformedKey { key, message, .. } => writeln!(
                self.diagnostics,
                "{}: {} (key size {} != {})",
                index,
                message.as_deref().unwrap_or("header ok"),
                key.len(),
                KEY_WIDTH
            ),
        };
        let _ = self.diagnostics.flush();
    }

    fn scan_finished(&mut self, _report: &ScanReport) {
        self.end_progress_line();
        let _ = self.diagnostics.flush();
    }

    fn repairing(&mut self, target: &RepairTarget) {
        let _ = writeln!(
            self.action_stream(),
            "fix {} record[{}] at #{} --",
            target.kind, target.index, target.instance
        );
    }

    fn quarantined(&mut self, target: &RepairTarget, path: &Path, bytes: usize) {
        let _ = writeln!(
            self.action_stream(),
            "get key {} = {} bytes, dumping broken header to disk: {}",
            target.key,
            bytes,
            path.display()
        );
    }

    fn deleted(&mut self, target: &RepairTarget) {
        let out = self.action_stream();
        let _ = writeln!(out, "del key {}", target.key);
        let _ = out.flush();
    }

    fn already_removed(&mut self, target: &RepairTarget) {
        let out = self.action_stream();
        let _ = writeln!(out, "key {} already removed, skipping", target.key);
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::super::classification::{RecordKey, TargetKind};
    use super::*;

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_progress_then_diagnostic_breaks_line() {
        let mut reporter = TextReporter::new("/var/lib/rpm/Packages", Vec::<u8>::new(), Vec::<u8>::new());
        reporter.progress(5, 10, 50);
        reporter.flagged(
            4,
            &Classification::Damaged {
                key: RecordKey::from_instance(812),
                instance: 812,
                message: "hdr tags: BAD".to_string(),
            },
        );
        reporter.scan_finished(&ScanReport::new(10));

        let (diag, actions) = reporter.into_inner();
        assert_eq!(
            text(diag),
            "\rchecking /var/lib/rpm/Packages: 5/10 50%\n4 (812): hdr tags: BAD\n"
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn test_malformed_key_diagnostic_shows_width() {
        let mut reporter = TextReporter::new("db", Vec::<u8>::new(), Vec::<u8>::new());
        let key = RecordKey::new(vec![0, 0, 0, 1, 0, 0]);
        reporter.flagged(
            0,
            &Classification::MalformedKey {
                instance: key.instance(),
                key,
                message: None,
            },
        );

        let (diag, _) = reporter.into_inner();
        assert_eq!(text(diag), "0: header ok (key size 6 != 4)\n");
    }

    #[test]
    fn test_repair_actions_go_to_action_stream() {
        let mut reporter = TextReporter::new("db", Vec::<u8>::new(), Vec::<u8>::new());
        let target = RepairTarget {
            index: 2,
            kind: TargetKind::Damaged,
            key: RecordKey::from_instance(3),
            instance: 3,
            message: None,
        };
        reporter.repairing(&target);
        reporter.quarantined(&target, Path::new("/q/header.2"), 64);
        reporter.deleted(&target);

        let (diag, actions) = reporter.into_inner();
        assert!(diag.is_empty());
        let actions = text(actions);
        assert!(actions.contains("fix damaged record[2] at #3 --"));
        assert!(actions.contains("/q/header.2"));
        assert!(actions.contains("del key 00000003[4]"));
    }

    #[test]
    fn test_diagnostics_only_keeps_actions_off_stdout() {
        let mut reporter = TextReporter::diagnostics_only("db", Vec::<u8>::new());
        let target = RepairTarget {
            index: 0,
            kind: TargetKind::MalformedKey,
            key: RecordKey::new(vec![0, 0, 0, 9, 0, 0]),
            instance: 9,
            message: None,
        };
        reporter.progress(1, 1, 100);
        reporter.repairing(&target);
        reporter.deleted(&target);

        let (diag, _) = reporter.into_inner();
        let diag = text(diag);
        assert!(diag.starts_with("\rchecking db: 1/1 100%"));
        assert!(diag.contains("fix malformed-key record[0] at #9 --"));
        assert!(diag.ends_with("del key 000000090000[6]\n"));
    }
}
