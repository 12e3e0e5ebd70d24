//! Clipboard Operations for Export
//!
//! Writes exported HTML to the system clipboard through two independent
//! strategies, run one after the other. The copy only fails when neither
//! strategy succeeds.
//!
//! - **Primary**: rich HTML with a plain-text flavor taken from the
//!   rendered text, the way a selection copy would produce it.
//! - **Secondary**: rich HTML with the original markdown as the plain-text
//!   flavor, so plain-text consumers still see structure.
//!
//! # Clipboard ownership on Linux
//!
//! X11 and Wayland serve clipboard contents from the process that set them,
//! so a copy vanishes when that process exits. A short-lived CLI therefore
//! has to call [`ClipboardWriter::hold`] after a successful write: on Linux
//! it re-sets the winning flavor and blocks until another application takes
//! the clipboard. On other platforms the system keeps the data and `hold`
//! returns at once.

#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
use arboard::SetExtLinux;
use arboard::Clipboard;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::dom::parse_fragment;

// ─────────────────────────────────────────────────────────────────────────────
// Clipboard Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during clipboard operations.
#[derive(Debug)]
pub enum ClipboardError {
    /// Failed to access clipboard
    AccessError(String),
    /// Failed to set clipboard content
    WriteError(String),
    /// Every strategy failed; one message per strategy
    AllStrategiesFailed(Vec<String>),
}

impl std::fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipboardError::AccessError(msg) => write!(f, "Clipboard access error: {}", msg),
            ClipboardError::WriteError(msg) => write!(f, "Clipboard write error: {}", msg),
            ClipboardError::AllStrategiesFailed(reasons) => {
                write!(f, "Copy failed: {}", reasons.join("; "))
            }
        }
    }
}

impl std::error::Error for ClipboardError {}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        ClipboardError::WriteError(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// One way of getting HTML onto the clipboard.
pub trait ClipboardStrategy {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether the strategy can be attempted at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Write `html`; `plain_text` is the caller's plain-text fallback.
    fn write(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError>;

    /// Write as [`write`](Self::write) does, then keep serving the contents
    /// until they are replaced where the platform requires it.
    fn write_and_hold(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError> {
        self.write(html, plain_text)
    }
}

/// Whether this platform drops clipboard contents when the writer exits.
pub const OWNS_CLIPBOARD: bool = cfg!(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
));

/// Visible text of an HTML fragment.
pub fn html_to_text(html: &str) -> String {
    parse_fragment(html).text_contents()
}

fn open_clipboard() -> Result<Clipboard, ClipboardError> {
    Clipboard::new().map_err(|e| ClipboardError::AccessError(e.to_string()))
}

/// Set both flavors. With `hold` on Linux this blocks until another
/// process replaces the clipboard.
fn set_html(html: &str, plain_text: &str, hold: bool) -> Result<(), ClipboardError> {
    let mut clipboard = open_clipboard()?;
    let set = clipboard.set();

    #[cfg(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    ))]
    let set = if hold {
        debug!("Holding clipboard until replaced");
        set.wait()
    } else {
        set
    };
    #[cfg(not(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    )))]
    let _ = hold;

    set.html(html, Some(plain_text))?;
    Ok(())
}

/// HTML plus the rendered text as plain flavor.
#[derive(Debug, Default)]
pub struct RenderedTextStrategy;

impl ClipboardStrategy for RenderedTextStrategy {
    fn name(&self) -> &'static str {
        "rendered-text"
    }

    fn write(&mut self, html: &str, _plain_text: &str) -> Result<(), ClipboardError> {
        set_html(html, &html_to_text(html), false)
    }

    fn write_and_hold(&mut self, html: &str, _plain_text: &str) -> Result<(), ClipboardError> {
        set_html(html, &html_to_text(html), OWNS_CLIPBOARD)
    }
}

/// HTML plus the caller's fallback (the markdown source) as plain flavor.
#[derive(Debug, Default)]
pub struct DualFlavorStrategy;

impl ClipboardStrategy for DualFlavorStrategy {
    fn name(&self) -> &'static str {
        "dual-flavor"
    }

    fn write(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError> {
        set_html(html, plain_text, false)
    }

    fn write_and_hold(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError> {
        set_html(html, plain_text, OWNS_CLIPBOARD)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writer
// ─────────────────────────────────────────────────────────────────────────────

/// When the secondary strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardPolicy {
    /// Always run the secondary after the primary
    #[default]
    Supplement,
    /// Run the secondary only when the primary fails
    Fallback,
}

/// Which strategies succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyOutcome {
    pub primary: bool,
    pub secondary: bool,
}

impl CopyOutcome {
    pub fn succeeded(&self) -> bool {
        self.primary || self.secondary
    }
}

/// Runs the primary and secondary strategies in sequence.
pub struct ClipboardWriter {
    primary: Box<dyn ClipboardStrategy>,
    secondary: Box<dyn ClipboardStrategy>,
    policy: ClipboardPolicy,
    last_winner: Option<Slot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Primary,
    Secondary,
}

impl Default for ClipboardWriter {
    fn default() -> Self {
        Self::new(ClipboardPolicy::default())
    }
}

impl ClipboardWriter {
    /// Writer backed by the system clipboard.
    pub fn new(policy: ClipboardPolicy) -> Self {
        Self::with_strategies(
            Box::new(RenderedTextStrategy),
            Box::new(DualFlavorStrategy),
            policy,
        )
    }

    pub fn with_strategies(
        primary: Box<dyn ClipboardStrategy>,
        secondary: Box<dyn ClipboardStrategy>,
        policy: ClipboardPolicy,
    ) -> Self {
        Self {
            primary,
            secondary,
            policy,
            last_winner: None,
        }
    }

    pub fn policy(&self) -> ClipboardPolicy {
        self.policy
    }

    fn attempt(
        strategy: &mut dyn ClipboardStrategy,
        html: &str,
        plain_text: &str,
        failures: &mut Vec<String>,
    ) -> bool {
        if !strategy.is_available() {
            debug!("Clipboard strategy '{}' unavailable", strategy.name());
            failures.push(format!("{}: unavailable", strategy.name()));
            return false;
        }
        match strategy.write(html, plain_text) {
            Ok(()) => {
                debug!("Clipboard strategy '{}' succeeded", strategy.name());
                true
            }
            Err(e) => {
                warn!("Clipboard strategy '{}' failed: {}", strategy.name(), e);
                failures.push(format!("{}: {}", strategy.name(), e));
                false
            }
        }
    }

    /// Copy `html` with `plain_text` as fallback flavor.
    ///
    /// Partial success counts as success.
    pub fn write(&mut self, html: &str, plain_text: &str) -> Result<CopyOutcome, ClipboardError> {
        let mut failures = Vec::new();
        let mut outcome = CopyOutcome {
            primary: Self::attempt(self.primary.as_mut(), html, plain_text, &mut failures),
            secondary: false,
        };

        let run_secondary = match self.policy {
            ClipboardPolicy::Supplement => true,
            ClipboardPolicy::Fallback => !outcome.primary,
        };
        if run_secondary {
            outcome.secondary =
                Self::attempt(self.secondary.as_mut(), html, plain_text, &mut failures);
        }

        // The later write owns the clipboard, so it is the one to hold
        self.last_winner = if outcome.secondary {
            Some(Slot::Secondary)
        } else if outcome.primary {
            Some(Slot::Primary)
        } else {
            None
        };

        if outcome.succeeded() {
            info!("Copied {} bytes of HTML to clipboard", html.len());
            Ok(outcome)
        } else {
            Err(ClipboardError::AllStrategiesFailed(failures))
        }
    }

    /// Keep the last successful write available after the process would
    /// otherwise exit. Blocks on Linux until another copy replaces it.
    pub fn hold(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError> {
        let strategy = match self.last_winner {
            Some(Slot::Primary) => self.primary.as_mut(),
            Some(Slot::Secondary) => self.secondary.as_mut(),
            None => {
                return Err(ClipboardError::WriteError(
                    "nothing was copied to hold".to_string(),
                ))
            }
        };
        debug!("Holding clipboard with strategy '{}'", strategy.name());
        strategy.write_and_hold(html, plain_text)
    }
}

/// Copy export HTML to the system clipboard with the default policy.
pub fn write_to_clipboard(html: &str, plain_text: &str) -> Result<CopyOutcome, ClipboardError> {
    ClipboardWriter::default().write(html, plain_text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(String, String, String)>>>;
    type Holds = Rc<RefCell<Vec<&'static str>>>;

    struct MockStrategy {
        name: &'static str,
        available: bool,
        fail: bool,
        log: Log,
        holds: Holds,
    }

    impl MockStrategy {
        fn boxed(name: &'static str, available: bool, fail: bool, log: &Log) -> Box<Self> {
            Box::new(Self {
                name,
                available,
                fail,
                log: Rc::clone(log),
                holds: Holds::default(),
            })
        }

        fn holding(name: &'static str, fail: bool, log: &Log, holds: &Holds) -> Box<Self> {
            let mut strategy = Self::boxed(name, true, fail, log);
            strategy.holds = Rc::clone(holds);
            strategy
        }
    }

    impl ClipboardStrategy for MockStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn write(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError> {
            self.log.borrow_mut().push((
                self.name.to_string(),
                html.to_string(),
                plain_text.to_string(),
            ));
            if self.fail {
                Err(ClipboardError::WriteError("denied".to_string()))
            } else {
                Ok(())
            }
        }

        fn write_and_hold(&mut self, html: &str, plain_text: &str) -> Result<(), ClipboardError> {
            self.write(html, plain_text)?;
            self.holds.borrow_mut().push(self.name);
            Ok(())
        }
    }

    #[test]
    fn test_clipboard_error_display() {
        let err = ClipboardError::AccessError("test".to_string());
        assert!(err.to_string().contains("test"));
        let err = ClipboardError::AllStrategiesFailed(vec!["a: x".into(), "b: y".into()]);
        assert_eq!(err.to_string(), "Copy failed: a: x; b: y");
    }

    #[test]
    fn test_supplement_runs_both_in_order() {
        let log: Log = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::boxed("primary", true, false, &log),
            MockStrategy::boxed("secondary", true, false, &log),
            ClipboardPolicy::Supplement,
        );
        let outcome = writer.write("<p>hi</p>", "hi *md*").unwrap();
        assert_eq!(
            outcome,
            CopyOutcome {
                primary: true,
                secondary: true
            }
        );
        let calls = log.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "primary");
        assert_eq!(calls[1], ("secondary".into(), "<p>hi</p>".into(), "hi *md*".into()));
    }

    #[test]
    fn test_partial_success_is_success() {
        let log: Log = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::boxed("primary", true, true, &log),
            MockStrategy::boxed("secondary", true, false, &log),
            ClipboardPolicy::Supplement,
        );
        let outcome = writer.write("<p>x</p>", "x").unwrap();
        assert!(!outcome.primary);
        assert!(outcome.secondary);

        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::boxed("primary", true, false, &log),
            MockStrategy::boxed("secondary", true, true, &log),
            ClipboardPolicy::Supplement,
        );
        assert!(writer.write("<p>x</p>", "x").unwrap().primary);
    }

    #[test]
    fn test_fallback_skips_secondary_on_success() {
        let log: Log = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::boxed("primary", true, false, &log),
            MockStrategy::boxed("secondary", true, false, &log),
            ClipboardPolicy::Fallback,
        );
        let outcome = writer.write("<p>x</p>", "x").unwrap();
        assert!(!outcome.secondary);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_unavailable_strategy_is_skipped() {
        let log: Log = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::boxed("primary", false, false, &log),
            MockStrategy::boxed("secondary", true, false, &log),
            ClipboardPolicy::Fallback,
        );
        let outcome = writer.write("<p>x</p>", "x").unwrap();
        assert!(!outcome.primary);
        assert!(outcome.secondary);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_both_failing_is_single_error() {
        let log: Log = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::boxed("primary", true, true, &log),
            MockStrategy::boxed("secondary", false, false, &log),
            ClipboardPolicy::Supplement,
        );
        match writer.write("<p>x</p>", "x") {
            Err(ClipboardError::AllStrategiesFailed(reasons)) => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons[0].starts_with("primary:"));
                assert_eq!(reasons[1], "secondary: unavailable");
            }
            other => panic!("expected AllStrategiesFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_hold_uses_last_successful_strategy() {
        let log: Log = Rc::default();
        let holds: Holds = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::holding("primary", false, &log, &holds),
            MockStrategy::holding("secondary", false, &log, &holds),
            ClipboardPolicy::Supplement,
        );
        writer.write("<p>x</p>", "x").unwrap();
        writer.hold("<p>x</p>", "x").unwrap();
        assert_eq!(*holds.borrow(), vec!["secondary"]);

        let holds: Holds = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::holding("primary", false, &log, &holds),
            MockStrategy::holding("secondary", true, &log, &holds),
            ClipboardPolicy::Supplement,
        );
        writer.write("<p>x</p>", "x").unwrap();
        writer.hold("<p>x</p>", "x").unwrap();
        assert_eq!(*holds.borrow(), vec!["primary"]);
    }

    #[test]
    fn test_hold_without_copy_fails() {
        let log: Log = Rc::default();
        let holds: Holds = Rc::default();
        let mut writer = ClipboardWriter::with_strategies(
            MockStrategy::holding("primary", true, &log, &holds),
            MockStrategy::holding("secondary", true, &log, &holds),
            ClipboardPolicy::Supplement,
        );
        assert!(writer.write("<p>x</p>", "x").is_err());
        assert!(writer.hold("<p>x</p>", "x").is_err());
        assert!(holds.borrow().is_empty());
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(html_to_text("<section><p>a <b>b</b></p><p>c</p></section>"), "a bc");
    }

    // Writing to the real clipboard needs a display server, which CI lacks.
}
