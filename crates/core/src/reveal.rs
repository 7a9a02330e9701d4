//! Staged, character-by-character display of assistant replies.
//!
//! A reply is cut into at most two slabs. Each slab gets its own assistant
//! turn, which starts empty and grows by one character per tick. The
//! schedule itself is a plain state machine; time is supplied from outside
//! by [`run_ticker`], and the owner of the transcript applies the steps.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::conversation::{ChatTurn, Transcript};

/// Default delay between two revealed characters.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(14);

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\r?\n){2,}").expect("valid pattern"));
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"[.!?]*[^.!?]+[.!?]+").expect("valid pattern")
    });

/// Cuts a reply into the slabs it is revealed in.
///
/// In priority order:
///
/// 1. Two or more non-blank paragraphs: the first two, trimmed. Anything
///    after the second paragraph is dropped.
/// 2. Two or more sentences: split at `ceil(n / 2)`, each half joined with
///    single spaces.
/// 3. Otherwise the whole text as one slab.
pub fn split_slabs(text: &str) -> Vec<String> {
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.len() >= 2 {
        return paragraphs[..2].iter().map(|p| (*p).to_owned()).collect();
    }

    let sentences = split_sentences(text);
    if sentences.len() >= 2 {
        let mid = sentences.len().div_ceil(2);
        return vec![sentences[..mid].join(" "), sentences[mid..].join(" ")];
    }

    vec![text.to_owned()]
}

/// Splits on runs of terminal punctuation. Punctuation that opens the text
/// stays with the first sentence, and a trailing fragment without
/// punctuation counts as a sentence of its own.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut end = 0;
    for m in SENTENCE.find_iter(text) {
        let sentence = m.as_str().trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        end = m.end();
    }
    let rest = text[end..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// A single mutation of the transcript requested by a [`RevealSchedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealStep {
    /// Append a new, empty assistant turn.
    OpenTurn,
    /// Append this character to the trailing assistant turn.
    Grow(char),
    /// Every slab is fully shown.
    Finished,
}

/// The reveal state machine for one reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealSchedule {
    slabs: Vec<String>,
    current_slab: usize,
    // Byte offset of the next character in the current slab.
    cursor: usize,
    opened: bool,
}

impl RevealSchedule {
    /// Creates a schedule for `text`, split with [`split_slabs`].
    #[inline]
    pub fn new(text: &str) -> Self {
        Self::from_slabs(split_slabs(text))
    }

    /// Creates a schedule over slabs chosen by the caller.
    #[inline]
    pub fn from_slabs(slabs: Vec<String>) -> Self {
        Self {
            slabs,
            current_slab: 0,
            cursor: 0,
            opened: false,
        }
    }

    /// Returns the slabs this schedule reveals.
    #[inline]
    pub fn slabs(&self) -> &[String] {
        &self.slabs
    }

    /// Returns `true` if every slab has been revealed.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.current_slab >= self.slabs.len()
    }

    /// Returns `true` if the next step shows a character, which must wait
    /// for a tick. Opening turns and finishing happen without waiting.
    pub fn needs_tick(&self) -> bool {
        self.opened
            && self
                .slabs
                .get(self.current_slab)
                .is_some_and(|slab| self.cursor < slab.len())
    }

    /// Moves the state machine forward by one step.
    ///
    /// Keeps returning [`RevealStep::Finished`] once done.
    pub fn advance(&mut self) -> RevealStep {
        loop {
            let Some(slab) = self.slabs.get(self.current_slab) else {
                return RevealStep::Finished;
            };
            if !self.opened {
                self.opened = true;
                return RevealStep::OpenTurn;
            }
            if let Some(ch) = slab[self.cursor..].chars().next() {
                self.cursor += ch.len_utf8();
                return RevealStep::Grow(ch);
            }
            self.current_slab += 1;
            self.cursor = 0;
            self.opened = false;
        }
    }

    /// Applies steps to `transcript`, consuming at most `ticks` ticks, and
    /// stops at the first step that needs one more.
    ///
    /// Returns `true` once the schedule has finished.
    pub(crate) fn apply(
        &mut self,
        transcript: &mut Transcript,
        mut ticks: usize,
    ) -> bool {
        loop {
            if self.needs_tick() {
                if ticks == 0 {
                    return false;
                }
                ticks -= 1;
            }
            match self.advance() {
                RevealStep::OpenTurn => transcript.push(ChatTurn::assistant("")),
                RevealStep::Grow(ch) => {
                    if !transcript.grow_last(ch) {
                        // Only the session appends turns, and it never does
                        // so while revealing.
                        error!("transcript doesn't end with the revealed turn");
                    }
                }
                RevealStep::Finished => return true,
            }
        }
    }

    /// Applies every remaining step at once.
    #[inline]
    pub(crate) fn flush(&mut self, transcript: &mut Transcript) {
        self.apply(transcript, usize::MAX);
    }
}

/// Calls `on_tick` every `period` until it returns `false`.
///
/// The first call happens one full period after starting. A zero period is
/// not allowed.
pub(crate) async fn run_ticker(
    period: Duration,
    mut on_tick: impl FnMut() -> bool,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if !on_tick() {
            break;
        }
    }
}
