//! Terminal progress bar for the message loop.

use std::io::{self, IsTerminal, Stderr, Write};

const BAR_WIDTH: usize = 30;

/// A one-line `[#####     ] 5/10` indicator, redrawn in place.
///
/// Drawing is skipped when disabled (stderr is not a terminal). Write errors
/// are ignored; the bar is cosmetic.
pub struct Progress<W: Write> {
    out: W,
    total: usize,
    done: usize,
    enabled: bool,
}

impl Progress<Stderr> {
    /// Draw on stderr when it is a terminal.
    pub fn stderr() -> Self {
        let enabled = io::stderr().is_terminal();
        Self::new(io::stderr(), enabled)
    }
}

impl Progress<io::Sink> {
    /// A progress bar that never draws.
    pub fn hidden() -> Self {
        Self::new(io::sink(), false)
    }
}

impl<W: Write> Progress<W> {
    pub fn new(out: W, enabled: bool) -> Self {
        Self {
            out,
            total: 0,
            done: 0,
            enabled,
        }
    }

    /// Reset the counter for a run over `total` items.
    pub fn start(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
        self.draw();
    }

    /// Count one finished item and redraw.
    pub fn tick(&mut self) {
        self.done = (self.done + 1).min(self.total);
        self.draw();
    }

    /// Erase the bar so other output can use the line. The next `tick` redraws it.
    pub fn clear(&mut self) {
        if self.enabled {
            let _ = write!(self.out, "\r\x1b[2K");
            let _ = self.out.flush();
        }
    }

    /// Leave the final bar on its own line.
    pub fn finish(&mut self) {
        if self.enabled && self.total > 0 {
            self.draw();
            let _ = writeln!(self.out);
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }

    fn draw(&mut self) {
        if !self.enabled || self.total == 0 {
            return;
        }
        let filled = self.done * BAR_WIDTH / self.total;
        let bar = format!("{}{}", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled));
        let _ = write!(self.out, "\r[{bar}] {}/{}", self.done, self.total);
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(progress: &Progress<Vec<u8>>) -> String {
        String::from_utf8(progress.out.clone()).unwrap()
    }

    #[test]
    fn draws_bar_on_each_tick() {
        let mut progress = Progress::new(Vec::new(), true);
        progress.start(2);
        progress.tick();
        progress.tick();

        let out = rendered(&progress);
        assert!(out.contains(&format!("\r[{}{}] 1/2", "#".repeat(15), " ".repeat(15))));
        assert!(out.ends_with(&format!("\r[{}] 2/2", "#".repeat(30))));
    }

    #[test]
    fn disabled_progress_writes_nothing() {
        let mut progress = Progress::new(Vec::new(), false);
        progress.start(3);
        progress.tick();
        progress.clear();
        progress.finish();
        assert!(progress.out.is_empty());
        assert_eq!(progress.done(), 1);
    }

    #[test]
    fn ticks_past_total_are_clamped() {
        let mut progress = Progress::new(Vec::new(), true);
        progress.start(1);
        progress.tick();
        progress.tick();
        assert_eq!(progress.done(), 1);
    }

    #[test]
    fn finish_ends_the_line() {
        let mut progress = Progress::new(Vec::new(), true);
        progress.start(1);
        progress.tick();
        progress.finish();
        assert!(rendered(&progress).ends_with("1/1\n"));
    }
}
