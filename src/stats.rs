use serde::Serialize;

/// Results derived from the latest comparison and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_chars: usize,
    pub incorrect_chars: usize,
    pub total_chars: usize,
}

impl Stats {
    /// Standard wpm: five characters per word, with elapsed time floored at
    /// one second so the first keystrokes don't divide by zero.
    pub fn calculate(correct: usize, incorrect: usize, total: usize, elapsed_secs: u32) -> Self {
        let minutes = (elapsed_secs as f64 / 60.0).max(1.0 / 60.0);
        let wpm = ((total as f64 / 5.0) / minutes).round() as u32;

        Self {
            wpm,
            accuracy: accuracy(correct, total),
            correct_chars: correct,
            incorrect_chars: incorrect,
            total_chars: total,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            correct_chars: 0,
            incorrect_chars: 0,
            total_chars: 0,
        }
    }
}

pub fn accuracy(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((correct.min(total) as f64 / total as f64) * 100.0).round() as u32
}
